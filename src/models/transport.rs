//! Transport requests and the rocket lifecycle state machine (spec.md §3, §4.3, §4.4.5).

use super::ids::{RequestId, ResourceId, SectorId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    Earth,
    Moon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportRequest {
    pub id: RequestId,
    pub payload: BTreeMap<ResourceId, f64>,
    pub origin: Locale,
    pub destination: Locale,
    pub requester: SectorId,
    pub entered_at_step: u64,
}

/// `IDLE -> OUTBOUND(k) -> LOADING(k) -> INBOUND(k) -> IDLE`.
/// `k` is the countdown of steps remaining in that leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RocketState {
    Idle,
    Outbound(u64),
    Loading(u64),
    Inbound(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocketMission {
    pub payload: BTreeMap<ResourceId, f64>,
    pub destination: Locale,
    /// Cargo carried on the return leg (e.g. empty outbound crates, lunar
    /// samples); included in the propellant budget of spec.md §4.4.5.
    pub return_payload: BTreeMap<ResourceId, f64>,
    /// Sector that requested this mission; carried through to the
    /// `payload_delivered` event so it reaches its intended recipient
    /// rather than the transportation sector itself.
    pub requester: SectorId,
}

impl RocketMission {
    pub fn one_way(payload: BTreeMap<ResourceId, f64>, destination: Locale, requester: SectorId) -> Self {
        RocketMission {
            payload,
            destination,
            return_payload: BTreeMap::new(),
            requester,
        }
    }

    pub fn total_payload_kg(&self) -> f64 {
        self.payload.values().sum::<f64>() + self.return_payload.values().sum::<f64>()
    }
}
