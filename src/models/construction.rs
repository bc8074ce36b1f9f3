//! Construction and equipment-request tracking (spec.md §3, §4.4.3, §4.4.4).

use super::ids::{AgentId, RequestId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructionStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionRequest {
    pub id: RequestId,
    pub module_type: String,
    pub requester: String,
    pub status: ConstructionStatus,
    pub shells_needed: u64,
    pub equipment_needed: u64,
    pub assigned_robot_id: Option<AgentId>,
    pub steps_remaining: Option<u64>,
    /// Step at which this request entered the backlog, for `BacklogTimeout`.
    pub entered_at_step: u64,
    /// Set once a single `equipment_request` has been issued, so repeated
    /// steps of waiting don't duplicate the request.
    pub equipment_requested: bool,
}

impl ConstructionRequest {
    pub fn new(
        id: RequestId,
        module_type: impl Into<String>,
        requester: impl Into<String>,
        shells_needed: u64,
        equipment_needed: u64,
        entered_at_step: u64,
    ) -> Self {
        ConstructionRequest {
            id,
            module_type: module_type.into(),
            requester: requester.into(),
            status: ConstructionStatus::Queued,
            shells_needed,
            equipment_needed,
            assigned_robot_id: None,
            steps_remaining: None,
            entered_at_step,
            equipment_requested: false,
        }
    }
}
