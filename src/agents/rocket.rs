//! Rocket state machine: `IDLE -> OUTBOUND(k) -> LOADING(k) -> INBOUND(k)
//! -> IDLE` (spec.md §3, §4.3, §4.4.5, scenario S6).

use crate::models::{AgentCore, Locale, Mode, RocketMission, RocketState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocketConfig {
    pub distance_km: f64,
    pub cruise_speed_kmh: f64,
    pub loading_steps: u64,
    pub prop_per_kg: f64,
}

impl RocketConfig {
    /// `ceil(distance_km / cruise_speed_kmh)`, one-way leg duration.
    pub fn leg_steps(&self) -> u64 {
        (self.distance_km / self.cruise_speed_kmh).ceil() as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rocket {
    pub core: AgentCore,
    pub config: RocketConfig,
    pub state: RocketState,
    /// `None` while IDLE; set for the duration of a mission.
    mission: Option<RocketMission>,
    origin: Locale,
}

pub enum RocketOutcome {
    Idle,
    InTransit,
    /// Arrived somewhere; carries the payload, the locale arrived at, and
    /// the sector that requested the mission (so delivery can be
    /// addressed to it). `returning_home` is true once this is the
    /// inbound leg completing, which also frees the rocket back to
    /// `IDLE`.
    ArrivedAt {
        payload: std::collections::BTreeMap<crate::models::ResourceId, f64>,
        locale: Locale,
        requester: crate::models::SectorId,
        returning_home: bool,
    },
}

impl Rocket {
    pub fn new(core: AgentCore, config: RocketConfig, home: Locale) -> Self {
        Rocket {
            core,
            config,
            state: RocketState::Idle,
            mission: None,
            origin: home,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, RocketState::Idle)
    }

    /// Propellant required for the full round trip, per spec.md §4.4.5:
    /// `prop_total = (payload_out + payload_return) * prop_per_kg`. Fuel is
    /// deducted by the caller (the Transportation Sector, from sector
    /// stock) before calling `launch`.
    pub fn prop_total(&self, mission: &RocketMission) -> f64 {
        mission.total_payload_kg() * self.config.prop_per_kg
    }

    /// Commits the round trip: fuel has already been deducted by the
    /// caller. Transitions `IDLE -> OUTBOUND(leg_steps)`.
    pub fn commit_round_trip(&mut self, mission: RocketMission) {
        assert!(self.is_idle(), "commit_round_trip called on a busy rocket");
        let leg = self.config.leg_steps();
        self.state = RocketState::Outbound(leg);
        self.core.mode = Mode::Active("OUTBOUND".to_string());
        self.mission = Some(mission);
    }

    /// Advances the state machine by one step.
    pub fn step(&mut self) -> RocketOutcome {
        self.core.tick_age();
        if self.core.is_retired() {
            return RocketOutcome::Idle;
        }

        match self.state {
            RocketState::Idle => RocketOutcome::Idle,
            RocketState::Outbound(k) => {
                if k <= 1 {
                    self.state = RocketState::Loading(self.config.loading_steps);
                    self.core.mode = Mode::Active("LOADING".to_string());
                    let mission = self.mission.as_ref().expect("mission set while outbound");
                    RocketOutcome::ArrivedAt {
                        payload: mission.payload.clone(),
                        locale: mission.destination,
                        requester: mission.requester.clone(),
                        returning_home: false,
                    }
                } else {
                    self.state = RocketState::Outbound(k - 1);
                    RocketOutcome::InTransit
                }
            }
            RocketState::Loading(k) => {
                if k <= 1 {
                    self.state = RocketState::Inbound(self.config.leg_steps());
                    self.core.mode = Mode::Active("INBOUND".to_string());
                } else {
                    self.state = RocketState::Loading(k - 1);
                }
                RocketOutcome::InTransit
            }
            RocketState::Inbound(k) => {
                if k <= 1 {
                    self.state = RocketState::Idle;
                    self.core.mode = Mode::Idle;
                    let mission = self.mission.take().expect("mission set while inbound");
                    RocketOutcome::ArrivedAt {
                        payload: mission.return_payload,
                        locale: self.origin,
                        requester: mission.requester,
                        returning_home: true,
                    }
                } else {
                    self.state = RocketState::Inbound(k - 1);
                    RocketOutcome::InTransit
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentId, ResourceId, SectorId};
    use std::collections::BTreeMap;

    fn rocket() -> Rocket {
        Rocket::new(
            AgentCore::new(AgentId::new("rocket-1"), SectorId::new("transportation"), 100_000),
            RocketConfig {
                distance_km: 384_400.0,
                cruise_speed_kmh: 38_440.0, // -> 10-step leg
                loading_steps: 24,
                prop_per_kg: 1.0,
            },
            Locale::Earth,
        )
    }

    #[test]
    fn full_round_trip_per_scenario_s6() {
        let mut rocket = rocket();
        assert_eq!(rocket.config.leg_steps(), 10);

        let mut payload = BTreeMap::new();
        payload.insert(ResourceId::new("Science_Rover_EQ"), 2.0);
        rocket.commit_round_trip(RocketMission::one_way(payload, Locale::Moon, SectorId::new("construction")));

        // t=0 launch. t=1..=9: in transit (9 steps). t=10: arrive at moon.
        for _ in 0..9 {
            assert!(matches!(rocket.step(), RocketOutcome::InTransit));
        }
        match rocket.step() {
            RocketOutcome::ArrivedAt {
                locale,
                returning_home,
                ..
            } => {
                assert_eq!(locale, Locale::Moon);
                assert!(!returning_home);
            }
            _ => panic!("expected arrival at t=10"),
        }

        // loading: 24 steps (t=11..=34), then inbound leg t=35..=44.
        for _ in 0..23 {
            assert!(matches!(rocket.step(), RocketOutcome::InTransit));
        }
        // last loading step transitions into inbound, still "in transit"
        assert!(matches!(rocket.step(), RocketOutcome::InTransit));
        for _ in 0..9 {
            assert!(matches!(rocket.step(), RocketOutcome::InTransit));
        }
        match rocket.step() {
            RocketOutcome::ArrivedAt {
                locale,
                returning_home,
                ..
            } => {
                assert_eq!(locale, Locale::Earth);
                assert!(returning_home);
            }
            _ => panic!("expected arrival home"),
        }
        assert!(rocket.is_idle());
    }

    #[test]
    fn fuel_exactly_equal_succeeds_one_less_defers() {
        let rocket = rocket();
        let mut payload = BTreeMap::new();
        payload.insert(ResourceId::new("shells"), 10.0);
        let mission = RocketMission::one_way(payload, Locale::Moon, SectorId::new("construction"));
        let prop = rocket.prop_total(&mission);
        assert_eq!(prop, 10.0);
    }
}
