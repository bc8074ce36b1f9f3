//! Applies a drained `Command` (spec.md §6) to a running `World`.
//! `store::command_source` owns sourcing/draining commands from the
//! document store; this module owns what each command *does* once
//! drained.

use crate::error::{ProximaError, Result};
use crate::models::{Event, GoalId, PolicyId, SectorId};
use crate::store::{Command, CommandKind};
use crate::world::{RunnerState, World};
use log::info;

pub fn apply_command(world: &mut World, command: &Command) -> Result<()> {
    info!("command: applying {} ({:?})", command.id, command.kind);
    match &command.kind {
        CommandKind::Pause => {
            world.runner_state = RunnerState::Paused;
            Ok(())
        }
        CommandKind::Resume => {
            world.runner_state = RunnerState::Running;
            Ok(())
        }
        CommandKind::SetGoal { goal_id, patch } => {
            let goal_id = GoalId::new(goal_id.clone());
            let goal = world
                .evaluation
                .goals
                .iter_mut()
                .find(|g| g.id == goal_id)
                .ok_or_else(|| ProximaError::Config(format!("no such goal: {}", goal_id)))?;
            if let Some(weight) = patch.get("weight").and_then(|v| v.as_f64()) {
                goal.weight = weight;
            }
            if let Some(horizon) = patch.get("horizon").and_then(|v| v.as_u64()) {
                goal.horizon = horizon;
            }
            Ok(())
        }
        CommandKind::SetPolicy { policy_id, patch } => {
            let policy_id = PolicyId::new(policy_id.clone());
            let policy = world
                .policy_engine
                .policy_mut(&policy_id)
                .ok_or_else(|| ProximaError::Config(format!("no such policy: {}", policy_id)))?;
            if let Some(enabled) = patch.get("enabled").and_then(|v| v.as_bool()) {
                policy.set_enabled(enabled);
            }
            Ok(())
        }
        CommandKind::InjectEvent { topic: _, payload } => {
            let event: Event = serde_json::from_value(payload.clone())
                .map_err(|e| ProximaError::Config(format!("bad event payload: {e}")))?;
            world.event_bus.publish(event);
            Ok(())
        }
        CommandKind::SetParam { path, value } => match path.as_str() {
            "max_backlog_age_steps" => {
                let steps = value
                    .as_u64()
                    .ok_or_else(|| ProximaError::Config("max_backlog_age_steps must be an integer".into()))?;
                world.max_backlog_age_steps = steps;
                Ok(())
            }
            other if other.starts_with("sector_throttle.") => {
                let sector = SectorId::new(other.trim_start_matches("sector_throttle.").to_string());
                let factor = value
                    .as_f64()
                    .ok_or_else(|| ProximaError::Config("sector_throttle value must be a number".into()))?;
                world.set_sector_throttle(&sector, factor);
                Ok(())
            }
            other => Err(ProximaError::Config(format!("unknown param path: {other}"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_and_resume_toggle_runner_state() {
        let mut world = crate::world::tests::minimal_world();
        let pause = Command {
            id: "c1".into(),
            ts: 0,
            kind: CommandKind::Pause,
        };
        apply_command(&mut world, &pause).unwrap();
        assert_eq!(world.runner_state, RunnerState::Paused);

        let resume = Command {
            id: "c2".into(),
            ts: 1,
            kind: CommandKind::Resume,
        };
        apply_command(&mut world, &resume).unwrap();
        assert_eq!(world.runner_state, RunnerState::Running);
    }

    #[test]
    fn set_goal_patch_updates_weight() {
        let mut world = crate::world::tests::minimal_world();
        let goal_id = world.evaluation.goals[0].id.clone();
        let cmd = Command {
            id: "c3".into(),
            ts: 0,
            kind: CommandKind::SetGoal {
                goal_id: goal_id.as_str().to_string(),
                patch: serde_json::json!({"weight": 5.0}),
            },
        };
        apply_command(&mut world, &cmd).unwrap();
        assert_eq!(world.evaluation.goals[0].weight, 5.0);
    }

    #[test]
    fn unknown_param_path_errors() {
        let mut world = crate::world::tests::minimal_world();
        let cmd = Command {
            id: "c4".into(),
            ts: 0,
            kind: CommandKind::SetParam {
                path: "nonsense".into(),
                value: serde_json::json!(1),
            },
        };
        assert!(apply_command(&mut world, &cmd).is_err());
    }
}
