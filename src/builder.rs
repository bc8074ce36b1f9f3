//! Builder: resolves component templates into concrete sector configs
//! (spec.md §6: "the builder resolves templates by overlay"), composing
//! live state from raw JSON documents fetched from the config store: a
//! one-level recursive overlay merge of a template document with a
//! per-placement override document.

use crate::agents::{
    AssemblyRobot, AssemblyRobotConfig, FuelGenerator, FuelGeneratorConfig, IsruAgent, IsruConfig, PrintingRobot,
    PrintingRobotConfig, Rocket, RocketConfig, ScienceRover, ScienceRoverConfig,
};
use crate::config::CommitMode;
use crate::error::{ProximaError, Result};
use crate::evaluation::EvaluationEngine;
use crate::models::{AgentCore, AgentId, BufferTarget, Goal, Locale, MetricId, PerformanceMetric, Polarity, ResourceId, SectorId};
use crate::policy::{DustThrottlePolicy, FleetMaintenancePolicy, Policy, PolicyEngine, ScienceGrowthPolicy};
use crate::sectors::{ConstructionSector, EnergySector, EquipmentSector, ManufacturingSector, ScienceSector, TransportationSector};
use crate::store::ConfigStore;
use crate::world::World;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Shallow JSON-object overlay: keys present in `overrides` replace the
/// matching key in `template`; one level of nested objects (e.g. a
/// per-mode config table) is merged key-by-key, anything deeper is
/// replaced wholesale rather than recursively diffed.
pub fn overlay(template: &Value, overrides: &Value) -> Value {
    if overrides.is_null() {
        return template.clone();
    }
    let (Value::Object(base), Value::Object(patch)) = (template, overrides) else {
        return overrides.clone();
    };
    let mut merged = base.clone();
    for (key, patch_value) in patch {
        match (merged.get(key), patch_value) {
            (Some(Value::Object(existing)), Value::Object(nested_patch)) => {
                let mut nested = existing.clone();
                for (nk, nv) in nested_patch {
                    nested.insert(nk.clone(), nv.clone());
                }
                merged.insert(key.clone(), Value::Object(nested));
            }
            _ => {
                merged.insert(key.clone(), patch_value.clone());
            }
        }
    }
    Value::Object(merged)
}

fn resolve<C: DeserializeOwned>(template: &Value, overrides: &Value) -> Result<C> {
    serde_json::from_value(overlay(template, overrides)).map_err(|e| ProximaError::Config(e.to_string()))
}

/// A single agent placement: which template to overlay, the per-agent
/// override document, and the agent's own identity/lifetime.
#[derive(Debug, Clone, serde::Deserialize)]
struct MetricDoc {
    id: MetricId,
    name: String,
    polarity: Polarity,
    unit: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct Placement {
    id: String,
    template_id: String,
    #[serde(default)]
    overrides: Value,
    lifetime_steps: u64,
}

pub struct Builder<'a> {
    store: &'a dyn ConfigStore,
}

impl<'a> Builder<'a> {
    pub fn new(store: &'a dyn ConfigStore) -> Self {
        Builder { store }
    }

    async fn template(&self, template_id: &str) -> Result<Value> {
        self.store
            .get_document("component_templates", template_id)
            .await
            .ok_or_else(|| ProximaError::Config(format!("no such component template: {template_id}")))
    }

    async fn placements<C: DeserializeOwned>(&self, sector: &Value, key: &str) -> Result<Vec<(Placement, C)>> {
        let raw = sector.get(key).cloned().unwrap_or(Value::Array(vec![]));
        let placements: Vec<Placement> = serde_json::from_value(raw).map_err(|e| ProximaError::Config(e.to_string()))?;
        let mut out = Vec::with_capacity(placements.len());
        for placement in placements {
            let template = self.template(&placement.template_id).await?;
            let config: C = resolve(&template, &placement.overrides)?;
            out.push((placement.clone(), config));
        }
        Ok(out)
    }

    async fn build_manufacturing(&self, id: SectorId, doc: &Value) -> Result<ManufacturingSector> {
        let mut agents = Vec::new();
        for (placement, config) in self.placements::<IsruConfig>(doc, "agents").await? {
            let core = AgentCore::new(AgentId::new(placement.id), id.clone(), placement.lifetime_steps);
            agents.push(IsruAgent { core, config });
        }
        let buffer_targets: BTreeMap<ResourceId, BufferTarget> = doc
            .get("buffer_targets")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ProximaError::Config(e.to_string()))?
            .unwrap_or_default();
        let mut sector = ManufacturingSector::new(id, agents, buffer_targets);
        sector.he3_low_threshold = doc.get("he3_low_threshold").and_then(|v| v.as_f64()).unwrap_or(0.0);
        sector.fuel_low_threshold = doc.get("fuel_low_threshold").and_then(|v| v.as_f64()).unwrap_or(0.0);
        Ok(sector)
    }

    async fn build_construction(&self, id: SectorId, doc: &Value) -> Result<ConstructionSector> {
        let mut printing_robots = Vec::new();
        for (placement, config) in self.placements::<PrintingRobotConfig>(doc, "printing_robots").await? {
            let core = AgentCore::new(AgentId::new(placement.id), id.clone(), placement.lifetime_steps);
            printing_robots.push(PrintingRobot { core, config });
        }
        let mut assembly_robots = Vec::new();
        for (placement, config) in self.placements::<AssemblyRobotConfig>(doc, "assembly_robots").await? {
            let core = AgentCore::new(AgentId::new(placement.id), id.clone(), placement.lifetime_steps);
            assembly_robots.push(AssemblyRobot::new(core, config));
        }
        let shell_storage_capacity = doc.get("shell_storage_capacity").and_then(|v| v.as_u64()).unwrap_or(0);
        Ok(ConstructionSector::new(id, printing_robots, assembly_robots, shell_storage_capacity))
    }

    async fn build_equipment(&self, id: SectorId, doc: &Value) -> Result<EquipmentSector> {
        let minimum_levels: BTreeMap<String, u64> = doc
            .get("minimum_levels")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ProximaError::Config(e.to_string()))?
            .unwrap_or_default();
        Ok(EquipmentSector::new(id, minimum_levels))
    }

    async fn build_transportation(&self, id: SectorId, doc: &Value) -> Result<TransportationSector> {
        let mut rockets = Vec::new();
        for (placement, config) in self.placements::<RocketConfig>(doc, "rockets").await? {
            let core = AgentCore::new(AgentId::new(placement.id), id.clone(), placement.lifetime_steps);
            rockets.push(Rocket::new(core, config, Locale::Moon));
        }
        let mut fuel_generators = Vec::new();
        for (placement, config) in self.placements::<FuelGeneratorConfig>(doc, "fuel_generators").await? {
            let core = AgentCore::new(AgentId::new(placement.id), id.clone(), placement.lifetime_steps);
            fuel_generators.push(FuelGenerator { core, config });
        }
        let mut sector = TransportationSector::new(id, rockets, fuel_generators);
        sector.he3_low_threshold = doc.get("he3_low_threshold").and_then(|v| v.as_f64()).unwrap_or(0.0);
        Ok(sector)
    }

    async fn build_science(&self, id: SectorId, doc: &Value) -> Result<ScienceSector> {
        let mut rovers = Vec::new();
        for (placement, config) in self.placements::<ScienceRoverConfig>(doc, "rovers").await? {
            let core = AgentCore::new(AgentId::new(placement.id), id.clone(), placement.lifetime_steps);
            rovers.push(ScienceRover::new(core, config));
        }
        let rover_template_id = doc
            .get("rover_template_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProximaError::Config("science sector missing rover_template_id".into()))?;
        let rover_template: ScienceRoverConfig = resolve(&self.template(rover_template_id).await?, &Value::Null)?;
        Ok(ScienceSector::new(id, rovers, rover_template))
    }

    fn build_energy(&self, id: SectorId, doc: &Value) -> Result<EnergySector> {
        let generation_kwh = doc
            .get("generation_kwh")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| ProximaError::Config("energy sector missing generation_kwh".into()))?;
        let battery_capacity_kwh = doc.get("battery_capacity_kwh").and_then(|v| v.as_f64()).unwrap_or(0.0);
        Ok(EnergySector::new(id, generation_kwh, battery_capacity_kwh))
    }

    fn build_policy(&self, doc: &Value) -> Result<Box<dyn Policy>> {
        let kind = doc
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProximaError::Config("policy document missing 'type'".into()))?;
        let policy: Box<dyn Policy> = match kind {
            "dust_throttle" => {
                let dust_metric_id = crate::models::MetricId::new(field_str(doc, "dust_metric_id")?);
                let dust_target = field_f64(doc, "dust_target")?;
                let sectors: Vec<SectorId> = doc
                    .get("sectors")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| ProximaError::Config(e.to_string()))?
                    .unwrap_or_default();
                Box::new(DustThrottlePolicy::new(dust_metric_id, dust_target, sectors))
            }
            "science_growth" => {
                let metric_id = crate::models::MetricId::new(field_str(doc, "active_rovers_metric_id")?);
                let requester = SectorId::new(field_str(doc, "requester")?);
                Box::new(ScienceGrowthPolicy::new(metric_id, requester))
            }
            // "fleet_maintenance" is handled separately in `build_world`:
            // it drives `World.maintenance` directly rather than going
            // through the generic `PolicyEngine` registry.
            other => return Err(ProximaError::Config(format!("unknown policy type: {other}"))),
        };
        Ok(policy)
    }

    /// Builds a full `World` from the `experiments`/`world_systems`/
    /// `component_templates`/`goals`/`policies` collections.
    pub async fn build_world(&self, experiment_id: &str) -> Result<World> {
        let experiment = self
            .store
            .get_document("experiments", experiment_id)
            .await
            .ok_or_else(|| ProximaError::Config(format!("no such experiment: {experiment_id}")))?;
        let world_system_id = field_str(&experiment, "world_system_id")?;
        let seed = experiment.get("seed").and_then(|v| v.as_u64()).unwrap_or(1);
        let commit_mode = match experiment.get("commit_mode").and_then(|v| v.as_str()) {
            Some("lenient") => CommitMode::Lenient,
            _ => CommitMode::Strict,
        };
        let max_backlog_age_steps = experiment.get("max_backlog_age_steps").and_then(|v| v.as_u64()).unwrap_or(720);

        let world_system = self
            .store
            .get_document("world_systems", &world_system_id)
            .await
            .ok_or_else(|| ProximaError::Config(format!("no such world_system: {world_system_id}")))?;

        let energy_id = SectorId::new("energy");
        let manufacturing_id = SectorId::new("manufacturing");
        let construction_id = SectorId::new("construction");
        let equipment_id = SectorId::new("equipment");
        let transportation_id = SectorId::new("transportation");
        let science_id = SectorId::new("science");

        let energy = self.build_energy(energy_id, sector_doc(&world_system, "energy"))?;
        let manufacturing = self
            .build_manufacturing(manufacturing_id, sector_doc(&world_system, "manufacturing"))
            .await?;
        let construction = self
            .build_construction(construction_id, sector_doc(&world_system, "construction"))
            .await?;
        let equipment = self.build_equipment(equipment_id, sector_doc(&world_system, "equipment")).await?;
        let transportation = self
            .build_transportation(transportation_id, sector_doc(&world_system, "transportation"))
            .await?;
        let science = self.build_science(science_id, sector_doc(&world_system, "science")).await?;

        let goal_docs = self.store.list_collection("goals").await;
        let mut goals = Vec::with_capacity(goal_docs.len());
        for doc in goal_docs {
            goals.push(serde_json::from_value::<Goal>(doc).map_err(|e| ProximaError::Config(e.to_string()))?);
        }
        let metric_docs = self.store.list_collection("metrics").await;
        let mut metrics = Vec::with_capacity(metric_docs.len());
        for doc in metric_docs {
            let spec: MetricDoc = serde_json::from_value(doc).map_err(|e| ProximaError::Config(e.to_string()))?;
            metrics.push(PerformanceMetric::new(spec.id, spec.name, spec.polarity, spec.unit));
        }
        let evaluation = EvaluationEngine::new(metrics, goals);

        let mut policy_engine = PolicyEngine::new();
        let mut maintenance = FleetMaintenancePolicy::new(24);
        for doc in self.store.list_collection("policies").await {
            if doc.get("enabled").and_then(|v| v.as_bool()) == Some(false) {
                continue;
            }
            if doc.get("type").and_then(|v| v.as_str()) == Some("fleet_maintenance") {
                let window = doc.get("maintenance_window_steps").and_then(|v| v.as_u64()).unwrap_or(24);
                maintenance = FleetMaintenancePolicy::new(window);
                continue;
            }
            policy_engine.register(self.build_policy(&doc)?);
        }

        Ok(World::new(
            experiment_id.to_string(),
            seed,
            commit_mode,
            max_backlog_age_steps,
            energy,
            manufacturing,
            construction,
            equipment,
            transportation,
            science,
            evaluation,
            policy_engine,
            maintenance,
        ))
    }
}

fn sector_doc<'a>(world_system: &'a Value, key: &str) -> &'a Value {
    static EMPTY: Value = Value::Null;
    world_system.get(key).unwrap_or(&EMPTY)
}

fn field_str<'a>(doc: &'a Value, key: &str) -> Result<&'a str> {
    doc.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProximaError::Config(format!("document missing field '{key}'")))
}

fn field_f64(doc: &Value, key: &str) -> Result<f64> {
    doc.get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| ProximaError::Config(format!("document missing field '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_merges_one_level_of_nesting() {
        let template = serde_json::json!({
            "efficiency": 0.8,
            "modes": {"idle": {"power_kwh": 0.0}, "active": {"power_kwh": 5.0}},
        });
        let overrides = serde_json::json!({"modes": {"active": {"power_kwh": 7.5}}});
        let merged = overlay(&template, &overrides);
        assert_eq!(merged["efficiency"], 0.8);
        assert_eq!(merged["modes"]["active"]["power_kwh"], 7.5);
        assert_eq!(merged["modes"]["idle"]["power_kwh"], 0.0);
    }

    #[test]
    fn overlay_with_no_overrides_is_identity() {
        let template = serde_json::json!({"a": 1, "b": {"c": 2}});
        let merged = overlay(&template, &Value::Object(Default::default()));
        assert_eq!(merged, template);
    }
}
