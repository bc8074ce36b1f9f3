//! End-to-end integration tests driving a full `World` built from
//! documents via `Builder`, rather than exercising one sector/policy in
//! isolation (spec.md §8's invariants and determinism property, scenario
//! S6 through the real step pipeline instead of just `Rocket` directly).

use proxima::builder::Builder;
use proxima::models::{Event, Locale, ResourceId, SectorId, Stock};
use proxima::store::{ConfigStore, InMemoryConfigStore};
use serde_json::json;

/// Seeds a minimal but complete document set: one agent per sector,
/// enough goals/metrics/policies to exercise the evaluation and policy
/// engines, matching the collection names of spec.md §6.
async fn seed_store(store: &InMemoryConfigStore, experiment_id: &str, seed: u64) {
    store
        .put_document(
            "component_templates",
            "tmpl_isru",
            json!({
                "efficiency": 1.0,
                "wear_per_active_step": 0.0,
                "modes": {
                    "IceExtraction": {
                        "power_kwh": 1.0,
                        "throughput_tons": 1.0,
                        "inputs": [],
                        "outputs": [["H2O_kg", 2.0]],
                        "he3_ppb": null
                    },
                    "He3Extraction": {
                        "power_kwh": 2.0,
                        "throughput_tons": 1.0,
                        "inputs": [],
                        "outputs": [],
                        "he3_ppb": [5.0, 10.0, 20.0]
                    },
                    "RegolithExtraction": {
                        "power_kwh": 1.0,
                        "throughput_tons": 1.0,
                        "inputs": [],
                        "outputs": [["regolith_kg", 5.0]],
                        "he3_ppb": null
                    },
                    "Electrolysis": {
                        "power_kwh": 1.0,
                        "throughput_tons": 1.0,
                        "inputs": [["H2O_kg", 1.0]],
                        "outputs": [["O2_kg", 1.0]],
                        "he3_ppb": null
                    },
                    "Metal": {
                        "power_kwh": 1.0,
                        "throughput_tons": 1.0,
                        "inputs": [["regolith_kg", 1.0]],
                        "outputs": [["metal_kg", 1.0]],
                        "he3_ppb": null
                    }
                }
            }),
        )
        .await;
    store
        .put_document(
            "component_templates",
            "tmpl_printing",
            json!({"processing_time_steps": 2, "power_kwh": 1.0, "regolith_kg_per_step": 1.0}),
        )
        .await;
    store
        .put_document(
            "component_templates",
            "tmpl_assembly",
            json!({"assembly_time_steps": 2, "power_kwh": 1.0}),
        )
        .await;
    store
        .put_document(
            "component_templates",
            "tmpl_rocket",
            json!({"distance_km": 100.0, "cruise_speed_kmh": 50.0, "loading_steps": 2, "prop_per_kg": 0.1}),
        )
        .await;
    store
        .put_document(
            "component_templates",
            "tmpl_fuelgen",
            json!({
                "gwh_thermal_per_kg": 1.0,
                "efficiency": 1.0,
                "kwh_per_kg_prop": 1.0,
                "power_kwh": 1.0,
                "max_he3_kg_per_step": 10.0
            }),
        )
        .await;
    store
        .put_document(
            "component_templates",
            "tmpl_rover",
            json!({
                "battery_capacity_kwh": 10.0,
                "min_battery_to_operate_kwh": 1.0,
                "charge_rate_kwh": 2.0,
                "operate_power_kwh": 1.0,
                "science_generation_per_step": 5.0
            }),
        )
        .await;

    store
        .put_document(
            "world_systems",
            "ws-1",
            json!({
                "energy": {"generation_kwh": 100.0, "battery_capacity_kwh": 50.0},
                "manufacturing": {
                    "agents": [{"id": "isru-1", "template_id": "tmpl_isru", "lifetime_steps": 100_000}],
                    "buffer_targets": {"He3_kg": {"min": 10.0, "max": 50.0}}
                },
                "construction": {
                    "printing_robots": [{"id": "print-1", "template_id": "tmpl_printing", "lifetime_steps": 100_000}],
                    "assembly_robots": [{"id": "assy-1", "template_id": "tmpl_assembly", "lifetime_steps": 100_000}],
                    "shell_storage_capacity": 5
                },
                "equipment": {"minimum_levels": {"Science_Rover_EQ": 3}},
                "transportation": {
                    "rockets": [{"id": "rocket-1", "template_id": "tmpl_rocket", "lifetime_steps": 100_000}],
                    "fuel_generators": [{"id": "fuelgen-1", "template_id": "tmpl_fuelgen", "lifetime_steps": 100_000}]
                },
                "science": {
                    "rovers": [{"id": "rover-1", "template_id": "tmpl_rover", "lifetime_steps": 100_000}],
                    "rover_template_id": "tmpl_rover"
                }
            }),
        )
        .await;

    store
        .put_document(
            "goals",
            "g-science",
            json!({
                "id": "g-science", "metric_id": "science_rate", "direction": "Maximize",
                "kind": {"Target": {"target": 100.0}}, "weight": 1.0, "horizon": 10
            }),
        )
        .await;
    store
        .put_document(
            "metrics",
            "science_rate",
            json!({"id": "science_rate", "name": "Science Rate", "polarity": "Positive", "unit": "units"}),
        )
        .await;
    store
        .put_document(
            "metrics",
            "dust",
            json!({"id": "dust", "name": "Dust Coverage", "polarity": "Negative", "unit": "ratio"}),
        )
        .await;
    store
        .put_document(
            "metrics",
            "power_shortage_kw",
            json!({"id": "power_shortage_kw", "name": "Power Shortage", "polarity": "Negative", "unit": "kW"}),
        )
        .await;
    store
        .put_document(
            "metrics",
            "backlog_expired_count",
            json!({"id": "backlog_expired_count", "name": "Expired Backlog", "polarity": "Negative", "unit": "count"}),
        )
        .await;

    store
        .put_document(
            "policies",
            "PLCY-DUST-THROTTLE",
            json!({
                "type": "dust_throttle", "enabled": true,
                "dust_metric_id": "dust", "dust_target": 1.0,
                "sectors": ["manufacturing", "science"]
            }),
        )
        .await;
    store
        .put_document(
            "policies",
            "PLCY-FLEET-MAINTENANCE",
            json!({"type": "fleet_maintenance", "enabled": true, "maintenance_window_steps": 24}),
        )
        .await;

    store
        .put_document(
            "experiments",
            experiment_id,
            json!({
                "world_system_id": "ws-1",
                "seed": seed,
                "commit_mode": "strict",
                "max_backlog_age_steps": 720
            }),
        )
        .await;
}

fn seed_stock(stock: &mut Stock, pairs: &[(&str, f64)]) {
    for (resource, qty) in pairs {
        stock.set(ResourceId::new(*resource), *qty);
    }
}

#[tokio::test]
async fn stocks_never_go_negative_over_many_steps() {
    let store = InMemoryConfigStore::new();
    seed_store(&store, "exp-invariant", 7).await;
    let mut world = Builder::new(&store).build_world("exp-invariant").await.unwrap();

    let mut manufacturing_stock = Stock::default();
    seed_stock(&mut manufacturing_stock, &[("He3_kg", 5.0), ("H2O_kg", 5.0), ("regolith_kg", 5.0)]);
    world.stocks.insert(SectorId::new("manufacturing"), manufacturing_stock);

    let mut construction_stock = Stock::default();
    seed_stock(&mut construction_stock, &[("regolith_kg", 20.0), ("shells", 0.0)]);
    world.stocks.insert(SectorId::new("construction"), construction_stock);

    let mut transportation_stock = Stock::default();
    seed_stock(&mut transportation_stock, &[("He3_kg", 20.0), ("rocket_fuel_kg", 5.0)]);
    world.stocks.insert(SectorId::new("transportation"), transportation_stock);

    for _ in 0..200 {
        world.step();
        for stock in world.stocks.values() {
            for (resource, qty) in &stock.0 {
                assert!(*qty >= 0.0, "resource {resource} went negative: {qty}");
            }
        }
    }
}

#[tokio::test]
async fn identical_seed_and_config_produce_identical_traces() {
    async fn run(seed: u64, steps: u64) -> Vec<String> {
        let store = InMemoryConfigStore::new();
        seed_store(&store, "exp-det", seed).await;
        let mut world = Builder::new(&store).build_world("exp-det").await.unwrap();

        let mut manufacturing_stock = Stock::default();
        seed_stock(&mut manufacturing_stock, &[("He3_kg", 5.0), ("H2O_kg", 5.0), ("regolith_kg", 5.0)]);
        world.stocks.insert(SectorId::new("manufacturing"), manufacturing_stock);
        let mut construction_stock = Stock::default();
        seed_stock(&mut construction_stock, &[("regolith_kg", 20.0)]);
        world.stocks.insert(SectorId::new("construction"), construction_stock);

        let mut snapshots = Vec::new();
        for _ in 0..steps {
            let snapshot = world.step();
            snapshots.push(serde_json::to_string(&snapshot.evaluation).unwrap());
            snapshots.push(serde_json::to_string(&snapshot.sectors).unwrap());
        }
        snapshots
    }

    let a = run(123, 50).await;
    let b = run(123, 50).await;
    assert_eq!(a, b, "identical seed/config must produce a bit-reproducible trace");

    let c = run(999, 50).await;
    assert_ne!(a, c, "a different seed should (almost certainly) diverge somewhere across 50 stochastic steps");
}

#[tokio::test]
async fn dust_throttle_engages_through_the_full_policy_pipeline() {
    let store = InMemoryConfigStore::new();
    seed_store(&store, "exp-dust", 1).await;
    let mut world = Builder::new(&store).build_world("exp-dust").await.unwrap();

    // No sector produces a "dust" contribution in this crate (it's an
    // environmental input, not an agent output) -- inject it the way an
    // external sensor/command would, same as scenario S1 of spec.md §8.
    world
        .evaluation
        .set_contribution(&proxima::models::MetricId::new("dust"), SectorId::new("environment"), 0.85);

    world.step();

    assert!(
        (world.manufacturing.throttle_factor - 0.4).abs() < 1e-9,
        "expected manufacturing throttle 0.4 per scenario S1, got {}",
        world.manufacturing.throttle_factor
    );
    assert!(
        (world.science.throttle_factor - 0.4).abs() < 1e-9,
        "expected science throttle 0.4 per scenario S1, got {}",
        world.science.throttle_factor
    );

    // Dropping dust back into the safe band resets the throttle to 0.
    world
        .evaluation
        .set_contribution(&proxima::models::MetricId::new("dust"), SectorId::new("environment"), 0.2);
    world.step();
    assert_eq!(world.manufacturing.throttle_factor, 0.0);
    assert_eq!(world.science.throttle_factor, 0.0);
}

#[tokio::test]
async fn rocket_round_trip_through_the_full_world() {
    let store = InMemoryConfigStore::new();
    seed_store(&store, "exp-rocket", 5).await;
    let mut world = Builder::new(&store).build_world("exp-rocket").await.unwrap();

    let mut transportation_stock = Stock::default();
    seed_stock(&mut transportation_stock, &[("rocket_fuel_kg", 100.0)]);
    world.stocks.insert(SectorId::new("transportation"), transportation_stock);

    // Drive a transport_request onto the bus the way Construction/Equipment
    // would; it's delivered at the next step boundary (spec.md §4.1).
    let mut payload = std::collections::BTreeMap::new();
    payload.insert(ResourceId::new("Science_Rover_EQ"), 2.0);
    world.event_bus.publish(Event::TransportRequest {
        payload,
        origin: Locale::Earth,
        destination: Locale::Moon,
        requester: SectorId::new("construction"),
    });

    // A one-way mission's `return_payload` is empty, so (per
    // `TransportationSector::step`) no second `payload_delivered` fires on
    // the Earth leg -- there is nothing to hand off on the way back. The
    // round trip still has to complete: idle -> busy -> idle again.
    let mut delivered_to_moon = false;
    let mut launched = false;
    let mut returned_idle = false;
    for _ in 0..40 {
        world.step();
        let rocket_idle = world.transportation.rockets[0].is_idle();
        if launched && rocket_idle {
            returned_idle = true;
        }
        if !rocket_idle {
            launched = true;
        }
        for event in world.event_bus.all_current() {
            if let Event::PayloadDelivered { destination: Locale::Moon, .. } = event {
                delivered_to_moon = true;
            }
        }
    }

    assert!(launched, "rocket never left IDLE to carry out the mission");
    assert!(delivered_to_moon, "rocket never delivered its payload to the Moon");
    assert!(returned_idle, "rocket never returned to IDLE after its round trip");
}

#[tokio::test]
async fn equipment_resupply_does_not_duplicate_while_pending() {
    let store = InMemoryConfigStore::new();
    seed_store(&store, "exp-equip", 3).await;
    let mut world = Builder::new(&store).build_world("exp-equip").await.unwrap();

    // world_systems/ws-1's equipment sector has no seeded inventory and a
    // minimum_level of 3 for Science_Rover_EQ, so the very first step
    // should trip the resupply trigger once (scenario S4, spec.md §8).
    world.step();
    let after_first = world.equipment.inventory.get("Science_Rover_EQ").unwrap().pending_orders;
    assert_eq!(after_first, 3, "first under-stocked step should order the full shortfall");

    world.step();
    let after_second = world.equipment.inventory.get("Science_Rover_EQ").unwrap().pending_orders;
    assert_eq!(
        after_second, after_first,
        "no delivery has arrived yet, so the sector must not publish a duplicate resupply request"
    );
}
