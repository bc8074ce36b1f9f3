//! Sector schedulers (spec.md §4.4). Each sector owns its agents, local
//! backlogs, and a throttle factor; none of them mutate stock directly.
//! All resource movement is expressed as `StockFlow`s handed to the
//! kernel's `StockFlowLedger` and committed at the end of the step.

pub mod construction;
pub mod energy;
pub mod equipment;
pub mod manufacturing;
pub mod science;
pub mod transportation;

pub use construction::{equipment_resource_for, ConstructionSector};
pub use energy::EnergySector;
pub use equipment::EquipmentSector;
pub use manufacturing::ManufacturingSector;
pub use science::ScienceSector;
pub use transportation::TransportationSector;
