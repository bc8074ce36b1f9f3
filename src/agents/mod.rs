//! The six agent kinds of spec.md §4.3, each a small state machine
//! embedding a shared `AgentCore` (mode, health, retirement, timer).

pub mod assembly_robot;
pub mod fuel_generator;
pub mod isru;
pub mod printing_robot;
pub mod rocket;
pub mod science_rover;

pub use assembly_robot::{AssemblyOutcome, AssemblyRobot, AssemblyRobotConfig};
pub use fuel_generator::{FuelGenerator, FuelGeneratorConfig};
pub use isru::{IsruAgent, IsruConfig, IsruMode, IsruModeConfig, IsruOutcome};
pub use printing_robot::{PrintOutcome, PrintingRobot, PrintingRobotConfig};
pub use rocket::{Rocket, RocketConfig, RocketOutcome};
pub use science_rover::{ScienceRover, ScienceRoverConfig, ScienceRoverOutcome};
