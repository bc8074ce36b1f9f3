//! External collaborator seams (spec.md §1, §6): the document config
//! store, the simulation log sinks, and the dashboard command source.
//! The kernel depends only on these traits; concrete implementations are
//! the simplest correct thing for each (an in-process map for tests, a
//! Postgres-backed table for the document store, CSV/Scylla/remote-upload
//! for the log sinks) rather than a full external service.

pub mod command_source;
pub mod config_store;
pub mod log_sink;

pub use command_source::{Command, CommandKind, CommandSource, PollingCommandSource};
pub use config_store::{ConfigStore, InMemoryConfigStore, PostgresConfigStore};
pub use log_sink::{CsvLogSink, FanoutLogSink, RemoteUploadLogSink, SimulationLogSink, TimeseriesLogSink};
