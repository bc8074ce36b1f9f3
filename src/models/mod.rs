pub mod agent;
pub mod construction;
pub mod event;
pub mod goal;
pub mod ids;
pub mod resource;
pub mod transport;

pub use agent::{AgentCore, Health, Mode};
pub use construction::{ConstructionRequest, ConstructionStatus};
pub use event::{Event, Topic};
pub use goal::{
    Direction, EvaluationResult, Goal, GoalKind, GoalScore, GoalStatus, PerformanceMetric, Polarity,
};
pub use ids::{AgentId, GoalId, MetricId, PolicyId, RequestId, ResourceId, SectorId, TaskId};
pub use resource::{BufferTarget, FlowEndpoint, Stock, StockFlow};
pub use transport::{Locale, RocketMission, RocketState, TransportRequest};
