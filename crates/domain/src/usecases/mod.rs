//! Application use cases / business logic

pub mod fetch;
pub mod orchestrator;
pub mod publish;
pub mod render;
pub mod retention;
pub mod schedule;

pub use fetch::{FetchCycle, FetchError};
pub use orchestrator::{
    LifecycleState, Orchestrator, OrchestratorConfig, OrchestratorError, ShutdownOutcome,
};
pub use publish::{PublishConfig, PublishCycle, SummaryError};
pub use render::{RenderConfig, Renderer};
pub use retention::{RETENTION_PERIOD, RetentionCycle};
pub use schedule::{FirstRun, Ticker};
