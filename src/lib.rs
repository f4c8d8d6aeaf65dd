pub mod config;
pub mod dom;
pub mod drift;
pub mod models;
pub mod platforms;
pub mod probe;
pub mod reconciler;
pub mod refresher;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod utils;

// Re-export commonly used types
pub use crate::config::AppConfig;
pub use drift::DriftDetector;
pub use probe::SelectorProbe;
pub use reconciler::{CycleOutcome, CyclePhase, LoopSettings, ReconciliationLoop, RefreshOutcome};
pub use refresher::{DataRefresher, ProductRefresher, RefreshReport};
pub use scheduler::{CronTrigger, CycleCallback, Trigger};
pub use store::ConfigStore;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
