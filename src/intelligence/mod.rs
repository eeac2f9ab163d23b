//! Clinical risk alerting.
//!
//! Rule evaluation, trend analysis and score aggregation are pure functions
//! over observations. The orchestrator and the periodic sweep turn findings
//! into persisted alerts behind a shared dedup window.

pub mod dedup;
pub mod detection;
pub mod emergency;
pub mod engine;
pub mod messages;
pub mod reference;
pub mod score;
pub mod sweep;
pub mod traits;
pub mod trend;
pub mod types;

pub use dedup::{DedupDecision, DedupKey, DedupPolicy, DedupWindow};
pub use detection::{evaluate_observation, evaluate_with_prior, headline};
pub use emergency::EmergencyProtocol;
pub use engine::{AlertOrchestrator, AlertingEngine, ManualAlertRequest};
pub use score::aggregate;
pub use sweep::{start_sweep_scheduler, PeriodicSweep, SweepHandle, SweepReport};
pub use traits::{AlertRepository, AuditSink, PatientDirectory};
pub use trend::{analyze_trend, analyze_trend_with};
pub use types::*;
