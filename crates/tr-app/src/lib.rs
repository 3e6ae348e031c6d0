//! Application service layer for the thermoramp bench.
//!
//! Owns configuration, the run loop driver and stored-run queries, so the
//! CLI stays a thin frontend.

pub mod cancel;
pub mod clock;
pub mod config;
pub mod error;
pub mod progress;
pub mod query;
pub mod run_service;

pub use cancel::{CancelToken, install_signal_handlers};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    BenchConfig, ConfigOverrides, DevicesConfig, ProbeConfig, RampConfig, RegulationConfig,
    RunConfig, SupplyConfig, load_config, save_config, validate_config,
};
pub use error::{AppError, AppResult};
pub use progress::RunProgressEvent;
pub use query::{RunSummary, get_run_summary, list_runs, load_run};
pub use run_service::{RunReport, execute_run, run_bench};
