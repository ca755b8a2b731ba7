// E-Renstra Workflow Core - Program Kerja Lifecycle Management
// This exposes the core components for testing and integration

pub mod config;
pub mod program;
pub mod store;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{config, ERenstraConfig};
pub use program::{
    allowed_actions, evaluate, Actor, ApprovalOutcome, Komentar, Laporan, NewLaporan,
    ProgramKerja, ProgramStatus, ProgressPolicy, ProgressTracker, RecordingListener, Role,
    TransitionDecision, TransitionEvent, TransitionExecutor, TransitionListener, WorkflowAction,
    WorkflowError,
};
pub use store::{InMemoryStore, ProgramStore, ReportStore, WorkflowStore};
pub use telemetry::{
    create_workflow_span, generate_correlation_id, init_telemetry, shutdown_telemetry,
};

#[cfg(feature = "database")]
pub use store::SqliteStore;
