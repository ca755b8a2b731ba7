//! Work-program lifecycle module.
//!
//! Implements the status workflow a ProgramKerja moves through:
//! Draft -> Planning -> Menunggu_Approve_Waket -> Disetujui/Ditolak ->
//! On_Progress -> Done, with two approval gates, owner-only progress
//! reporting, and supervisor-verified completion.
//!
//! # Architecture
//!
//! - **Guard evaluator** (`guard`): pure transition table; decides
//!   whether a (status, role, action) triple is legal
//! - **Executor** (`executor`): applies guard-approved transitions via
//!   an atomic compare-and-swap store write
//! - **Progress tracker** (`progress`): append-only report log feeding
//!   the program's progress percentage
//! - **Events** (`events`): transition callbacks for the notification
//!   collaborators

pub mod error;
pub mod events;
pub mod executor;
pub mod guard;
pub mod progress;
pub mod types;

pub use error::WorkflowError;
pub use events::{RecordingListener, TransitionEvent, TransitionListener};
pub use executor::TransitionExecutor;
pub use guard::{allowed_actions, can_submit_report, evaluate, TransitionDecision, WorkflowAction};
pub use progress::{ProgressPolicy, ProgressTracker};
pub use types::{
    Actor, ApprovalOutcome, Komentar, Laporan, NewLaporan, ProgramKerja, ProgramStatus, Role,
};
