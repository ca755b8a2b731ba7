//! Progress accumulator.
//!
//! Turns the append-only Laporan log into the program's progress
//! percentage. A program that reports 100 surfaces in the
//! pending-verification queue but stays On_Progress until a supervisor
//! verifies completion through the executor.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::program::error::WorkflowError;
use crate::program::guard;
use crate::program::types::{Actor, Komentar, Laporan, NewLaporan, ProgramKerja, ProgramStatus};
use crate::store::{ProgramStore, ReportStore, WorkflowStore};

/// Policy for reports whose `realisasi` is lower than the program's
/// current progress. Rewinds correct an overstated earlier report and
/// are accepted by default; `Monotonic` makes them a validation error
/// instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPolicy {
    #[default]
    AllowRewind,
    Monotonic,
}

pub struct ProgressTracker {
    store: Arc<dyn WorkflowStore>,
    policy: ProgressPolicy,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self {
            store,
            policy: ProgressPolicy::default(),
        }
    }

    /// Build a tracker with the policy from the global configuration
    /// (defaults, `e-renstra.toml`, `E_RENSTRA_*` environment).
    pub fn from_config(store: Arc<dyn WorkflowStore>) -> anyhow::Result<Self> {
        let config = crate::config::config()?;
        Ok(Self {
            store,
            policy: config.workflow.progress_policy,
        })
    }

    pub fn with_policy(mut self, policy: ProgressPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ProgressPolicy {
        self.policy
    }

    /// Submit a progress report for a running program.
    ///
    /// Validation happens before any write: the program must be
    /// On_Progress, the actor must own it, and `realisasi` must be in
    /// range (and non-decreasing under `Monotonic`). The progress
    /// update and the report append go through one atomic store
    /// operation keyed on the version read here, so a lost race or a
    /// failed append leaves both the program and the log untouched.
    pub async fn submit_report(
        &self,
        program_id: Uuid,
        actor: &Actor,
        report: NewLaporan,
    ) -> Result<Laporan, WorkflowError> {
        let program = self
            .store
            .get(program_id)
            .await?
            .ok_or(WorkflowError::NotFound { id: program_id })?;

        guard::can_submit_report(&program, actor)?;

        if report.realisasi > 100 {
            return Err(WorkflowError::validation(format!(
                "realisasi must be between 0 and 100, got {}",
                report.realisasi
            )));
        }
        if self.policy == ProgressPolicy::Monotonic && report.realisasi < program.progress {
            return Err(WorkflowError::validation(format!(
                "realisasi {} is below current progress {} and the monotonic policy is active",
                report.realisasi, program.progress
            )));
        }

        let now = Utc::now();
        let read_version = program.version;
        let previous_progress = program.progress;

        let mut updated = program;
        updated.progress = report.realisasi;
        updated.updated_at = now;

        let laporan = Laporan {
            id: Uuid::new_v4(),
            program_kerja_id: program_id,
            user_id: actor.user_id,
            laporan: report.laporan,
            realisasi: report.realisasi,
            link_file: report.link_file,
            created_at: now,
        };
        let (stored, laporan) = self
            .store
            .record_report(updated, read_version, laporan)
            .await?;

        info!(
            program_id = %program_id,
            laporan_id = %laporan.id,
            previous_progress = %previous_progress,
            realisasi = %laporan.realisasi,
            actor_id = %actor.user_id,
            "Progress report accepted"
        );
        if stored.awaits_verification() {
            info!(
                program_id = %program_id,
                "Program kerja reported 100%, awaiting completion verification"
            );
        }

        Ok(laporan)
    }

    /// Latest report for a program, if any.
    pub async fn latest_report(&self, program_id: Uuid) -> Result<Option<Laporan>, WorkflowError> {
        self.store.latest_for(program_id).await
    }

    /// All reports for a program, newest first.
    pub async fn reports_for(&self, program_id: Uuid) -> Result<Vec<Laporan>, WorkflowError> {
        self.store.list_for(program_id).await
    }

    /// Programs that reported full completion and wait for a
    /// supervisor's verify-completion.
    pub async fn pending_verification(&self) -> Result<Vec<ProgramKerja>, WorkflowError> {
        let running = self.store.list_by_status(ProgramStatus::OnProgress).await?;
        Ok(running
            .into_iter()
            .filter(|p| p.progress == 100)
            .collect())
    }

    /// Attach a comment to an existing report. Comments are not part
    /// of the state machine; they feed the notification collaborators.
    pub async fn add_comment(
        &self,
        laporan_id: Uuid,
        actor: &Actor,
        komentar: impl Into<String>,
    ) -> Result<Komentar, WorkflowError> {
        let komentar = komentar.into();
        if komentar.trim().is_empty() {
            return Err(WorkflowError::validation("komentar must not be empty"));
        }
        self.store
            .append_comment(Komentar {
                id: Uuid::new_v4(),
                laporan_id,
                user_id: actor.user_id,
                komentar,
                created_at: Utc::now(),
            })
            .await
    }

    pub async fn comments_for(&self, laporan_id: Uuid) -> Result<Vec<Komentar>, WorkflowError> {
        self.store.comments_for(laporan_id).await
    }
}
