// Persistence seams for the workflow core - trait-based for
// dependency injection, mirroring how the rest of the system swaps
// real and in-memory backends in tests.

pub mod memory;

#[cfg(feature = "database")]
pub mod database;

use async_trait::async_trait;
use uuid::Uuid;

use crate::program::error::WorkflowError;
use crate::program::types::{Komentar, Laporan, ProgramKerja, ProgramStatus};

pub use memory::InMemoryStore;

#[cfg(feature = "database")]
pub use database::SqliteStore;

/// Program entity store. Implementations must make `update` atomic:
/// the write succeeds only if the stored version still equals
/// `expected_version`, and a successful write bumps the version.
#[async_trait]
pub trait ProgramStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<ProgramKerja>, WorkflowError>;

    async fn insert(&self, program: ProgramKerja) -> Result<ProgramKerja, WorkflowError>;

    /// Compare-and-swap update. Returns `NotFound` if the id is
    /// unknown and `Conflict` if the stored version moved past
    /// `expected_version`; in both cases nothing is written.
    async fn update(
        &self,
        program: ProgramKerja,
        expected_version: u64,
    ) -> Result<ProgramKerja, WorkflowError>;

    async fn list_by_status(
        &self,
        status: ProgramStatus,
    ) -> Result<Vec<ProgramKerja>, WorkflowError>;

    /// Explicit deletion is the only way a program is destroyed, and
    /// is allowed from any status.
    async fn delete(&self, id: Uuid) -> Result<(), WorkflowError>;
}

/// Combined store view for the report path, where a program update
/// and a laporan append must land together.
#[async_trait]
pub trait WorkflowStore: ProgramStore + ReportStore {
    /// Atomically CAS-update the program row and append the laporan:
    /// either both writes land or neither does. Returns `NotFound` or
    /// `Conflict` under the same contract as `ProgramStore::update`.
    async fn record_report(
        &self,
        program: ProgramKerja,
        expected_version: u64,
        laporan: Laporan,
    ) -> Result<(ProgramKerja, Laporan), WorkflowError>;
}

/// Append-only report log plus its comments. Reports are never
/// mutated or deleted once written.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn append(&self, laporan: Laporan) -> Result<Laporan, WorkflowError>;

    async fn latest_for(&self, program_id: Uuid) -> Result<Option<Laporan>, WorkflowError>;

    /// All reports for a program, newest first.
    async fn list_for(&self, program_id: Uuid) -> Result<Vec<Laporan>, WorkflowError>;

    async fn append_comment(&self, komentar: Komentar) -> Result<Komentar, WorkflowError>;

    async fn comments_for(&self, laporan_id: Uuid) -> Result<Vec<Komentar>, WorkflowError>;
}
