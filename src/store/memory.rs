// In-memory store backed by tokio RwLocks. The default backend for
// tests and embedding; the version check under the write lock gives
// the same per-program serialization the SQLite backend gets from its
// versioned UPDATE.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::program::error::WorkflowError;
use crate::program::types::{Komentar, Laporan, ProgramKerja, ProgramStatus};
use crate::store::{ProgramStore, ReportStore, WorkflowStore};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    programs: RwLock<HashMap<Uuid, ProgramKerja>>,
    // Insertion order doubles as creation order for the append-only log.
    reports: RwLock<Vec<Laporan>>,
    comments: RwLock<Vec<Komentar>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgramStore for InMemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<ProgramKerja>, WorkflowError> {
        Ok(self.programs.read().await.get(&id).cloned())
    }

    async fn insert(&self, program: ProgramKerja) -> Result<ProgramKerja, WorkflowError> {
        let mut programs = self.programs.write().await;
        if programs.contains_key(&program.id) {
            return Err(WorkflowError::validation(format!(
                "program kerja {} already exists",
                program.id
            )));
        }
        programs.insert(program.id, program.clone());
        Ok(program)
    }

    async fn update(
        &self,
        mut program: ProgramKerja,
        expected_version: u64,
    ) -> Result<ProgramKerja, WorkflowError> {
        let mut programs = self.programs.write().await;
        let current = programs
            .get(&program.id)
            .ok_or(WorkflowError::NotFound { id: program.id })?;
        if current.version != expected_version {
            return Err(WorkflowError::Conflict { id: program.id });
        }
        program.version = expected_version + 1;
        programs.insert(program.id, program.clone());
        Ok(program)
    }

    async fn list_by_status(
        &self,
        status: ProgramStatus,
    ) -> Result<Vec<ProgramKerja>, WorkflowError> {
        let programs = self.programs.read().await;
        let mut matching: Vec<ProgramKerja> = programs
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|p| p.created_at);
        Ok(matching)
    }

    async fn delete(&self, id: Uuid) -> Result<(), WorkflowError> {
        let mut programs = self.programs.write().await;
        programs
            .remove(&id)
            .map(|_| ())
            .ok_or(WorkflowError::NotFound { id })
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn append(&self, laporan: Laporan) -> Result<Laporan, WorkflowError> {
        self.reports.write().await.push(laporan.clone());
        Ok(laporan)
    }

    async fn latest_for(&self, program_id: Uuid) -> Result<Option<Laporan>, WorkflowError> {
        let reports = self.reports.read().await;
        Ok(reports
            .iter()
            .rev()
            .find(|l| l.program_kerja_id == program_id)
            .cloned())
    }

    async fn list_for(&self, program_id: Uuid) -> Result<Vec<Laporan>, WorkflowError> {
        let reports = self.reports.read().await;
        Ok(reports
            .iter()
            .rev()
            .filter(|l| l.program_kerja_id == program_id)
            .cloned()
            .collect())
    }

    async fn append_comment(&self, komentar: Komentar) -> Result<Komentar, WorkflowError> {
        self.comments.write().await.push(komentar.clone());
        Ok(komentar)
    }

    async fn comments_for(&self, laporan_id: Uuid) -> Result<Vec<Komentar>, WorkflowError> {
        let comments = self.comments.read().await;
        Ok(comments
            .iter()
            .filter(|k| k.laporan_id == laporan_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn record_report(
        &self,
        mut program: ProgramKerja,
        expected_version: u64,
        laporan: Laporan,
    ) -> Result<(ProgramKerja, Laporan), WorkflowError> {
        // Both write locks are held across the whole section, so the
        // program update and the report append land together or not
        // at all. Lock order is programs then reports everywhere.
        let mut programs = self.programs.write().await;
        let mut reports = self.reports.write().await;

        let current = programs
            .get(&program.id)
            .ok_or(WorkflowError::NotFound { id: program.id })?;
        if current.version != expected_version {
            return Err(WorkflowError::Conflict { id: program.id });
        }

        program.version = expected_version + 1;
        programs.insert(program.id, program.clone());
        reports.push(laporan.clone());
        Ok((program, laporan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::types::{Actor, Role};
    use chrono::Utc;

    fn owner() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role: Role::StaffKabag,
            bidang_id: Uuid::new_v4(),
        }
    }

    fn draft(owner: &Actor) -> ProgramKerja {
        ProgramKerja::new_draft("Program Uji", owner, Uuid::new_v4(), Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryStore::new();
        let program = draft(&owner());

        store.insert(program.clone()).await.unwrap();
        let fetched = store.get(program.id).await.unwrap().unwrap();
        assert_eq!(fetched, program);

        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = InMemoryStore::new();
        let program = draft(&owner());

        store.insert(program.clone()).await.unwrap();
        let result = store.insert(program).await;
        assert!(matches!(result, Err(WorkflowError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = InMemoryStore::new();
        let program = draft(&owner());
        store.insert(program.clone()).await.unwrap();

        let mut changed = program.clone();
        changed.status = ProgramStatus::Planning;
        let stored = store.update(changed, program.version).await.unwrap();
        assert_eq!(stored.version, program.version + 1);
        assert_eq!(stored.status, ProgramStatus::Planning);
    }

    #[tokio::test]
    async fn test_stale_version_update_conflicts() {
        let store = InMemoryStore::new();
        let program = draft(&owner());
        store.insert(program.clone()).await.unwrap();

        // First writer wins.
        let mut first = program.clone();
        first.status = ProgramStatus::Planning;
        store.update(first, program.version).await.unwrap();

        // Second writer still holds the version it read before the
        // first write landed.
        let mut second = program.clone();
        second.status = ProgramStatus::Ditolak;
        let result = store.update(second, program.version).await;
        assert!(matches!(result, Err(WorkflowError::Conflict { .. })));

        // The losing write changed nothing.
        let current = store.get(program.id).await.unwrap().unwrap();
        assert_eq!(current.status, ProgramStatus::Planning);
        assert_eq!(current.version, program.version + 1);
    }

    #[tokio::test]
    async fn test_update_unknown_program_is_not_found() {
        let store = InMemoryStore::new();
        let program = draft(&owner());
        let result = store.update(program, 0).await;
        assert!(matches!(result, Err(WorkflowError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_reports_listed_newest_first() {
        let store = InMemoryStore::new();
        let program_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        for (i, realisasi) in [30u8, 70, 100].iter().enumerate() {
            store
                .append(Laporan {
                    id: Uuid::new_v4(),
                    program_kerja_id: program_id,
                    user_id,
                    laporan: format!("laporan ke-{}", i + 1),
                    realisasi: *realisasi,
                    link_file: None,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let reports = store.list_for(program_id).await.unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].realisasi, 100);
        assert_eq!(reports[2].realisasi, 30);

        let latest = store.latest_for(program_id).await.unwrap().unwrap();
        assert_eq!(latest.realisasi, 100);
    }

    fn laporan_for(program: &ProgramKerja, realisasi: u8) -> Laporan {
        Laporan {
            id: Uuid::new_v4(),
            program_kerja_id: program.id,
            user_id: program.user_id,
            laporan: "laporan berkala".to_string(),
            realisasi,
            link_file: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_report_updates_program_and_appends() {
        let store = InMemoryStore::new();
        let program = draft(&owner());
        store.insert(program.clone()).await.unwrap();

        let mut updated = program.clone();
        updated.progress = 40;
        let (stored, _) = store
            .record_report(updated, program.version, laporan_for(&program, 40))
            .await
            .unwrap();
        assert_eq!(stored.version, program.version + 1);
        assert_eq!(stored.progress, 40);
        assert_eq!(store.list_for(program.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_report_with_stale_version_writes_nothing() {
        let store = InMemoryStore::new();
        let program = draft(&owner());
        store.insert(program.clone()).await.unwrap();

        let mut first = program.clone();
        first.progress = 40;
        store
            .record_report(first, program.version, laporan_for(&program, 40))
            .await
            .unwrap();

        // A writer holding the pre-update version loses the race and
        // leaves neither a progress change nor a report behind.
        let mut second = program.clone();
        second.progress = 10;
        let result = store
            .record_report(second, program.version, laporan_for(&program, 10))
            .await;
        assert!(matches!(result, Err(WorkflowError::Conflict { .. })));

        let current = store.get(program.id).await.unwrap().unwrap();
        assert_eq!(current.progress, 40);
        assert_eq!(store.list_for(program.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();
        let program = draft(&owner());
        store.insert(program.clone()).await.unwrap();

        store.delete(program.id).await.unwrap();
        assert!(store.get(program.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete(program.id).await,
            Err(WorkflowError::NotFound { .. })
        ));
    }
}
