// SQLite-backed store, enabled with the `database` feature. The
// version column in the UPDATE predicate provides the per-program
// write serialization: a racing transition finds zero affected rows
// and surfaces as a conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{migrate::MigrateDatabase, sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::program::error::WorkflowError;
use crate::program::types::{
    ApprovalOutcome, Komentar, Laporan, ProgramKerja, ProgramStatus,
};
use crate::store::{ProgramStore, ReportStore, WorkflowStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to (and optionally migrate) the database, creating the
    /// file if it does not exist yet.
    pub async fn new(database_url: &str, auto_migrate: bool) -> Result<Self, WorkflowError> {
        if !sqlx::Sqlite::database_exists(database_url)
            .await
            .map_err(storage_err)?
        {
            info!("Creating database at {}", database_url);
            sqlx::Sqlite::create_database(database_url)
                .await
                .map_err(storage_err)?;
        }

        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(storage_err)?;

        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(storage_err)?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn shutdown(&self) {
        info!("Closing database connections...");
        self.pool.close().await;
    }
}

fn storage_err(e: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::storage(e.to_string())
}

fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, WorkflowError> {
    let raw: String = row.try_get(column).map_err(storage_err)?;
    Uuid::parse_str(&raw)
        .map_err(|e| WorkflowError::storage(format!("invalid uuid in column {column}: {e}")))
}

fn get_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, WorkflowError> {
    let raw: String = row.try_get(column).map_err(storage_err)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| WorkflowError::storage(format!("invalid timestamp in column {column}: {e}")))
}

fn get_outcome(row: &SqliteRow, column: &str) -> Result<Option<ApprovalOutcome>, WorkflowError> {
    let raw: Option<String> = row.try_get(column).map_err(storage_err)?;
    match raw {
        None => Ok(None),
        Some(s) => ApprovalOutcome::parse(&s)
            .map(Some)
            .ok_or_else(|| WorkflowError::storage(format!("unknown outcome '{s}' in {column}"))),
    }
}

fn program_from_row(row: &SqliteRow) -> Result<ProgramKerja, WorkflowError> {
    let status_raw: String = row.try_get("status").map_err(storage_err)?;
    let status = ProgramStatus::parse(&status_raw)
        .ok_or_else(|| WorkflowError::storage(format!("unknown status '{status_raw}'")))?;
    let progress: i64 = row.try_get("progress").map_err(storage_err)?;
    let version: i64 = row.try_get("version").map_err(storage_err)?;

    Ok(ProgramKerja {
        id: get_uuid(row, "id")?,
        nama_program: row.try_get("nama_program").map_err(storage_err)?,
        status,
        progress: progress as u8,
        first_approval_status: get_outcome(row, "first_approval_status")?,
        second_approval_status: get_outcome(row, "second_approval_status")?,
        alasan_penolakan: row.try_get("alasan_penolakan").map_err(storage_err)?,
        user_id: get_uuid(row, "user_id")?,
        bidang_id: get_uuid(row, "bidang_id")?,
        point_renstra_id: get_uuid(row, "point_renstra_id")?,
        periode_proker_id: get_uuid(row, "periode_proker_id")?,
        version: version as u64,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn laporan_from_row(row: &SqliteRow) -> Result<Laporan, WorkflowError> {
    let realisasi: i64 = row.try_get("realisasi").map_err(storage_err)?;
    Ok(Laporan {
        id: get_uuid(row, "id")?,
        program_kerja_id: get_uuid(row, "program_kerja_id")?,
        user_id: get_uuid(row, "user_id")?,
        laporan: row.try_get("laporan").map_err(storage_err)?,
        realisasi: realisasi as u8,
        link_file: row.try_get("link_file").map_err(storage_err)?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

fn komentar_from_row(row: &SqliteRow) -> Result<Komentar, WorkflowError> {
    Ok(Komentar {
        id: get_uuid(row, "id")?,
        laporan_id: get_uuid(row, "laporan_id")?,
        user_id: get_uuid(row, "user_id")?,
        komentar: row.try_get("komentar").map_err(storage_err)?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

#[async_trait]
impl ProgramStore for SqliteStore {
    async fn get(&self, id: Uuid) -> Result<Option<ProgramKerja>, WorkflowError> {
        let row = sqlx::query("SELECT * FROM program_kerja WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        row.as_ref().map(program_from_row).transpose()
    }

    async fn insert(&self, program: ProgramKerja) -> Result<ProgramKerja, WorkflowError> {
        sqlx::query(
            r#"
            INSERT INTO program_kerja (
                id, nama_program, status, progress,
                first_approval_status, second_approval_status, alasan_penolakan,
                user_id, bidang_id, point_renstra_id, periode_proker_id,
                version, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(program.id.to_string())
        .bind(&program.nama_program)
        .bind(program.status.as_str())
        .bind(program.progress as i64)
        .bind(program.first_approval_status.map(|o| o.as_str()))
        .bind(program.second_approval_status.map(|o| o.as_str()))
        .bind(&program.alasan_penolakan)
        .bind(program.user_id.to_string())
        .bind(program.bidang_id.to_string())
        .bind(program.point_renstra_id.to_string())
        .bind(program.periode_proker_id.to_string())
        .bind(program.version as i64)
        .bind(program.created_at.to_rfc3339())
        .bind(program.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(program)
    }

    async fn update(
        &self,
        mut program: ProgramKerja,
        expected_version: u64,
    ) -> Result<ProgramKerja, WorkflowError> {
        program.version = expected_version + 1;

        let result = sqlx::query(
            r#"
            UPDATE program_kerja
            SET nama_program = ?1, status = ?2, progress = ?3,
                first_approval_status = ?4, second_approval_status = ?5,
                alasan_penolakan = ?6, version = ?7, updated_at = ?8
            WHERE id = ?9 AND version = ?10
            "#,
        )
        .bind(&program.nama_program)
        .bind(program.status.as_str())
        .bind(program.progress as i64)
        .bind(program.first_approval_status.map(|o| o.as_str()))
        .bind(program.second_approval_status.map(|o| o.as_str()))
        .bind(&program.alasan_penolakan)
        .bind(program.version as i64)
        .bind(program.updated_at.to_rfc3339())
        .bind(program.id.to_string())
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            // Distinguish a vanished row from a lost race.
            return match self.get(program.id).await? {
                Some(_) => Err(WorkflowError::Conflict { id: program.id }),
                None => Err(WorkflowError::NotFound { id: program.id }),
            };
        }

        Ok(program)
    }

    async fn list_by_status(
        &self,
        status: ProgramStatus,
    ) -> Result<Vec<ProgramKerja>, WorkflowError> {
        let rows = sqlx::query(
            "SELECT * FROM program_kerja WHERE status = ?1 ORDER BY created_at ASC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(program_from_row).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<(), WorkflowError> {
        let result = sqlx::query("DELETE FROM program_kerja WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(WorkflowError::NotFound { id });
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for SqliteStore {
    async fn record_report(
        &self,
        mut program: ProgramKerja,
        expected_version: u64,
        laporan: Laporan,
    ) -> Result<(ProgramKerja, Laporan), WorkflowError> {
        program.version = expected_version + 1;

        // One transaction for both writes; a failed laporan insert
        // rolls the progress update back with it.
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let result = sqlx::query(
            r#"
            UPDATE program_kerja
            SET progress = ?1, version = ?2, updated_at = ?3
            WHERE id = ?4 AND version = ?5
            "#,
        )
        .bind(program.progress as i64)
        .bind(program.version as i64)
        .bind(program.updated_at.to_rfc3339())
        .bind(program.id.to_string())
        .bind(expected_version as i64)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(storage_err)?;
            return match self.get(program.id).await? {
                Some(_) => Err(WorkflowError::Conflict { id: program.id }),
                None => Err(WorkflowError::NotFound { id: program.id }),
            };
        }

        sqlx::query(
            r#"
            INSERT INTO laporan (
                id, program_kerja_id, user_id, laporan, realisasi, link_file, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(laporan.id.to_string())
        .bind(laporan.program_kerja_id.to_string())
        .bind(laporan.user_id.to_string())
        .bind(&laporan.laporan)
        .bind(laporan.realisasi as i64)
        .bind(&laporan.link_file)
        .bind(laporan.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;
        Ok((program, laporan))
    }
}

#[async_trait]
impl ReportStore for SqliteStore {
    async fn append(&self, laporan: Laporan) -> Result<Laporan, WorkflowError> {
        sqlx::query(
            r#"
            INSERT INTO laporan (
                id, program_kerja_id, user_id, laporan, realisasi, link_file, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(laporan.id.to_string())
        .bind(laporan.program_kerja_id.to_string())
        .bind(laporan.user_id.to_string())
        .bind(&laporan.laporan)
        .bind(laporan.realisasi as i64)
        .bind(&laporan.link_file)
        .bind(laporan.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(laporan)
    }

    async fn latest_for(&self, program_id: Uuid) -> Result<Option<Laporan>, WorkflowError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM laporan
            WHERE program_kerja_id = ?1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(program_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.as_ref().map(laporan_from_row).transpose()
    }

    async fn list_for(&self, program_id: Uuid) -> Result<Vec<Laporan>, WorkflowError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM laporan
            WHERE program_kerja_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(program_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(laporan_from_row).collect()
    }

    async fn append_comment(&self, komentar: Komentar) -> Result<Komentar, WorkflowError> {
        sqlx::query(
            r#"
            INSERT INTO komentar (id, laporan_id, user_id, komentar, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(komentar.id.to_string())
        .bind(komentar.laporan_id.to_string())
        .bind(komentar.user_id.to_string())
        .bind(&komentar.komentar)
        .bind(komentar.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(komentar)
    }

    async fn comments_for(&self, laporan_id: Uuid) -> Result<Vec<Komentar>, WorkflowError> {
        let rows = sqlx::query(
            "SELECT * FROM komentar WHERE laporan_id = ?1 ORDER BY created_at ASC",
        )
        .bind(laporan_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(komentar_from_row).collect()
    }
}
