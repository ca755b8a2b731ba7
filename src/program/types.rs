// Core domain types for the work-program lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a ProgramKerja.
///
/// Serialized names match the wire names used by the surrounding
/// e-renstra system (`Menunggu_Approve_Waket`, `On_Progress`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramStatus {
    Draft,
    Planning,
    #[serde(rename = "Menunggu_Approve_Waket")]
    MenungguApproveWaket,
    Disetujui,
    Ditolak,
    #[serde(rename = "On_Progress")]
    OnProgress,
    Done,
}

impl ProgramStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramStatus::Draft => "Draft",
            ProgramStatus::Planning => "Planning",
            ProgramStatus::MenungguApproveWaket => "Menunggu_Approve_Waket",
            ProgramStatus::Disetujui => "Disetujui",
            ProgramStatus::Ditolak => "Ditolak",
            ProgramStatus::OnProgress => "On_Progress",
            ProgramStatus::Done => "Done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Draft" => Some(ProgramStatus::Draft),
            "Planning" => Some(ProgramStatus::Planning),
            "Menunggu_Approve_Waket" => Some(ProgramStatus::MenungguApproveWaket),
            "Disetujui" => Some(ProgramStatus::Disetujui),
            "Ditolak" => Some(ProgramStatus::Ditolak),
            "On_Progress" => Some(ProgramStatus::OnProgress),
            "Done" => Some(ProgramStatus::Done),
            _ => None,
        }
    }

    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgramStatus::Ditolak | ProgramStatus::Done)
    }

    /// Progress reports are only accepted while the program is running.
    pub fn accepts_reports(&self) -> bool {
        matches!(self, ProgramStatus::OnProgress)
    }
}

impl std::fmt::Display for ProgramStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organizational roles recognized by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Staff_Kabag")]
    StaffKabag,
    Kabag,
    #[serde(rename = "Waket_1")]
    Waket1,
    #[serde(rename = "Waket_2")]
    Waket2,
    Ketua,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::StaffKabag => "Staff_Kabag",
            Role::Kabag => "Kabag",
            Role::Waket1 => "Waket_1",
            Role::Waket2 => "Waket_2",
            Role::Ketua => "Ketua",
            Role::Admin => "Admin",
        }
    }

    /// Roles that may verify completion of a finished program.
    /// Admin administers accounts and holds no workflow capability.
    pub fn is_supervisor(&self) -> bool {
        matches!(self, Role::Kabag | Role::Waket1 | Role::Waket2 | Role::Ketua)
    }

    pub fn is_waket(&self) -> bool {
        matches!(self, Role::Waket1 | Role::Waket2)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated caller identity, supplied by the (external) auth layer.
/// The workflow trusts these fields as already authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
    pub bidang_id: Uuid,
}

/// Outcome recorded at an approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalOutcome {
    Disetujui,
    Ditolak,
}

impl ApprovalOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalOutcome::Disetujui => "Disetujui",
            ApprovalOutcome::Ditolak => "Ditolak",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Disetujui" => Some(ApprovalOutcome::Disetujui),
            "Ditolak" => Some(ApprovalOutcome::Ditolak),
            _ => None,
        }
    }
}

/// A work program under lifecycle control.
///
/// `version` is the optimistic-concurrency counter: every successful
/// store update bumps it, and writers must present the version they
/// read or the write is rejected with a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramKerja {
    pub id: Uuid,
    pub nama_program: String,
    pub status: ProgramStatus,
    /// 0-100, mirrors the `realisasi` of the latest accepted report.
    pub progress: u8,
    pub first_approval_status: Option<ApprovalOutcome>,
    pub second_approval_status: Option<ApprovalOutcome>,
    pub alasan_penolakan: Option<String>,
    /// Owning actor (creator/assignee); the only user allowed to
    /// submit progress reports.
    pub user_id: Uuid,
    pub bidang_id: Uuid,
    /// Opaque planning-context references.
    pub point_renstra_id: Uuid,
    pub periode_proker_id: Uuid,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgramKerja {
    /// Create a fresh Draft owned by `owner`.
    pub fn new_draft(
        nama_program: impl Into<String>,
        owner: &Actor,
        point_renstra_id: Uuid,
        periode_proker_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            nama_program: nama_program.into(),
            status: ProgramStatus::Draft,
            progress: 0,
            first_approval_status: None,
            second_approval_status: None,
            alasan_penolakan: None,
            user_id: owner.user_id,
            bidang_id: owner.bidang_id,
            point_renstra_id,
            periode_proker_id,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, actor: &Actor) -> bool {
        self.user_id == actor.user_id
    }

    /// Programs surface in the verification queue once they report
    /// full completion but remain On_Progress until a supervisor
    /// verifies them.
    pub fn awaits_verification(&self) -> bool {
        self.status == ProgramStatus::OnProgress && self.progress == 100
    }
}

/// Append-only progress report. Reports are never mutated or deleted;
/// each accepted report's `realisasi` becomes the program's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Laporan {
    pub id: Uuid,
    pub program_kerja_id: Uuid,
    pub user_id: Uuid,
    pub laporan: String,
    /// Reported completion percentage at submission time (0-100).
    pub realisasi: u8,
    pub link_file: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for submitting a new progress report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLaporan {
    pub laporan: String,
    pub realisasi: u8,
    pub link_file: Option<String>,
}

/// Reply on a report. Not part of the state machine; carried for the
/// comment/notification collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Komentar {
    pub id: Uuid,
    pub laporan_id: Uuid,
    pub user_id: Uuid,
    pub komentar: String,
    pub created_at: DateTime<Utc>,
}
