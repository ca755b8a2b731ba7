//! Transition guard evaluator.
//!
//! A pure decision function: given the program as read, the acting
//! user, and the requested action, it either produces the field
//! updates the executor should apply or a typed refusal. It never
//! mutates anything, so identical inputs always yield identical
//! outputs and it is consulted before every executor write.

use serde::{Deserialize, Serialize};

use crate::program::error::WorkflowError;
use crate::program::types::{Actor, ApprovalOutcome, ProgramKerja, ProgramStatus, Role};

/// Actions a caller can request against a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowAction {
    /// Owner/Kabag sends a Draft into the planning queue.
    SubmitForPlanning,
    /// First approval gate, Kabag level.
    KabagApprove,
    KabagReject { alasan: String },
    /// Second approval gate, Waket level.
    WaketApprove,
    WaketReject { alasan: String },
    /// Owner starts an approved program.
    StartProgram,
    /// Supervisor confirms a fully-reported program as Done.
    VerifyCompletion,
}

impl WorkflowAction {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowAction::SubmitForPlanning => "submit-for-planning",
            WorkflowAction::KabagApprove => "kabag-approve",
            WorkflowAction::KabagReject { .. } => "kabag-reject",
            WorkflowAction::WaketApprove => "waket-approve",
            WorkflowAction::WaketReject { .. } => "waket-reject",
            WorkflowAction::StartProgram => "start-program",
            WorkflowAction::VerifyCompletion => "verify-completion",
        }
    }
}

/// Field updates a guard-approved transition carries. `None` fields
/// are left untouched by the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionDecision {
    pub next_status: ProgramStatus,
    pub first_approval: Option<ApprovalOutcome>,
    pub second_approval: Option<ApprovalOutcome>,
    pub alasan_penolakan: Option<String>,
}

impl TransitionDecision {
    fn to_status(next_status: ProgramStatus) -> Self {
        Self {
            next_status,
            first_approval: None,
            second_approval: None,
            alasan_penolakan: None,
        }
    }
}

/// Actions that are legal from a given status, by wire name. Report
/// submission is listed for On_Progress even though it flows through
/// the progress tracker rather than the executor.
pub fn allowed_actions(status: ProgramStatus) -> &'static [&'static str] {
    match status {
        ProgramStatus::Draft => &["submit-for-planning"],
        ProgramStatus::Planning => &["kabag-approve", "kabag-reject"],
        ProgramStatus::MenungguApproveWaket => &["waket-approve", "waket-reject"],
        ProgramStatus::Disetujui => &["start-program"],
        ProgramStatus::OnProgress => &["submit-report", "verify-completion"],
        ProgramStatus::Ditolak | ProgramStatus::Done => &[],
    }
}

fn invalid(program: &ProgramKerja, action: &WorkflowAction) -> WorkflowError {
    WorkflowError::InvalidTransition {
        status: program.status,
        action: action.name(),
        allowed: allowed_actions(program.status),
    }
}

fn require_reason(alasan: &str) -> Result<String, WorkflowError> {
    let trimmed = alasan.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::validation(
            "alasan_penolakan is required when rejecting a program kerja",
        ));
    }
    Ok(trimmed.to_string())
}

/// Evaluate whether `actor` may apply `action` to `program`.
///
/// Check order: the (status, action) pair is matched against the
/// transition table first (`InvalidTransition` when absent), then the
/// actor's role/ownership (`Forbidden`), then required fields
/// (`Validation`).
pub fn evaluate(
    program: &ProgramKerja,
    actor: &Actor,
    action: &WorkflowAction,
) -> Result<TransitionDecision, WorkflowError> {
    match (program.status, action) {
        (ProgramStatus::Draft, WorkflowAction::SubmitForPlanning) => {
            let permitted = actor.role == Role::Kabag
                || (actor.role == Role::StaffKabag && program.is_owned_by(actor));
            if !permitted {
                return Err(WorkflowError::forbidden(
                    "only Kabag or the owning Staff_Kabag may submit a draft for planning",
                ));
            }
            Ok(TransitionDecision::to_status(ProgramStatus::Planning))
        }

        (ProgramStatus::Planning, WorkflowAction::KabagApprove) => {
            if actor.role != Role::Kabag {
                return Err(WorkflowError::forbidden(
                    "only Kabag may act on the first approval gate",
                ));
            }
            Ok(TransitionDecision {
                first_approval: Some(ApprovalOutcome::Disetujui),
                ..TransitionDecision::to_status(ProgramStatus::MenungguApproveWaket)
            })
        }

        (ProgramStatus::Planning, WorkflowAction::KabagReject { alasan }) => {
            if actor.role != Role::Kabag {
                return Err(WorkflowError::forbidden(
                    "only Kabag may act on the first approval gate",
                ));
            }
            let alasan = require_reason(alasan)?;
            Ok(TransitionDecision {
                first_approval: Some(ApprovalOutcome::Ditolak),
                alasan_penolakan: Some(alasan),
                ..TransitionDecision::to_status(ProgramStatus::Ditolak)
            })
        }

        (ProgramStatus::MenungguApproveWaket, WorkflowAction::WaketApprove) => {
            if !actor.role.is_waket() {
                return Err(WorkflowError::forbidden(
                    "only Waket_1 or Waket_2 may act on the second approval gate",
                ));
            }
            Ok(TransitionDecision {
                second_approval: Some(ApprovalOutcome::Disetujui),
                ..TransitionDecision::to_status(ProgramStatus::Disetujui)
            })
        }

        (ProgramStatus::MenungguApproveWaket, WorkflowAction::WaketReject { alasan }) => {
            if !actor.role.is_waket() {
                return Err(WorkflowError::forbidden(
                    "only Waket_1 or Waket_2 may act on the second approval gate",
                ));
            }
            let alasan = require_reason(alasan)?;
            Ok(TransitionDecision {
                second_approval: Some(ApprovalOutcome::Ditolak),
                alasan_penolakan: Some(alasan),
                ..TransitionDecision::to_status(ProgramStatus::Ditolak)
            })
        }

        (ProgramStatus::Disetujui, WorkflowAction::StartProgram) => {
            if !program.is_owned_by(actor) {
                return Err(WorkflowError::forbidden(
                    "only the owning actor may start an approved program",
                ));
            }
            Ok(TransitionDecision::to_status(ProgramStatus::OnProgress))
        }

        (ProgramStatus::OnProgress, WorkflowAction::VerifyCompletion) => {
            // The verification gate only opens once the latest report
            // claims full completion.
            if program.progress < 100 {
                return Err(invalid(program, action));
            }
            if !actor.role.is_supervisor() {
                return Err(WorkflowError::forbidden(
                    "only a supervisor (Kabag, Waket_1, Waket_2, Ketua) may verify completion",
                ));
            }
            // Kabag supervision is scoped to their own bidang; the
            // Waket and Ketua roles oversee every bidang.
            if actor.role == Role::Kabag && actor.bidang_id != program.bidang_id {
                return Err(WorkflowError::forbidden(
                    "Kabag may only verify programs of their own bidang",
                ));
            }
            Ok(TransitionDecision::to_status(ProgramStatus::Done))
        }

        _ => Err(invalid(program, action)),
    }
}

/// Eligibility check for report submission, shared with the progress
/// tracker: the program must be running and the caller must own it.
pub fn can_submit_report(program: &ProgramKerja, actor: &Actor) -> Result<(), WorkflowError> {
    if !program.status.accepts_reports() {
        return Err(WorkflowError::InvalidTransition {
            status: program.status,
            action: "submit-report",
            allowed: allowed_actions(program.status),
        });
    }
    if !program.is_owned_by(actor) {
        return Err(WorkflowError::forbidden(
            "only the owning actor may submit progress reports",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn actor(role: Role) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role,
            bidang_id: Uuid::new_v4(),
        }
    }

    fn program_at(status: ProgramStatus, owner: &Actor) -> ProgramKerja {
        let mut program =
            ProgramKerja::new_draft("Program Uji", owner, Uuid::new_v4(), Uuid::new_v4());
        program.status = status;
        program
    }

    fn all_statuses() -> [ProgramStatus; 7] {
        [
            ProgramStatus::Draft,
            ProgramStatus::Planning,
            ProgramStatus::MenungguApproveWaket,
            ProgramStatus::Disetujui,
            ProgramStatus::Ditolak,
            ProgramStatus::OnProgress,
            ProgramStatus::Done,
        ]
    }

    fn all_actions() -> Vec<WorkflowAction> {
        vec![
            WorkflowAction::SubmitForPlanning,
            WorkflowAction::KabagApprove,
            WorkflowAction::KabagReject {
                alasan: "tidak sesuai renstra".to_string(),
            },
            WorkflowAction::WaketApprove,
            WorkflowAction::WaketReject {
                alasan: "tidak sesuai renstra".to_string(),
            },
            WorkflowAction::StartProgram,
            WorkflowAction::VerifyCompletion,
        ]
    }

    #[test]
    fn test_off_table_pairs_are_invalid_transitions() {
        let owner = actor(Role::StaffKabag);
        // The table has exactly one legal action per status except
        // the two approval gates, which have two.
        let legal: &[(ProgramStatus, &str)] = &[
            (ProgramStatus::Draft, "submit-for-planning"),
            (ProgramStatus::Planning, "kabag-approve"),
            (ProgramStatus::Planning, "kabag-reject"),
            (ProgramStatus::MenungguApproveWaket, "waket-approve"),
            (ProgramStatus::MenungguApproveWaket, "waket-reject"),
            (ProgramStatus::Disetujui, "start-program"),
            (ProgramStatus::OnProgress, "verify-completion"),
        ];

        for status in all_statuses() {
            for action in all_actions() {
                if legal.contains(&(status, action.name())) {
                    continue;
                }
                let program = program_at(status, &owner);
                // Admin is never in the table, so role checks cannot
                // mask the transition check here.
                let result = evaluate(&program, &owner, &action);
                assert!(
                    matches!(result, Err(WorkflowError::InvalidTransition { .. })),
                    "expected InvalidTransition for {status} + {}, got {result:?}",
                    action.name()
                );
            }
        }
    }

    #[test]
    fn test_owner_staff_kabag_may_submit_for_planning() {
        let owner = actor(Role::StaffKabag);
        let program = program_at(ProgramStatus::Draft, &owner);

        let decision = evaluate(&program, &owner, &WorkflowAction::SubmitForPlanning).unwrap();
        assert_eq!(decision.next_status, ProgramStatus::Planning);
        assert!(decision.first_approval.is_none());
        assert!(decision.alasan_penolakan.is_none());
    }

    #[test]
    fn test_non_owner_staff_kabag_may_not_submit() {
        let owner = actor(Role::StaffKabag);
        let other_staff = actor(Role::StaffKabag);
        let program = program_at(ProgramStatus::Draft, &owner);

        let result = evaluate(&program, &other_staff, &WorkflowAction::SubmitForPlanning);
        assert!(matches!(result, Err(WorkflowError::Forbidden { .. })));

        // Kabag may submit regardless of ownership.
        let kabag = actor(Role::Kabag);
        assert!(evaluate(&program, &kabag, &WorkflowAction::SubmitForPlanning).is_ok());
    }

    #[test]
    fn test_kabag_approve_records_first_gate() {
        let owner = actor(Role::StaffKabag);
        let kabag = actor(Role::Kabag);
        let program = program_at(ProgramStatus::Planning, &owner);

        let decision = evaluate(&program, &kabag, &WorkflowAction::KabagApprove).unwrap();
        assert_eq!(decision.next_status, ProgramStatus::MenungguApproveWaket);
        assert_eq!(decision.first_approval, Some(ApprovalOutcome::Disetujui));
        assert!(decision.alasan_penolakan.is_none());
    }

    #[test]
    fn test_rejection_without_reason_is_validation_error() {
        let owner = actor(Role::StaffKabag);
        let kabag = actor(Role::Kabag);
        let waket = actor(Role::Waket1);

        let planning = program_at(ProgramStatus::Planning, &owner);
        let result = evaluate(
            &planning,
            &kabag,
            &WorkflowAction::KabagReject {
                alasan: "   ".to_string(),
            },
        );
        assert!(matches!(result, Err(WorkflowError::Validation { .. })));

        let waiting = program_at(ProgramStatus::MenungguApproveWaket, &owner);
        let result = evaluate(
            &waiting,
            &waket,
            &WorkflowAction::WaketReject {
                alasan: String::new(),
            },
        );
        assert!(matches!(result, Err(WorkflowError::Validation { .. })));
    }

    #[test]
    fn test_waket_reject_carries_trimmed_reason() {
        let owner = actor(Role::StaffKabag);
        let waket = actor(Role::Waket2);
        let program = program_at(ProgramStatus::MenungguApproveWaket, &owner);

        let decision = evaluate(
            &program,
            &waket,
            &WorkflowAction::WaketReject {
                alasan: "  anggaran tidak mencukupi  ".to_string(),
            },
        )
        .unwrap();
        assert_eq!(decision.next_status, ProgramStatus::Ditolak);
        assert_eq!(decision.second_approval, Some(ApprovalOutcome::Ditolak));
        assert_eq!(
            decision.alasan_penolakan.as_deref(),
            Some("anggaran tidak mencukupi")
        );
    }

    #[test]
    fn test_approval_gates_reject_wrong_roles() {
        let owner = actor(Role::StaffKabag);

        let planning = program_at(ProgramStatus::Planning, &owner);
        for role in [Role::StaffKabag, Role::Waket1, Role::Ketua, Role::Admin] {
            let result = evaluate(&planning, &actor(role), &WorkflowAction::KabagApprove);
            assert!(
                matches!(result, Err(WorkflowError::Forbidden { .. })),
                "role {role} should not pass the kabag gate"
            );
        }

        let waiting = program_at(ProgramStatus::MenungguApproveWaket, &owner);
        for role in [Role::StaffKabag, Role::Kabag, Role::Ketua, Role::Admin] {
            let result = evaluate(&waiting, &actor(role), &WorkflowAction::WaketApprove);
            assert!(
                matches!(result, Err(WorkflowError::Forbidden { .. })),
                "role {role} should not pass the waket gate"
            );
        }
    }

    #[test]
    fn test_start_program_is_owner_only() {
        let owner = actor(Role::StaffKabag);
        let program = program_at(ProgramStatus::Disetujui, &owner);

        assert!(evaluate(&program, &owner, &WorkflowAction::StartProgram).is_ok());

        let kabag = actor(Role::Kabag);
        let result = evaluate(&program, &kabag, &WorkflowAction::StartProgram);
        assert!(matches!(result, Err(WorkflowError::Forbidden { .. })));
    }

    #[test]
    fn test_verify_completion_requires_full_progress() {
        let owner = actor(Role::StaffKabag);
        let ketua = actor(Role::Ketua);
        let mut program = program_at(ProgramStatus::OnProgress, &owner);

        program.progress = 99;
        let result = evaluate(&program, &ketua, &WorkflowAction::VerifyCompletion);
        assert!(matches!(
            result,
            Err(WorkflowError::InvalidTransition { .. })
        ));

        program.progress = 100;
        let decision = evaluate(&program, &ketua, &WorkflowAction::VerifyCompletion).unwrap();
        assert_eq!(decision.next_status, ProgramStatus::Done);
    }

    #[test]
    fn test_verify_completion_role_scoping() {
        let owner = actor(Role::StaffKabag);
        let mut program = program_at(ProgramStatus::OnProgress, &owner);
        program.progress = 100;

        // Owner is not a supervisor.
        let result = evaluate(&program, &owner, &WorkflowAction::VerifyCompletion);
        assert!(matches!(result, Err(WorkflowError::Forbidden { .. })));

        // Kabag of another bidang is refused; same-bidang Kabag passes.
        let foreign_kabag = actor(Role::Kabag);
        let result = evaluate(&program, &foreign_kabag, &WorkflowAction::VerifyCompletion);
        assert!(matches!(result, Err(WorkflowError::Forbidden { .. })));

        let mut own_kabag = actor(Role::Kabag);
        own_kabag.bidang_id = program.bidang_id;
        assert!(evaluate(&program, &own_kabag, &WorkflowAction::VerifyCompletion).is_ok());

        // Waket roles oversee every bidang.
        assert!(evaluate(&program, &actor(Role::Waket1), &WorkflowAction::VerifyCompletion).is_ok());
        assert!(evaluate(&program, &actor(Role::Waket2), &WorkflowAction::VerifyCompletion).is_ok());
    }

    #[test]
    fn test_terminal_states_have_no_outgoing_transitions() {
        let owner = actor(Role::StaffKabag);
        for status in [ProgramStatus::Ditolak, ProgramStatus::Done] {
            let program = program_at(status, &owner);
            assert!(allowed_actions(status).is_empty());
            for action in all_actions() {
                let result = evaluate(&program, &actor(Role::Kabag), &action);
                assert!(matches!(
                    result,
                    Err(WorkflowError::InvalidTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_evaluate_is_pure_and_idempotent() {
        let owner = actor(Role::StaffKabag);
        let kabag = actor(Role::Kabag);
        let program = program_at(ProgramStatus::Planning, &owner);
        let before = program.clone();

        let first = evaluate(&program, &kabag, &WorkflowAction::KabagApprove).unwrap();
        let second = evaluate(&program, &kabag, &WorkflowAction::KabagApprove).unwrap();
        assert_eq!(first, second);
        assert_eq!(program, before);
    }

    #[test]
    fn test_can_submit_report_checks() {
        let owner = actor(Role::StaffKabag);
        let running = program_at(ProgramStatus::OnProgress, &owner);
        assert!(can_submit_report(&running, &owner).is_ok());

        let outsider = actor(Role::StaffKabag);
        assert!(matches!(
            can_submit_report(&running, &outsider),
            Err(WorkflowError::Forbidden { .. })
        ));

        let draft = program_at(ProgramStatus::Draft, &owner);
        assert!(matches!(
            can_submit_report(&draft, &owner),
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }
}
