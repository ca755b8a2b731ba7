//! Transition executor.
//!
//! The only code path that mutates a program's status and approval
//! fields. Every call is load -> guard -> apply -> compare-and-swap
//! write: either the whole transition lands in one store update or
//! nothing changes and the caller gets a typed error.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::program::error::WorkflowError;
use crate::program::events::{TransitionEvent, TransitionListener};
use crate::program::guard::{self, WorkflowAction};
use crate::program::types::{Actor, ProgramKerja};
use crate::store::ProgramStore;
use crate::telemetry::{create_workflow_span, generate_correlation_id};

pub struct TransitionExecutor {
    store: Arc<dyn ProgramStore>,
    listeners: Vec<Arc<dyn TransitionListener>>,
}

impl TransitionExecutor {
    pub fn new(store: Arc<dyn ProgramStore>) -> Self {
        Self {
            store,
            listeners: Vec::new(),
        }
    }

    /// Register a listener for transition events. Listeners are
    /// notified after the write succeeds, in registration order.
    pub fn with_listener(mut self, listener: Arc<dyn TransitionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Apply `action` to the program as `actor`.
    ///
    /// The version read alongside the program gates the write: if a
    /// concurrent transition landed in between, the store rejects the
    /// update with `Conflict` and this call changes nothing. Callers
    /// re-fetch and retry; the executor never retries on its own.
    pub async fn execute(
        &self,
        program_id: Uuid,
        actor: &Actor,
        action: WorkflowAction,
    ) -> Result<ProgramKerja, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let program_id_str = program_id.to_string();
        let actor_id_str = actor.user_id.to_string();
        let span = create_workflow_span(
            action.name(),
            Some(&program_id_str),
            Some(&actor_id_str),
            Some(&correlation_id),
        );

        self.apply(program_id, actor, action).instrument(span).await
    }

    async fn apply(
        &self,
        program_id: Uuid,
        actor: &Actor,
        action: WorkflowAction,
    ) -> Result<ProgramKerja, WorkflowError> {
        let program = self
            .store
            .get(program_id)
            .await?
            .ok_or(WorkflowError::NotFound { id: program_id })?;

        let decision = guard::evaluate(&program, actor, &action).map_err(|e| {
            warn!(
                program_id = %program_id,
                status = %program.status,
                action = action.name(),
                actor_id = %actor.user_id,
                role = %actor.role,
                error = %e,
                "Transition refused"
            );
            e
        })?;

        let from_status = program.status;
        let read_version = program.version;

        let mut updated = program;
        updated.status = decision.next_status;
        if decision.first_approval.is_some() {
            updated.first_approval_status = decision.first_approval;
        }
        if decision.second_approval.is_some() {
            updated.second_approval_status = decision.second_approval;
        }
        if let Some(alasan) = decision.alasan_penolakan {
            updated.alasan_penolakan = Some(alasan);
        }
        updated.updated_at = Utc::now();

        let stored = self.store.update(updated, read_version).await?;

        info!(
            program_id = %stored.id,
            from_status = %from_status,
            to_status = %stored.status,
            action = action.name(),
            actor_id = %actor.user_id,
            role = %actor.role,
            "Program kerja transition applied"
        );

        let event = TransitionEvent {
            program_id: stored.id,
            from_status,
            to_status: stored.status,
            actor_id: actor.user_id,
            timestamp: stored.updated_at,
        };
        for listener in &self.listeners {
            listener.on_transition(&event).await;
        }

        Ok(stored)
    }
}
