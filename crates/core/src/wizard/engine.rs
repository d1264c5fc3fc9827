//! The advance controller: one request in, one [`WizardOutcome`] out.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::forms::FormKind;
use crate::types::{FieldErrors, FormData, ServiceId, SessionId};

use super::definition::{ResolvedStep, WizardDefinition};
use super::finalize::{FinalizeResult, Finalizer};
use super::session::{SessionStore, WizardSession};

// ---------------------------------------------------------------------------
// Request / outcome types
// ---------------------------------------------------------------------------

/// Step and branch named by the request's query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StepRequest {
    pub current_step: Option<String>,
    pub branch: Option<String>,
}

impl StepRequest {
    pub fn new(current_step: Option<&str>, branch: Option<&str>) -> Self {
        Self {
            current_step: current_step.map(str::to_string),
            branch: branch.map(str::to_string),
        }
    }
}

/// Everything a renderer needs to draw one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step: &'static str,
    /// 1-based position of the step.
    pub step_num: usize,
    pub step_max: usize,
    pub header: &'static str,
    pub template: &'static str,
    /// Previous step id, for the "back" link.
    pub back_step: Option<&'static str>,
    pub branch: Option<&'static str>,
    pub form: FormData,
    pub errors: FieldErrors,
}

/// Where the client should go next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WizardLocation {
    pub step: &'static str,
    pub branch: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardOutcome {
    /// Show a step, possibly with field errors.
    Render(StepView),
    /// Redirect to another step of the wizard.
    Redirect(WizardLocation),
    /// The run finished and created this entity.
    Completed(ServiceId),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Drives a [`WizardDefinition`] against a session store and a finalizer.
///
/// Stateless between requests; all run state lives in the session store
/// under `session_key`.
#[derive(Debug, Clone)]
pub struct WizardEngine {
    definition: WizardDefinition,
    session_key: &'static str,
}

impl WizardEngine {
    pub fn new(definition: WizardDefinition, session_key: &'static str) -> Self {
        Self {
            definition,
            session_key,
        }
    }

    pub fn definition(&self) -> &WizardDefinition {
        &self.definition
    }

    pub fn session_key(&self) -> &'static str {
        self.session_key
    }

    /// GET: show the requested step bound to the accumulated session data.
    pub async fn render(
        &self,
        store: &dyn SessionStore,
        session_id: SessionId,
        request: &StepRequest,
    ) -> Result<WizardOutcome, CoreError> {
        let session = self.load_session(store, session_id).await?;
        let resolved = self.with_session_branch(self.resolve(request), session.data());
        Ok(self.render_from_session(resolved, &session))
    }

    /// POST: validate the submitted step, then advance, finalize, or re-render.
    pub async fn submit(
        &self,
        store: &dyn SessionStore,
        finalizer: &dyn Finalizer,
        session_id: SessionId,
        request: &StepRequest,
        submitted: FormData,
    ) -> Result<WizardOutcome, CoreError> {
        let mut session = self.load_session(store, session_id).await?;
        let resolved = self.with_session_branch(self.resolve(request), session.data());
        let spec = self.definition.step(resolved.index);

        let missing_marker = spec
            .submit_marker
            .is_some_and(|marker| !submitted.contains_key(marker));

        if resolved.corrected || submitted.is_empty() || missing_marker {
            tracing::debug!(
                step = spec.id,
                corrected = resolved.corrected,
                "Treating submission as a fresh render"
            );
            return Ok(self.render_from_session(resolved, &session));
        }

        let (form, _) = spec.form_for(resolved.branch);
        let bound = form.bind(&submitted);

        if let Err(errors) = form.validate(&bound) {
            tracing::debug!(step = spec.id, fields = errors.len(), "Step failed validation");
            return Ok(WizardOutcome::Render(self.view(resolved, bound, errors)));
        }

        if resolved.index < self.definition.last_index() {
            let branch = if self.definition.selects_branch(resolved.index) {
                self.selected_branch(&bound)
            } else {
                resolved.branch
            };

            session.merge(bound);
            store
                .set(session_id, self.session_key, session.data())
                .await?;

            let next = self.definition.step(resolved.index + 1);
            tracing::info!(from_step = spec.id, to_step = next.id, "Wizard step completed");

            return Ok(WizardOutcome::Redirect(WizardLocation {
                step: next.id,
                branch,
            }));
        }

        self.finalize(store, finalizer, session_id, resolved, session, bound)
            .await
    }

    /// Re-validate every step against `data`, in order.
    ///
    /// Branched steps use the branch recorded in `data`; `branch` applies
    /// only when `data` holds no known selector value. Returns the index of
    /// the first step that fails, or `None` when all steps pass. Pure:
    /// repeated calls give the same answer.
    pub fn revalidate(&self, data: &FormData, branch: Option<&str>) -> Option<usize> {
        let branch = self.selected_branch(data).or(branch);
        self.definition.steps().iter().position(|spec| {
            let (form, _) = spec.form_for(branch);
            form.validate(&form.bind(data)).is_err()
        })
    }

    // ---- private helpers ----

    fn resolve(&self, request: &StepRequest) -> ResolvedStep {
        self.definition
            .resolve(request.current_step.as_deref(), request.branch.as_deref())
    }

    /// Use the branch captured on the selector step when the accumulated
    /// data has one; the query value only fills the gap.
    fn with_session_branch(&self, resolved: ResolvedStep, data: &FormData) -> ResolvedStep {
        ResolvedStep {
            branch: self.selected_branch(data).or(resolved.branch),
            ..resolved
        }
    }

    /// Load the session, creating an empty one when none exists yet.
    async fn load_session(
        &self,
        store: &dyn SessionStore,
        session_id: SessionId,
    ) -> Result<WizardSession, CoreError> {
        match store.get(session_id, self.session_key).await? {
            Some(data) => Ok(WizardSession::from_data(data)),
            None => {
                let session = WizardSession::new();
                store
                    .set(session_id, self.session_key, session.data())
                    .await?;
                Ok(session)
            }
        }
    }

    fn render_from_session(&self, resolved: ResolvedStep, session: &WizardSession) -> WizardOutcome {
        let (form, _) = self.form(resolved);
        let view = self.view(resolved, form.bind(session.data()), FieldErrors::new());
        WizardOutcome::Render(view)
    }

    fn form(&self, resolved: ResolvedStep) -> (FormKind, &'static str) {
        self.definition.step(resolved.index).form_for(resolved.branch)
    }

    fn view(&self, resolved: ResolvedStep, form: FormData, errors: FieldErrors) -> StepView {
        let spec = self.definition.step(resolved.index);
        let (_, template) = self.form(resolved);
        let back_step = resolved
            .index
            .checked_sub(1)
            .map(|prev| self.definition.step(prev).id);

        StepView {
            step: spec.id,
            step_num: resolved.index + 1,
            step_max: self.definition.len(),
            header: spec.header,
            template,
            back_step,
            branch: resolved.branch,
            form,
            errors,
        }
    }

    /// Branch value recorded for the selector field, if it names a known variant.
    fn selected_branch(&self, bound: &FormData) -> Option<&'static str> {
        let param = self.definition.branch_param()?;
        bound
            .get(param)
            .and_then(|value| self.definition.known_branch(value))
    }

    async fn finalize(
        &self,
        store: &dyn SessionStore,
        finalizer: &dyn Finalizer,
        session_id: SessionId,
        resolved: ResolvedStep,
        mut session: WizardSession,
        submitted: FormData,
    ) -> Result<WizardOutcome, CoreError> {
        session.merge(submitted.clone());
        store
            .set(session_id, self.session_key, session.data())
            .await?;

        if let Some(stale) = self.revalidate(session.data(), resolved.branch) {
            let step = self.definition.step(stale).id;
            tracing::warn!(step, "Accumulated wizard data is stale, sending user back");
            return Ok(WizardOutcome::Redirect(WizardLocation {
                step,
                branch: resolved.branch,
            }));
        }

        let result = finalizer.finalize(session.data()).await?;

        // Any finalize attempt that reached the API ends the run, including a
        // recoverable conflict.
        store.delete(session_id, self.session_key).await?;

        match result {
            FinalizeResult::Success(id) => {
                tracing::info!(entity_id = %id, "Wizard finalized");
                Ok(WizardOutcome::Completed(id))
            }
            FinalizeResult::ValidationConflict(errors) => {
                tracing::info!(
                    fields = ?errors.keys().collect::<Vec<_>>(),
                    "Wizard finalize rejected with a conflict"
                );
                store
                    .set(session_id, self.session_key, &submitted)
                    .await?;
                Ok(WizardOutcome::Render(self.view(resolved, submitted, errors)))
            }
        }
    }
}
