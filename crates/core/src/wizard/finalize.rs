//! The single external transaction that ends a wizard run.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::{FieldErrors, FormData, ServiceId};

/// Outcome of a finalize call that reached the external API.
///
/// Transport failures and unexpected API errors are not represented here;
/// they surface as `Err(CoreError)` from [`Finalizer::finalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeResult {
    /// The entity was created.
    Success(ServiceId),
    /// The API refused the data because of a field-level business rule
    /// (e.g. a name already in use).
    ValidationConflict(FieldErrors),
}

/// Turns the fully accumulated wizard data into a created entity.
///
/// Called at most once per final submission, only after every step has
/// re-validated against the accumulated data.
#[async_trait]
pub trait Finalizer: Send + Sync {
    async fn finalize(&self, data: &FormData) -> Result<FinalizeResult, CoreError>;
}
