//! The "add service" wizard: step definitions and the finalize transaction.
//!
//! Four steps, in order: logo language order, service name and sender
//! address, organisation type, then an organisation step whose form depends
//! on the organisation type chosen before it.

use async_trait::async_trait;
use serde::Serialize;

use crate::email_safe::email_safe;
use crate::error::CoreError;
use crate::forms::{self, FormKind};
use crate::types::{FieldErrors, FormData, ServiceId, UserId};
use crate::wizard::{
    BranchVariant, FinalizeResult, Finalizer, StepSpec, WizardDefinition, WizardEngine,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Session key the accumulated form data is stored under.
pub const SESSION_FORM_KEY: &str = "add_service_form";

pub const STEP_LOGO: &str = "choose_logo";
pub const STEP_NAME: &str = "choose_service_name";
pub const STEP_ORGANISATION_TYPE: &str = "choose_organisation_type";
pub const STEP_ORGANISATION: &str = "choose_organisation";

pub const STEP_LOGO_HEADER: &str = "Choose order for official languages";
pub const STEP_NAME_HEADER: &str = "Create service name and email address";
pub const STEP_ORGANISATION_TYPE_HEADER: &str = "About your service";
pub const STEP_ORGANISATION_HEADER: &str = "About your service";

/// Organisation type sent to the API unless configured otherwise.
pub const DEFAULT_ORGANISATION_TYPE: &str = "central";

pub const MSG_NAME_IN_USE: &str = "This service name is already in use";
pub const MSG_EMAIL_FROM_IN_USE: &str = "This email address is already in use";

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

/// Build the add-service step definition.
pub fn definition() -> Result<WizardDefinition, CoreError> {
    let steps = vec![
        StepSpec::single(
            STEP_LOGO,
            STEP_LOGO_HEADER,
            FormKind::ServiceLogo,
            "partials/add-service/step-choose-logo.html",
        )
        .with_submit_marker(forms::FIELD_DEFAULT_BRANDING),
        StepSpec::single(
            STEP_NAME,
            STEP_NAME_HEADER,
            FormKind::ServiceName,
            "partials/add-service/step-create-service.html",
        ),
        StepSpec::single(
            STEP_ORGANISATION_TYPE,
            STEP_ORGANISATION_TYPE_HEADER,
            FormKind::OrganisationType,
            "partials/add-service/step-enter-organisation-type.html",
        ),
        StepSpec::branched(
            STEP_ORGANISATION,
            STEP_ORGANISATION_HEADER,
            forms::FIELD_GOVERNMENT_TYPE,
            forms::GOVERNMENT_TYPE_FEDERAL,
            vec![
                BranchVariant {
                    value: forms::GOVERNMENT_TYPE_FEDERAL,
                    form: FormKind::FederalOrganisation,
                    template: "partials/add-service/step-enter-federal-organisation.html",
                },
                BranchVariant {
                    value: forms::GOVERNMENT_TYPE_PT,
                    form: FormKind::PtOrganisation,
                    template: "partials/add-service/step-enter-pt-organisation.html",
                },
                BranchVariant {
                    value: forms::GOVERNMENT_TYPE_OTHER,
                    form: FormKind::OtherOrganisation,
                    template: "partials/add-service/step-enter-other-organisation.html",
                },
            ],
        ),
    ];

    WizardDefinition::new(steps)
}

/// The add-service engine, keyed on [`SESSION_FORM_KEY`].
pub fn engine() -> Result<WizardEngine, CoreError> {
    Ok(WizardEngine::new(definition()?, SESSION_FORM_KEY))
}

// ---------------------------------------------------------------------------
// Finalize
// ---------------------------------------------------------------------------

/// Limits and classification applied to every new service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefaults {
    pub organisation_type: String,
    pub message_limit: i64,
    pub sms_daily_limit: i64,
}

impl Default for ServiceDefaults {
    fn default() -> Self {
        Self {
            organisation_type: DEFAULT_ORGANISATION_TYPE.to_string(),
            message_limit: 50,
            sms_daily_limit: 50,
        }
    }
}

/// Payload for creating a service through the Notify API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewService {
    pub name: String,
    pub organisation_type: String,
    pub message_limit: i64,
    pub sms_daily_limit: i64,
    /// New services always start in trial mode.
    pub restricted: bool,
    pub user_id: UserId,
    /// Email-safe sender local part, derived at finalize time.
    pub email_from: String,
    pub default_branding_is_french: bool,
}

impl NewService {
    /// Build the payload from fully accumulated wizard data.
    pub fn from_form(
        data: &FormData,
        user_id: UserId,
        defaults: &ServiceDefaults,
    ) -> Result<Self, CoreError> {
        let field = |name: &str| {
            data.get(name).ok_or_else(|| {
                CoreError::Validation(format!("Missing '{name}' in add-service data"))
            })
        };

        Ok(Self {
            name: field(forms::FIELD_NAME)?.clone(),
            organisation_type: defaults.organisation_type.clone(),
            message_limit: defaults.message_limit,
            sms_daily_limit: defaults.sms_daily_limit,
            restricted: true,
            user_id,
            email_from: email_safe(field(forms::FIELD_EMAIL_FROM)?),
            default_branding_is_french: field(forms::FIELD_DEFAULT_BRANDING)?
                == forms::FRENCH_OPTION_VALUE,
        })
    }
}

/// Business-rule conflicts the API reports for a new service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceConflict {
    NameInUse,
    EmailFromInUse,
}

impl ServiceConflict {
    /// Form field the conflict is attached to.
    pub fn field(self) -> &'static str {
        match self {
            Self::NameInUse => forms::FIELD_NAME,
            Self::EmailFromInUse => forms::FIELD_EMAIL_FROM,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::NameInUse => MSG_NAME_IN_USE,
            Self::EmailFromInUse => MSG_EMAIL_FROM_IN_USE,
        }
    }

    pub fn to_field_errors(self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.insert(self.field().to_string(), vec![self.message().to_string()]);
        errors
    }
}

/// Result of a create-service call that reached the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCreation {
    Created(ServiceId),
    Conflict(ServiceConflict),
}

/// The service-creation side of the Notify API.
#[async_trait]
pub trait ServiceApi: Send + Sync {
    /// Create the service (and any follow-up setup such as billing limits).
    ///
    /// Only name/sender conflicts are reported as `Ok(Conflict)`; every other
    /// failure is an `Err`.
    async fn create_service(&self, service: &NewService) -> Result<ServiceCreation, CoreError>;
}

/// Finalizer that creates a service for the signed-in user.
pub struct AddServiceFinalizer<'a> {
    api: &'a dyn ServiceApi,
    user_id: UserId,
    defaults: &'a ServiceDefaults,
}

impl<'a> AddServiceFinalizer<'a> {
    pub fn new(api: &'a dyn ServiceApi, user_id: UserId, defaults: &'a ServiceDefaults) -> Self {
        Self {
            api,
            user_id,
            defaults,
        }
    }
}

#[async_trait]
impl<'a> Finalizer for AddServiceFinalizer<'a> {
    async fn finalize(&self, data: &FormData) -> Result<FinalizeResult, CoreError> {
        let service = NewService::from_form(data, self.user_id, self.defaults)?;

        tracing::info!(
            user_id = %self.user_id,
            email_from = %service.email_from,
            "Creating service"
        );

        match self.api.create_service(&service).await? {
            ServiceCreation::Created(id) => Ok(FinalizeResult::Success(id)),
            ServiceCreation::Conflict(conflict) => {
                Ok(FinalizeResult::ValidationConflict(conflict.to_field_errors()))
            }
        }
    }
}
