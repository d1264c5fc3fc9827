//! Per-step form schemas for the add-service wizard.
//!
//! Each form is a plain struct validated with the `validator` derive. The
//! wizard engine never sees the structs directly: it dispatches through
//! [`FormKind`], which binds raw [`FormData`] to the right struct and reports
//! failures as [`FieldErrors`].

use std::borrow::Cow;

use validator::{Validate, ValidationError, ValidationErrors};

use crate::email_safe::email_safe;
use crate::types::{FieldErrors, FormData};

// ---------------------------------------------------------------------------
// Field names and choices
// ---------------------------------------------------------------------------

pub const FIELD_DEFAULT_BRANDING: &str = "default_branding";
pub const FIELD_NAME: &str = "name";
pub const FIELD_EMAIL_FROM: &str = "email_from";
pub const FIELD_GOVERNMENT_TYPE: &str = "government_type";
pub const FIELD_PARENT_ORGANISATION_NAME: &str = "parent_organisation_name";
pub const FIELD_CHILD_ORGANISATION_NAME: &str = "child_organisation_name";
pub const FIELD_OTHER_ORGANISATION_NAME: &str = "other_organisation_name";

/// Branding option value for English-first logos.
pub const ENGLISH_OPTION_VALUE: &str = "en";
/// Branding option value for French-first logos.
pub const FRENCH_OPTION_VALUE: &str = "fr";

pub const BRANDING_CHOICES: &[&str] = &[ENGLISH_OPTION_VALUE, FRENCH_OPTION_VALUE];

pub const GOVERNMENT_TYPE_FEDERAL: &str = "federal";
pub const GOVERNMENT_TYPE_PT: &str = "pt";
pub const GOVERNMENT_TYPE_OTHER: &str = "other";

pub const GOVERNMENT_TYPE_CHOICES: &[&str] = &[
    GOVERNMENT_TYPE_FEDERAL,
    GOVERNMENT_TYPE_PT,
    GOVERNMENT_TYPE_OTHER,
];

/// Longest service name the API accepts.
pub const MAX_SERVICE_NAME_LEN: usize = 255;

/// Longest sender local part the API accepts.
pub const MAX_EMAIL_FROM_LEN: usize = 64;

const MSG_REQUIRED: &str = "This cannot be empty";
const MSG_CHOOSE_OPTION: &str = "You need to choose an option";

// ---------------------------------------------------------------------------
// Form structs
// ---------------------------------------------------------------------------

/// Order of the official-language logos.
#[derive(Debug, Default, Validate)]
pub struct ServiceLogoForm {
    #[validate(custom(function = "validate_branding_choice"))]
    pub default_branding: String,
}

/// Service name and sender address.
#[derive(Debug, Default, Validate)]
pub struct ServiceNameForm {
    #[validate(custom(function = "validate_service_name"))]
    pub name: String,
    #[validate(custom(function = "validate_email_from"))]
    pub email_from: String,
}

/// Level of government the service belongs to.
#[derive(Debug, Default, Validate)]
pub struct OrganisationTypeForm {
    #[validate(custom(function = "validate_government_type"))]
    pub government_type: String,
}

#[derive(Debug, Default, Validate)]
pub struct FederalOrganisationForm {
    #[validate(custom(function = "validate_required"))]
    pub parent_organisation_name: String,
}

#[derive(Debug, Default, Validate)]
pub struct PtOrganisationForm {
    #[validate(custom(function = "validate_required"))]
    pub child_organisation_name: String,
}

#[derive(Debug, Default, Validate)]
pub struct OtherOrganisationForm {
    #[validate(custom(function = "validate_required"))]
    pub other_organisation_name: String,
}

// ---------------------------------------------------------------------------
// Custom validators
// ---------------------------------------------------------------------------

fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn validate_required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("required", MSG_REQUIRED));
    }
    Ok(())
}

fn validate_choice(value: &str, choices: &[&str]) -> Result<(), ValidationError> {
    if !choices.contains(&value) {
        return Err(error("choice", MSG_CHOOSE_OPTION));
    }
    Ok(())
}

fn validate_branding_choice(value: &str) -> Result<(), ValidationError> {
    validate_choice(value, BRANDING_CHOICES)
}

fn validate_government_type(value: &str) -> Result<(), ValidationError> {
    validate_choice(value, GOVERNMENT_TYPE_CHOICES)
}

fn validate_service_name(value: &str) -> Result<(), ValidationError> {
    validate_required(value)?;
    if value.chars().count() > MAX_SERVICE_NAME_LEN {
        return Err(error(
            "length",
            format!("This cannot exceed {MAX_SERVICE_NAME_LEN} characters in length"),
        ));
    }
    Ok(())
}

/// The sender must survive normalisation with at least one character left.
fn validate_email_from(value: &str) -> Result<(), ValidationError> {
    validate_required(value)?;
    let safe = email_safe(value);
    if safe.is_empty() {
        return Err(error(
            "email_safe",
            "Make sure the sending email address contains letters or numbers",
        ));
    }
    if safe.len() > MAX_EMAIL_FROM_LEN {
        return Err(error(
            "length",
            format!("This cannot exceed {MAX_EMAIL_FROM_LEN} characters in length"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Closed set of forms a wizard step can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    ServiceLogo,
    ServiceName,
    OrganisationType,
    FederalOrganisation,
    PtOrganisation,
    OtherOrganisation,
}

impl FormKind {
    /// Field names owned by this form, in display order.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::ServiceLogo => &[FIELD_DEFAULT_BRANDING],
            Self::ServiceName => &[FIELD_NAME, FIELD_EMAIL_FROM],
            Self::OrganisationType => &[FIELD_GOVERNMENT_TYPE],
            Self::FederalOrganisation => &[FIELD_PARENT_ORGANISATION_NAME],
            Self::PtOrganisation => &[FIELD_CHILD_ORGANISATION_NAME],
            Self::OtherOrganisation => &[FIELD_OTHER_ORGANISATION_NAME],
        }
    }

    /// Keep only the values this form owns; anything else in `data` is dropped.
    pub fn bind(self, data: &FormData) -> FormData {
        self.fields()
            .iter()
            .filter_map(|field| data.get(*field).map(|v| ((*field).to_string(), v.clone())))
            .collect()
    }

    /// Validate `data` against this form. Missing fields count as empty.
    pub fn validate(self, data: &FormData) -> Result<(), FieldErrors> {
        let value = |field: &str| data.get(field).cloned().unwrap_or_default();

        let result = match self {
            Self::ServiceLogo => ServiceLogoForm {
                default_branding: value(FIELD_DEFAULT_BRANDING),
            }
            .validate(),
            Self::ServiceName => ServiceNameForm {
                name: value(FIELD_NAME),
                email_from: value(FIELD_EMAIL_FROM),
            }
            .validate(),
            Self::OrganisationType => OrganisationTypeForm {
                government_type: value(FIELD_GOVERNMENT_TYPE),
            }
            .validate(),
            Self::FederalOrganisation => FederalOrganisationForm {
                parent_organisation_name: value(FIELD_PARENT_ORGANISATION_NAME),
            }
            .validate(),
            Self::PtOrganisation => PtOrganisationForm {
                child_organisation_name: value(FIELD_CHILD_ORGANISATION_NAME),
            }
            .validate(),
            Self::OtherOrganisation => OtherOrganisationForm {
                other_organisation_name: value(FIELD_OTHER_ORGANISATION_NAME),
            }
            .validate(),
        };

        result.map_err(to_field_errors)
    }
}

/// Flatten `validator` errors into field name -> messages.
fn to_field_errors(errors: ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}
