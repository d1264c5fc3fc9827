use std::collections::BTreeMap;

/// Submitted or accumulated form values, keyed by field name.
///
/// Ordered so that serialized sessions and step views are stable.
pub type FormData = BTreeMap<String, String>;

/// Field-level validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Identifier the Notify API assigns to a created service.
pub type ServiceId = uuid::Uuid;

/// Identifier of one browser session (carried in a cookie).
pub type SessionId = uuid::Uuid;

/// Identifier of the signed-in Notify user.
pub type UserId = uuid::Uuid;
