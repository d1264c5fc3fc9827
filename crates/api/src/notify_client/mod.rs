//! Client for the Notify REST API.

pub mod service_api_client;

pub use service_api_client::{NotifyApiClient, NotifyApiError};
