//! Domain core for the Notify admin "add service" wizard.
//!
//! Holds everything that does not touch the network or the database: the
//! generic wizard engine, the form schemas, the add-service definition and
//! the email-safe name normalisation.

pub mod add_service;
pub mod email_safe;
pub mod error;
pub mod forms;
pub mod types;
pub mod wizard;
