pub mod add_service;
pub mod health;
