pub mod wizard_session_repo;

pub use wizard_session_repo::WizardSessionRepo;
