//! Generic multi-step form wizard.
//!
//! A [`WizardDefinition`] fixes the ordered steps; a [`SessionStore`] keeps
//! the accumulated [`WizardSession`] between requests; the
//! [`WizardEngine`] turns one GET or POST into a [`WizardOutcome`]; and a
//! [`Finalizer`] performs the single external call once every step is valid.
//!
//! ```text
//! AwaitingStep(0) --valid POST--> AwaitingStep(1) --> ... --> AwaitingStep(N-1)
//!                                                                  |
//!                                                          valid POST
//!                                                                  v
//!                          re-validate all steps --stale--> redirect to step k
//!                                   |
//!                                finalize --conflict--> render step N-1 with errors
//!                                   |
//!                                 Done
//! ```

pub mod definition;
pub mod engine;
pub mod finalize;
pub mod session;

pub use definition::{BranchVariant, ResolvedStep, StepForm, StepSpec, WizardDefinition};
pub use engine::{StepRequest, StepView, WizardEngine, WizardLocation, WizardOutcome};
pub use finalize::{FinalizeResult, Finalizer};
pub use session::{MemorySessionStore, SessionStore, WizardSession};
