//! Request extractors.
//!
//! - [`current_user::CurrentUser`] -- the signed-in user, asserted by the gateway.
//! - [`browser_session::BrowserSession`] -- the cookie-keyed wizard session id.

pub mod browser_session;
pub mod current_user;
