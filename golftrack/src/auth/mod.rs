//! Authentication for browser sessions.
//!
//! Users sign up and log in with a username and password. A successful login sets an HTTP-only
//! cookie holding a signed JWT; every request that needs a user re-reads that user from the
//! database, so deleting an account ends its sessions.
//!
//! # Modules
//!
//! - [`current_user`]: Extractors for getting the authenticated user in handlers
//! - [`password`]: Password hashing and verification using Argon2
//! - [`session`]: JWT session token creation and verification
//! - [`utils`]: Cookie helpers
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use golftrack::api::models::users::CurrentUser;
//!
//! // Redirects to the landing page when nobody is logged in
//! async fn protected_handler(user: CurrentUser) -> String {
//!     format!("Hello, {}!", user.username)
//! }
//!
//! // Renders for everyone
//! async fn public_handler(user: Option<CurrentUser>) -> String {
//!     user.map(|u| u.username).unwrap_or_default()
//! }
//! ```

pub mod current_user;
pub mod password;
pub mod session;
pub mod utils;
