//! Session verification for drivebox.
//!
//! Sign-in itself is handled by an external identity provider; this module
//! only checks that an inbound request carries a valid session issued by it.

mod session;

pub use session::{Identity, SessionClaims, SessionVerifier, DEFAULT_SESSION_COOKIE};
