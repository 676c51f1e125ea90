//! Authenticated admin identity and the session handed back on sign-in.

use serde::Serialize;

/// An admin allowed into the dashboard.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// Stable id for the account.
    pub uid: String,

    /// Login identifier (an email address in practice).
    pub identifier: String,
}

/// A live session. `token` is presented as a bearer credential.
#[derive(Serialize, Clone, Debug)]
pub struct Session {
    pub token: String,
    pub user: User,
}
