//! LocalSessions - sign-in against the configured admin account.
//!
//! Tokens are random, URL-safe and held in memory only, so a restart signs
//! everybody out. A token expires `ttl` after it was issued. Auth-state
//! transitions are published on a `watch` channel: the value is the admin
//! while at least one unexpired session is live, `None` otherwise.

use super::{BackendError, BackendResult, SessionApi};
use crate::models::session::{Session, User};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info};
use uuid::Uuid;

pub const UNKNOWN_IDENTIFIER: &str =
    "There is no user record corresponding to this identifier. The user may have been deleted.";
pub const WRONG_SECRET: &str = "The password is invalid or the user does not have a password.";

/// Credentials of the single dashboard account.
#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub identifier: String,
    pub secret: String,
}

struct LiveSession {
    user: User,
    issued_at: Instant,
}

pub struct LocalSessions {
    account: AdminAccount,
    uid: String,
    ttl: Duration,
    sessions: RwLock<HashMap<String, LiveSession>>,
    state: watch::Sender<Option<User>>,
}

impl LocalSessions {
    pub fn new(account: AdminAccount, ttl: Duration) -> Self {
        let uid = format!(
            "{:x}",
            md5::compute(account.identifier.to_ascii_lowercase())
        );
        let (state, _) = watch::channel(None);
        Self {
            account,
            uid,
            ttl,
            sessions: RwLock::new(HashMap::new()),
            state,
        }
    }

    fn mint_token() -> String {
        let mut raw = Vec::with_capacity(32);
        raw.extend_from_slice(Uuid::new_v4().as_bytes());
        raw.extend_from_slice(Uuid::new_v4().as_bytes());
        general_purpose::URL_SAFE_NO_PAD.encode(raw)
    }

    fn is_live(&self, session: &LiveSession, now: Instant) -> bool {
        now.duration_since(session.issued_at) < self.ttl
    }

    /// Drop expired tokens, publishing `None` once no session is left.
    /// Returns how many were dropped.
    pub async fn prune_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, session| self.is_live(session, now));
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!(pruned, "expired sessions dropped");
        }
        if sessions.is_empty() {
            self.publish_signed_out();
        }
        pruned
    }

    fn publish_signed_out(&self) {
        self.state.send_if_modified(|current| current.take().is_some());
    }
}

#[async_trait]
impl SessionApi for LocalSessions {
    async fn sign_in(&self, identifier: &str, secret: &str) -> BackendResult<Session> {
        if !identifier.eq_ignore_ascii_case(&self.account.identifier) {
            return Err(BackendError::Rejected(UNKNOWN_IDENTIFIER.into()));
        }
        if secret != self.account.secret {
            return Err(BackendError::Rejected(WRONG_SECRET.into()));
        }

        let user = User {
            uid: self.uid.clone(),
            identifier: self.account.identifier.clone(),
        };
        let token = Self::mint_token();
        {
            let mut sessions = self.sessions.write().await;
            let now = Instant::now();
            sessions.retain(|_, session| self.is_live(session, now));
            sessions.insert(
                token.clone(),
                LiveSession {
                    user: user.clone(),
                    issued_at: now,
                },
            );
        }

        info!(uid = %user.uid, "admin signed in");
        self.state.send_replace(Some(user.clone()));
        Ok(Session { token, user })
    }

    async fn sign_out(&self, token: &str) -> BackendResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(token).is_some() {
            info!("admin signed out");
        }
        if sessions.is_empty() {
            self.publish_signed_out();
        }
        Ok(())
    }

    async fn user_for_token(&self, token: &str) -> Option<User> {
        let expired = match self.sessions.read().await.get(token) {
            Some(session) if self.is_live(session, Instant::now()) => {
                return Some(session.user.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.prune_expired().await;
        }
        None
    }

    fn on_state_change(&self) -> watch::Receiver<Option<User>> {
        self.state.subscribe()
    }
}
