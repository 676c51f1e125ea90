//! Session gate: switches between the login view and the dashboard as the
//! auth state changes, and owns the dashboard's rendered gallery.
//!
//! The gate is an explicit context object rather than ambient state. One
//! observer task is attached per gate; dropping the returned
//! [`GateSubscription`] unsubscribes it.

use super::{
    gallery_list::{EMPTY_GALLERY, GalleryView, SAVE_LABEL},
    gallery_service::{GalleryError, GalleryResult, GalleryService},
    upload::UPLOAD_COMPLETE,
};
use crate::{
    backend::SessionApi,
    models::session::{Session, User},
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{RwLock, watch},
    task::JoinHandle,
};
use tracing::{debug, info};

pub const SAVED_LABEL: &str = "Saved";

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardView {
    Login,
    Dashboard {
        gallery: GalleryView,
        upload_status: Option<String>,
    },
}

/// How long transient labels stay up.
#[derive(Clone, Copy, Debug)]
pub struct GateTimings {
    pub saved_label: Duration,
    pub upload_status: Duration,
}

impl Default for GateTimings {
    fn default() -> Self {
        Self {
            saved_label: Duration::from_secs(2),
            upload_status: Duration::from_secs(3),
        }
    }
}

pub struct SessionGate {
    gallery: GalleryService,
    view: RwLock<DashboardView>,
    timings: GateTimings,
}

/// Keeps the observer task alive; dropping it unsubscribes.
pub struct GateSubscription {
    task: JoinHandle<()>,
}

impl Drop for GateSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Validate the login form, then hand the credentials to the backend.
pub async fn sign_in(
    sessions: &dyn SessionApi,
    identifier: &str,
    secret: &str,
) -> GalleryResult<Session> {
    let identifier = identifier.trim();
    if identifier.is_empty() || secret.is_empty() {
        return Err(GalleryError::MissingCredentials);
    }
    Ok(sessions.sign_in(identifier, secret).await?)
}

impl SessionGate {
    pub fn new(gallery: GalleryService, timings: GateTimings) -> Arc<Self> {
        Arc::new(Self {
            gallery,
            view: RwLock::new(DashboardView::Login),
            timings,
        })
    }

    pub async fn snapshot(&self) -> DashboardView {
        self.view.read().await.clone()
    }

    /// Start observing `auth`. The current value is applied right away.
    pub fn attach(self: &Arc<Self>, mut auth: watch::Receiver<Option<User>>) -> GateSubscription {
        let gate = Arc::clone(self);
        let task = tokio::spawn(async move {
            let current = auth.borrow_and_update().clone();
            gate.apply(current.as_ref()).await;
            while auth.changed().await.is_ok() {
                let user = auth.borrow_and_update().clone();
                gate.apply(user.as_ref()).await;
            }
            debug!("auth state feed closed");
        });
        GateSubscription { task }
    }

    /// React to one auth-state transition.
    pub async fn apply(&self, user: Option<&User>) {
        match user {
            Some(user) => {
                info!(uid = %user.uid, "showing dashboard");
                *self.view.write().await = DashboardView::Dashboard {
                    gallery: GalleryView::Loading,
                    upload_status: None,
                };
                self.reload().await;
            }
            None => {
                info!("showing login");
                *self.view.write().await = DashboardView::Login;
            }
        }
    }

    /// Re-render the whole gallery, if the dashboard is showing.
    pub async fn reload(&self) {
        if *self.view.read().await == DashboardView::Login {
            return;
        }
        let rendered = self.gallery.render().await;
        if let DashboardView::Dashboard { gallery, .. } = &mut *self.view.write().await {
            *gallery = rendered;
        }
    }

    /// Drop one row without reloading.
    pub async fn remove_row(&self, id: &str) {
        if let DashboardView::Dashboard { gallery, .. } = &mut *self.view.write().await {
            if let GalleryView::Rows { rows } = gallery {
                rows.retain(|row| row.id != id);
                if rows.is_empty() {
                    *gallery = GalleryView::Empty {
                        message: EMPTY_GALLERY.to_string(),
                    };
                }
            }
        }
    }

    /// Label a row `Saved`, reverting to `Save` after a short delay.
    pub async fn mark_saved(self: &Arc<Self>, id: &str) {
        self.set_save_label(id, SAVED_LABEL).await;

        let gate = Arc::clone(self);
        let id = id.to_string();
        let delay = self.timings.saved_label;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            gate.revert_save_label(&id).await;
        });
    }

    /// Show a save error in place of the row's Save label.
    pub async fn mark_save_failed(&self, id: &str, message: &str) {
        self.set_save_label(id, message).await;
    }

    /// Report a finished upload. Success reloads the list and shows a
    /// status that clears itself; failure leaves the message up.
    pub async fn upload_finished(self: &Arc<Self>, outcome: Result<(), String>) {
        let status = match outcome {
            Ok(()) => {
                self.reload().await;
                let gate = Arc::clone(self);
                let delay = self.timings.upload_status;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    gate.clear_upload_status(UPLOAD_COMPLETE).await;
                });
                UPLOAD_COMPLETE.to_string()
            }
            Err(message) => message,
        };
        if let DashboardView::Dashboard { upload_status, .. } = &mut *self.view.write().await {
            *upload_status = Some(status);
        }
    }

    async fn set_save_label(&self, id: &str, label: &str) {
        if let DashboardView::Dashboard {
            gallery: GalleryView::Rows { rows },
            ..
        } = &mut *self.view.write().await
        {
            if let Some(row) = rows.iter_mut().find(|row| row.id == id) {
                row.save_label = label.to_string();
            }
        }
    }

    async fn revert_save_label(&self, id: &str) {
        if let DashboardView::Dashboard {
            gallery: GalleryView::Rows { rows },
            ..
        } = &mut *self.view.write().await
        {
            if let Some(row) = rows
                .iter_mut()
                .find(|row| row.id == id && row.save_label == SAVED_LABEL)
            {
                row.save_label = SAVE_LABEL.to_string();
            }
        }
    }

    async fn clear_upload_status(&self, expected: &str) {
        if let DashboardView::Dashboard { upload_status, .. } = &mut *self.view.write().await {
            if upload_status.as_deref() == Some(expected) {
                *upload_status = None;
            }
        }
    }
}
