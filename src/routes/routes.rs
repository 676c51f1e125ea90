//! Defines routes for the gallery admin and the public order desk.
//!
//! ## Structure
//! - **Session**
//!   - `POST   /api/session`   - sign in
//!   - `DELETE /api/session`   - sign out
//!   - `GET    /api/dashboard` - login or dashboard view
//!
//! - **Gallery**
//!   - `GET    /api/gallery`      - list items
//!   - `POST   /api/gallery`      - upload images (admin)
//!   - `PATCH  /api/gallery/{id}` - edit caption and tags (admin)
//!   - `DELETE /api/gallery/{id}` - delete item (admin, `?confirm=true`)
//!   - `GET    /blobs/{*path}`    - stored image bytes
//!
//! - **Orders**
//!   - `POST /api/orders`                  - draft an order e-mail
//!   - `POST /api/orders/reference-photos` - screen reference photos
//!
//! Admin routes authenticate through the `AdminUser` extractor.

use crate::{
    backend::{SessionApi, disk_blobs::{BLOB_ROUTE_PREFIX, DiskBlobStore}},
    handlers::{
        blob_handlers::get_blob,
        gallery_handlers::{delete_item, list_gallery, save_item, upload_gallery},
        health_handlers::{healthz, readyz},
        order_handlers::{screen_photos, submit_order},
        session_handlers::{dashboard, sign_in, sign_out},
    },
    services::{gallery_service::GalleryService, session_gate::SessionGate},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub gallery: GalleryService,
    pub sessions: Arc<dyn SessionApi>,
    pub gate: Arc<SessionGate>,
    /// Concrete blob store, for streaming bytes back out.
    pub blob_files: Arc<DiskBlobStore>,
    pub orders_email: Arc<str>,
}

/// Build the application router.
///
/// `max_upload_bytes` caps every request body, multipart uploads included.
pub fn routes(state: AppState, max_upload_bytes: usize) -> Router {
    let blob_route = format!("{BLOB_ROUTE_PREFIX}{{*path}}");

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/session", post(sign_in).delete(sign_out))
        .route("/api/dashboard", get(dashboard))
        .route("/api/gallery", get(list_gallery).post(upload_gallery))
        .route("/api/gallery/{id}", patch(save_item).delete(delete_item))
        .route(&blob_route, get(get_blob))
        .route("/api/orders", post(submit_order))
        .route("/api/orders/reference-photos", post(screen_photos))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::{
        backend::{
            local_sessions::{AdminAccount, LocalSessions},
            memory::{MemoryBlobs, MemoryDocuments},
        },
        handlers::session_handlers::{AdminUser, SignInRequest, sign_in},
        services::{
            gallery_service::{CaptionPolicy, fixtures::fixture},
            session_gate::GateTimings,
        },
    };
    use axum::{Json, extract::State};
    use std::time::Duration;

    pub const ADMIN_IDENTIFIER: &str = "milliner@example.com";
    pub const ADMIN_SECRET: &str = "hunter22";

    /// App state over the memory fakes, with blob files under `dir`.
    pub struct TestApp {
        pub state: AppState,
        pub docs: Arc<MemoryDocuments>,
        pub blobs: Arc<MemoryBlobs>,
    }

    pub fn test_app(dir: &tempfile::TempDir) -> TestApp {
        let fx = fixture(CaptionPolicy::Filename);
        let sessions: Arc<dyn SessionApi> = Arc::new(LocalSessions::new(
            AdminAccount {
                identifier: ADMIN_IDENTIFIER.into(),
                secret: ADMIN_SECRET.into(),
            },
            Duration::from_secs(3600),
        ));
        let gate = SessionGate::new(
            fx.service.clone(),
            GateTimings {
                saved_label: Duration::from_secs(60),
                upload_status: Duration::from_secs(60),
            },
        );
        TestApp {
            state: AppState {
                gallery: fx.service,
                sessions,
                gate,
                blob_files: Arc::new(DiskBlobStore::new(dir.path(), "http://localhost:3000")),
                orders_email: "orders@example.com".into(),
            },
            docs: fx.docs,
            blobs: fx.blobs,
        }
    }

    /// Sign in through the handler and show the dashboard.
    pub async fn signed_in(state: &AppState) -> AdminUser {
        let Json(session) = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                identifier: "Milliner@Example.com".into(),
                secret: ADMIN_SECRET.into(),
            }),
        )
        .await
        .unwrap();
        state.gate.apply(Some(&session.user)).await;
        AdminUser {
            user: session.user,
            token: session.token,
        }
    }
}
