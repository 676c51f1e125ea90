//! Gallery admin endpoints.
//!
//! - GET    /api/gallery       -> rendered gallery list
//! - POST   /api/gallery       -> multipart upload (`files`, `caption`, `tags`)
//! - PATCH  /api/gallery/{id}  -> save caption and tags
//! - DELETE /api/gallery/{id}  -> delete item, requires `?confirm=true`

use super::session_handlers::AdminUser;
use crate::{
    errors::AppError,
    routes::routes::AppState,
    services::{
        deleter::DeleteOutcome,
        editor::EditInput,
        gallery_list::GalleryView,
        session_gate::SAVED_LABEL,
        upload::{LocalFile, UploadForm, UploadReport},
    },
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub id: String,
    pub save_label: &'static str,
}

/// `GET /api/gallery`
pub async fn list_gallery(State(state): State<AppState>) -> Json<GalleryView> {
    Json(state.gallery.render().await)
}

/// `POST /api/gallery`
///
/// Every `files` part becomes one upload flow; `caption` and `tags` apply to
/// all of them.
pub async fn upload_gallery(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Multipart,
) -> Result<Json<UploadReport>, AppError> {
    let mut form = read_upload_form(multipart).await?;
    debug!(files = form.files.len(), "upload form received");

    match state.gallery.upload(&mut form).await {
        Ok(report) => {
            state.gate.upload_finished(Ok(())).await;
            Ok(Json(report))
        }
        Err(err) => {
            state.gate.upload_finished(Err(err.to_string())).await;
            Err(err.into())
        }
    }
}

/// `PATCH /api/gallery/{id}`
pub async fn save_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(input): Json<EditInput>,
) -> Result<Json<SaveResponse>, AppError> {
    match state.gallery.save(&id, &input).await {
        Ok(()) => {
            state.gate.mark_saved(&id).await;
            Ok(Json(SaveResponse {
                id,
                save_label: SAVED_LABEL,
            }))
        }
        Err(err) => {
            state.gate.mark_save_failed(&id, &err.to_string()).await;
            Err(err.into())
        }
    }
}

/// `DELETE /api/gallery/{id}?confirm=true`
pub async fn delete_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteOutcome>, AppError> {
    let item = state.gallery.find(&id).await?;
    let outcome = state.gallery.delete(&item, query.confirm).await?;
    state.gate.remove_row(&id).await;
    Ok(Json(outcome))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" | "file" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("upload")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(err.body_text()))?;
                // An empty file input still posts one nameless, empty part.
                if bytes.is_empty() && file_name == "upload" {
                    continue;
                }
                form.files.push(LocalFile { file_name, bytes });
            }
            "caption" => {
                form.caption = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(err.body_text()))?;
            }
            "tags" => {
                form.tags_input = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(err.body_text()))?;
            }
            other => debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::gallery_item::GALLERY_COLLECTION,
        routes::routes::test_support::{signed_in, test_app},
        services::{
            gallery_service::NO_FILE_SELECTED,
            session_gate::DashboardView,
            upload::UPLOAD_COMPLETE,
        },
    };
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{Request, StatusCode, header},
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const BOUNDARY: &str = "hat-form-boundary";

    /// One multipart part: field name, optional file name, body.
    type Part<'a> = (&'a str, Option<&'a str>, &'a str);

    async fn multipart(parts: &[Part<'_>]) -> Multipart {
        let mut body = Vec::new();
        for (name, file_name, bytes) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let disposition = match file_name {
                Some(file_name) => format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: image/jpeg\r\n\r\n"
                ),
                None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(bytes.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/gallery")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    fn seed_row(docs: &crate::backend::memory::MemoryDocuments, id: &str) {
        docs.insert_raw(
            GALLERY_COLLECTION,
            id,
            json!({
                "url": format!("mem://blobs/gallery/1-{id}.jpg"),
                "caption": "Old",
                "tags": ["felt"],
                "createdAt": "2025-01-01T00:00:00Z"
            }),
        );
    }

    async fn row_label(state: &AppState, id: &str) -> String {
        match state.gate.snapshot().await {
            DashboardView::Dashboard {
                gallery: GalleryView::Rows { rows },
                ..
            } => rows
                .into_iter()
                .find(|row| row.id == id)
                .map(|row| row.save_label)
                .unwrap(),
            other => panic!("expected rows, got {other:?}"),
        }
    }

    async fn upload_status(state: &AppState) -> Option<String> {
        match state.gate.snapshot().await {
            DashboardView::Dashboard { upload_status, .. } => upload_status,
            other => panic!("expected dashboard, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_form_reads_files_caption_and_tags() {
        let form = read_upload_form(
            multipart(&[
                ("files", Some("boater..final.jpg"), "one"),
                ("files", Some("cloche.png"), "two"),
                // what a browser posts for an untouched file input
                ("files", Some(""), ""),
                ("caption", None, "Spring racing"),
                ("tags", None, "felt, straw"),
                ("utm_source", None, "newsletter"),
            ])
            .await,
        )
        .await
        .unwrap();

        let names: Vec<_> = form.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["boater..final.jpg", "cloche.png"]);
        assert_eq!(form.files[0].bytes.as_ref(), b"one");
        assert_eq!(form.caption, "Spring racing");
        assert_eq!(form.tags_input, "felt, straw");
    }

    #[tokio::test]
    async fn unnamed_non_empty_file_is_kept_as_upload() {
        let form = read_upload_form(multipart(&[("file", Some(""), "bytes")]).await)
            .await
            .unwrap();
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].file_name, "upload");
    }

    #[tokio::test]
    async fn upload_creates_items_and_reports_to_the_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let admin = signed_in(&app.state).await;

        let Json(report) = upload_gallery(
            State(app.state.clone()),
            admin,
            multipart(&[
                ("files", Some("a.jpg"), "a"),
                ("files", Some("b.jpg"), "b"),
                ("tags", None, "a, b ,  b,c"),
            ])
            .await,
        )
        .await
        .unwrap();

        assert_eq!(report.created.len(), 2);
        assert_eq!(app.docs.len(), 2);
        assert_eq!(app.blobs.len(), 2);
        assert_eq!(upload_status(&app.state).await.as_deref(), Some(UPLOAD_COMPLETE));
        assert_eq!(row_label(&app.state, &report.created[0]).await, "Save");
    }

    #[tokio::test]
    async fn upload_without_files_is_refused_before_any_backend_call() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let admin = signed_in(&app.state).await;
        let calls_before = app.docs.calls();

        let err = upload_gallery(
            State(app.state.clone()),
            admin,
            multipart(&[("files", Some(""), ""), ("caption", None, "x")]).await,
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.blobs.calls(), 0);
        assert_eq!(app.docs.calls(), calls_before);
        assert_eq!(upload_status(&app.state).await.as_deref(), Some(NO_FILE_SELECTED));
    }

    #[tokio::test]
    async fn save_marks_the_row_saved() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        seed_row(&app.docs, "a");
        let admin = signed_in(&app.state).await;

        let Json(saved) = save_item(
            State(app.state.clone()),
            admin,
            Path("a".to_string()),
            Json(EditInput {
                caption: "  New caption ".into(),
                tags: "sinamay, , silk".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(saved.save_label, SAVED_LABEL);
        assert_eq!(row_label(&app.state, "a").await, SAVED_LABEL);
        let item = app.state.gallery.find("a").await.unwrap();
        assert_eq!(item.caption, "New caption");
        assert_eq!(item.tags, vec!["sinamay", "silk"]);
        assert_eq!(item.url, "mem://blobs/gallery/1-a.jpg");
    }

    #[tokio::test]
    async fn failed_save_shows_the_error_on_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        seed_row(&app.docs, "a");
        let admin = signed_in(&app.state).await;
        // Removed elsewhere after the list was rendered.
        app.state
            .gallery
            .documents
            .delete(GALLERY_COLLECTION, "a")
            .await
            .unwrap();

        let err = save_item(
            State(app.state.clone()),
            admin,
            Path("a".to_string()),
            Json(EditInput::default()),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(row_label(&app.state, "a").await, err.message);
    }
}
