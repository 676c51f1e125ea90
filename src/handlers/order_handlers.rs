//! Public order desk.
//!
//! - POST /api/orders                  -> validate an order and draft the e-mail
//! - POST /api/orders/reference-photos -> screen outfit photos before sending

use crate::{
    errors::AppError,
    models::order::{OrderDraft, OrderRequest, PhotoScreening, ReferencePhoto},
    routes::routes::AppState,
    services::orders,
};
use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use serde_json::json;

/// `POST /api/orders`
pub async fn submit_order(
    State(state): State<AppState>,
    Json(order): Json<OrderRequest>,
) -> Result<Json<OrderDraft>, AppError> {
    orders::compose_mailto(&order, &state.orders_email)
        .map(Json)
        .map_err(|errors| {
            AppError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Please fill in the highlighted fields.",
            )
            .with_details(json!({ "fields": errors }))
        })
}

/// `POST /api/orders/reference-photos`
pub async fn screen_photos(mut multipart: Multipart) -> Result<Json<PhotoScreening>, AppError> {
    let mut photos = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.body_text()))?
    {
        let file_name = field
            .file_name()
            .or(field.name())
            .unwrap_or("photo")
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(err.body_text()))?;

        photos.push(ReferencePhoto {
            file_name,
            content_type,
            size_bytes: bytes.len(),
        });
    }

    Ok(Json(orders::screen_reference_photos(&photos)))
}
