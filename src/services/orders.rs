//! Order desk for the public site: validates custom hat requests, drafts
//! the order e-mail and screens reference photos.

use crate::models::order::{
    FieldError, MAX_REFERENCE_PHOTO_BYTES, OrderDraft, OrderRequest, PhotoScreening,
    ReferencePhoto, RejectedPhoto,
};

const REQUIRED: &str = "This field is required.";
const ORDER_SUBJECT: &str = "Custom Hat Request";
const PHOTO_FOLLOW_UP: &str = "I will send outfit photos via reply or WhatsApp.";

/// Check the required fields. Head size is only required for sized styles.
pub fn validate(order: &OrderRequest) -> Result<(), Vec<FieldError>> {
    let required = [
        ("name", order.name.as_str()),
        ("email", order.email.as_str()),
        ("phone", order.phone.as_str()),
        ("eventDate", order.event_date.as_str()),
        ("hatType", order.hat_type.as_str()),
    ];

    let mut errors: Vec<FieldError> = required
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| FieldError {
            field,
            message: REQUIRED,
        })
        .collect();

    if order.needs_head_size() && optional(&order.head_size).is_none() {
        errors.push(FieldError {
            field: "headSize",
            message: REQUIRED,
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Plain-text summary of an order.
pub fn summarize(order: &OrderRequest) -> String {
    let materials = order
        .materials
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Name: {}\nEmail: {}\nPhone: {}\nEvent Date: {}\nHat Type: {}\nHead Size: {}\nColours: {}\nMaterials: {}\nNotes: {}",
        order.name.trim(),
        order.email.trim(),
        order.phone.trim(),
        order.event_date.trim(),
        order.hat_type.trim(),
        optional(&order.head_size).unwrap_or("N/A"),
        optional(&order.colours).unwrap_or("N/A"),
        if materials.is_empty() { "N/A" } else { materials.as_str() },
        optional(&order.notes).unwrap_or("—"),
    )
}

/// Validate and build the `mailto:` draft addressed to `orders_address`.
pub fn compose_mailto(
    order: &OrderRequest,
    orders_address: &str,
) -> Result<OrderDraft, Vec<FieldError>> {
    validate(order)?;

    let summary = summarize(order);
    let body = format!("{summary}\n\n{PHOTO_FOLLOW_UP}");
    let mailto = format!(
        "mailto:{}?subject={}&body={}",
        orders_address,
        urlencoding::encode(ORDER_SUBJECT),
        urlencoding::encode(&body)
    );
    Ok(OrderDraft { summary, mailto })
}

/// Keep images up to 8 MB; everything else is rejected with a reason.
pub fn screen_reference_photos(photos: &[ReferencePhoto]) -> PhotoScreening {
    let mut screening = PhotoScreening::default();
    for photo in photos {
        let is_image = photo
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"));

        if !is_image {
            screening.rejected.push(RejectedPhoto {
                file_name: photo.file_name.clone(),
                reason: format!("{} is not an image.", photo.file_name),
            });
        } else if photo.size_bytes > MAX_REFERENCE_PHOTO_BYTES {
            screening.rejected.push(RejectedPhoto {
                file_name: photo.file_name.clone(),
                reason: format!("{} is larger than 8MB.", photo.file_name),
            });
        } else {
            screening.accepted.push(photo.file_name.clone());
        }
    }
    screening
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
