//! Upload handler: the producer side of the pipeline.
//!
//! Ordering invariant: the raw object write must be acknowledged by the
//! blob store before the message is sent, because the worker reads the raw
//! object immediately on delivery. If the queue send fails, the raw object
//! stays behind as an orphan and the caller gets a recoverable error; there
//! is no rollback.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Html,
    Json,
};
use bytes::Bytes;
use graymill_core::{file_extension, guess_content_type, object_key, AppError, Namespace, ProcessImageMessage};
use serde::Serialize;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub image_guid: Uuid,
    pub raw_image_url: String,
    /// Predicted address; the object appears there once the worker has run.
    pub processed_image_url: String,
}

struct UploadedFile {
    filename: String,
    data: Bytes,
}

/// Pull the image file out of the multipart form. Returns `None` when no
/// file part with content is present, which is a client error upstream.
async fn extract_image(multipart: &mut Multipart) -> Result<Option<UploadedFile>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart request: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {}", e)))?;
        if data.is_empty() {
            return Ok(None);
        }
        return Ok(Some(UploadedFile { filename, data }));
    }
    Ok(None)
}

/// Upload an image and enqueue its processing request.
///
/// Returns HTTP 201 with the raw URL and the predicted processed URL. The
/// caller is expected to poll the gallery; there is no synchronous wait for
/// processing.
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), HttpAppError> {
    let Some(file) = extract_image(&mut multipart).await? else {
        return Err(AppError::InvalidInput("Please select an image to upload.".to_string()).into());
    };

    if file.data.len() > state.config.max_file_size_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "Image exceeds the {} byte limit",
            state.config.max_file_size_bytes
        ))
        .into());
    }

    let image_guid = Uuid::new_v4();
    let extension = file_extension(&file.filename);
    let key = object_key(&image_guid, extension);

    // Step 1: persist the raw object. Must be durable before the message
    // exists anywhere.
    let raw_image_url = state
        .storage
        .put(
            Namespace::Raw,
            &key,
            file.data.to_vec(),
            guess_content_type(extension),
        )
        .await?;

    // Step 2: publish the processing request.
    let message = ProcessImageMessage::new(&image_guid, raw_image_url.clone());
    state
        .queue
        .send(Bytes::from(message.to_bytes()))
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                image_guid = %image_guid,
                "Failed to enqueue processing request; raw object orphaned"
            );
            AppError::Queue(format!("Error uploading image: {}", e))
        })?;

    let processed_image_url = state.storage.url_for(Namespace::Processed, &key);

    tracing::info!(
        image_guid = %image_guid,
        key = %key,
        size_bytes = file.data.len(),
        "Image uploaded and processing request enqueued"
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            image_guid,
            raw_image_url,
            processed_image_url,
        }),
    ))
}

/// Minimal upload form, the human-facing entry point.
pub async fn upload_form() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>Graymill</title></head>
<body>
  <h1>Upload an image</h1>
  <form action="/upload" method="post" enctype="multipart/form-data">
    <input type="file" name="image" accept="image/*" />
    <button type="submit">Upload</button>
  </form>
  <p><a href="/gallery/view">Gallery</a></p>
</body>
</html>
"#,
    )
}
