//! Gallery handlers: list processed images.
//!
//! A store failure degrades to an empty list plus an error indicator rather
//! than failing the whole request.

use std::sync::Arc;

use axum::{extract::State, response::Html, Json};
use graymill_core::Namespace;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn load_gallery(state: &AppState) -> GalleryResponse {
    match state.storage.list(Namespace::Processed).await {
        Ok(listings) => GalleryResponse {
            images: listings.into_iter().map(|l| l.url).collect(),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list processed images");
            GalleryResponse {
                images: Vec::new(),
                error: Some("Failed to load images".to_string()),
            }
        }
    }
}

/// List all processed image URLs.
#[tracing::instrument(skip(state), fields(operation = "list_gallery"))]
pub async fn list_gallery(State(state): State<Arc<AppState>>) -> Json<GalleryResponse> {
    Json(load_gallery(&state).await)
}

/// Human-facing gallery page.
pub async fn gallery_view(State(state): State<Arc<AppState>>) -> Html<String> {
    let gallery = load_gallery(&state).await;

    let body = if let Some(error) = gallery.error {
        format!("<p>{}</p>", error)
    } else if gallery.images.is_empty() {
        "<p>No processed images yet.</p>".to_string()
    } else {
        gallery
            .images
            .iter()
            .map(|url| format!("<img src=\"{}\" alt=\"processed image\" width=\"240\" />", url))
            .collect::<Vec<_>>()
            .join("\n  ")
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Graymill Gallery</title></head>
<body>
  <h1>Processed images</h1>
  {}
  <p><a href="/">Upload another</a></p>
</body>
</html>
"#,
        body
    ))
}
