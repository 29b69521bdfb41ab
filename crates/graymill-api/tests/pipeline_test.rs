//! HTTP-level integration tests for the upload and gallery surfaces, plus
//! the full produce-then-consume pipeline over local storage and the
//! in-memory queue.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use graymill_api::{build_router, AppState};
use graymill_core::{Config, FailurePolicy, Namespace, ProcessImageMessage};
use graymill_queue::{InMemoryQueue, QueueService};
use graymill_storage::{BlobStore, LocalBlobStore};
use graymill_worker::{ImageWorker, Outcome, WorkerConfig};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

struct TestApp {
    server: TestServer,
    storage: Arc<LocalBlobStore>,
    queue: Arc<InMemoryQueue>,
    state: Arc<AppState>,
    dir: tempfile::TempDir,
}

async fn setup_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_tests(dir.path().to_string_lossy().to_string());

    let storage = Arc::new(
        LocalBlobStore::new(
            dir.path(),
            config.local_storage_base_url.clone().unwrap(),
            config.raw_namespace.clone(),
            config.processed_namespace.clone(),
        )
        .await
        .unwrap(),
    );
    let queue = Arc::new(InMemoryQueue::new());

    let state = Arc::new(AppState::new(config, storage.clone(), queue.clone()));
    let server = TestServer::new(build_router(state.clone())).unwrap();

    TestApp {
        server,
        storage,
        queue,
        state,
        dir,
    }
}

fn sample_image(format: ImageFormat) -> Vec<u8> {
    let mut img = RgbImage::new(16, 16);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = Rgb([(x * 15) as u8, (y * 15) as u8, 120]);
    }
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), format)
        .unwrap();
    buffer
}

fn image_form(filename: &str, data: Vec<u8>, mime: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "image",
        Part::bytes(data).file_name(filename).mime_type(mime),
    )
}

#[tokio::test]
async fn test_upload_without_file_is_client_error() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post("/upload")
        .multipart(MultipartForm::new().add_text("note", "no file here"))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Please select an image to upload."));

    // A client error creates no object and no message.
    assert!(app.storage.list(Namespace::Raw).await.unwrap().is_empty());
    assert_eq!(app.queue.ready_len(), 0);
}

#[tokio::test]
async fn test_upload_empty_file_is_client_error() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post("/upload")
        .multipart(image_form("cat.jpg", Vec::new(), "image/jpeg"))
        .await;

    assert_eq!(response.status_code(), 400);
    assert!(app.storage.list(Namespace::Raw).await.unwrap().is_empty());
    assert_eq!(app.queue.ready_len(), 0);
}

#[tokio::test]
async fn test_upload_writes_raw_before_message_is_observable() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post("/upload")
        .multipart(image_form("cat.jpg", sample_image(ImageFormat::Jpeg), "image/jpeg"))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: serde_json::Value = response.json();
    let guid = body["image_guid"].as_str().unwrap().to_string();
    let predicted = body["processed_image_url"].as_str().unwrap().to_string();

    // The message is observable and well-formed.
    let deliveries = app.queue.receive(1, Duration::ZERO).await.unwrap();
    assert_eq!(deliveries.len(), 1);
    let message = ProcessImageMessage::parse(&deliveries[0].payload).unwrap();
    assert_eq!(message.image_guid, guid);
    assert!(!message.raw_image_url.is_empty());

    // And the raw object it references already exists.
    let key = format!("{}.jpg", guid);
    assert!(app.storage.exists(Namespace::Raw, &key).await.unwrap());
    assert!(message.raw_image_url.ends_with(&key));

    // The predicted processed address matches the canonical key scheme.
    assert_eq!(predicted, app.storage.url_for(Namespace::Processed, &key));
    assert!(!app.storage.exists(Namespace::Processed, &key).await.unwrap());
}

#[tokio::test]
async fn test_upload_preserves_missing_extension() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post("/upload")
        .multipart(image_form("noextension", sample_image(ImageFormat::Png), "image/png"))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: serde_json::Value = response.json();
    let guid = body["image_guid"].as_str().unwrap();

    // Key is the bare guid.
    assert!(app.storage.exists(Namespace::Raw, guid).await.unwrap());
}

#[tokio::test]
async fn test_full_pipeline_upload_process_gallery() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post("/upload")
        .multipart(image_form("cat.png", sample_image(ImageFormat::Png), "image/png"))
        .await;
    assert_eq!(response.status_code(), 201);
    let body: serde_json::Value = response.json();
    let predicted = body["processed_image_url"].as_str().unwrap().to_string();

    // Consume the message the way the worker binary does.
    let worker = ImageWorker::new(
        app.storage.clone(),
        app.queue.clone(),
        WorkerConfig {
            failure_policy: FailurePolicy::DropOnFailure,
            ..WorkerConfig::default()
        },
    );
    let deliveries = app.queue.receive(1, Duration::ZERO).await.unwrap();
    assert_eq!(worker.handle_delivery(&deliveries[0]).await, Outcome::Processed);

    // The gallery now lists exactly the predicted URL.
    let gallery = app.server.get("/gallery").await;
    assert_eq!(gallery.status_code(), 200);
    let gallery: serde_json::Value = gallery.json();
    let images = gallery["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].as_str().unwrap(), predicted);

    // Redelivery after success is a no-op besides acknowledging.
    let message = ProcessImageMessage {
        image_guid: body["image_guid"].as_str().unwrap().to_string(),
        raw_image_url: body["raw_image_url"].as_str().unwrap().to_string(),
    };
    app.queue
        .send(bytes::Bytes::from(message.to_bytes()))
        .await
        .unwrap();
    let redelivery = app.queue.receive(1, Duration::ZERO).await.unwrap();
    assert_eq!(
        worker.handle_delivery(&redelivery[0]).await,
        Outcome::AlreadyProcessed
    );
}

#[tokio::test]
async fn test_gallery_empty() {
    let app = setup_test_app().await;

    let response = app.server.get("/gallery").await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["images"].as_array().unwrap().len(), 0);
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_gallery_storage_failure_degrades_gracefully() {
    let app = setup_test_app().await;

    // Break the processed namespace out from under the store.
    std::fs::remove_dir_all(app.dir.path().join(&app.state.config.processed_namespace)).unwrap();

    let response = app.server.get("/gallery").await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["images"].as_array().unwrap().len(), 0);
    assert_eq!(body["error"].as_str().unwrap(), "Failed to load images");
}

#[tokio::test]
async fn test_gallery_view_renders_images() {
    let app = setup_test_app().await;

    app.storage
        .put(Namespace::Processed, "abc.png", b"fake".to_vec(), "image/png")
        .await
        .unwrap();

    let response = app.server.get("/gallery/view").await;
    assert_eq!(response.status_code(), 200);
    let html = response.text();
    assert!(html.contains("abc.png"));
    assert!(html.contains("<img"));
}

#[tokio::test]
async fn test_upload_form_served() {
    let app = setup_test_app().await;

    let response = app.server.get("/").await;
    assert_eq!(response.status_code(), 200);
    assert!(response.text().contains("multipart/form-data"));
}

#[tokio::test]
async fn test_health() {
    let app = setup_test_app().await;

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
}
