//! Canonical object-key derivation shared by producer and worker.
//!
//! The upload handler and the processing worker address blobs independently,
//! so key construction is centralized here: `{guid}{extension}` inside one of
//! the two logical namespaces. The extension is taken verbatim from the
//! uploaded filename (case preserved, possibly empty) and carried through to
//! the processed object unchanged.

/// The two logical blob-store areas of the pipeline.
///
/// `Processed` doubles as the idempotence marker for the worker: an object
/// existing under the processed key is proof that the job already completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Raw,
    Processed,
}

/// Build the object key for an image identity: `{guid}{extension}`.
///
/// The same key is used in the raw and processed namespaces; only the
/// namespace differs. Accepts a `Uuid` on the producer side and the guid
/// string carried by the message on the worker side.
pub fn object_key(guid: impl std::fmt::Display, extension: &str) -> String {
    format!("{}{}", guid, extension)
}

/// Extract the extension from a filename, including the leading dot.
///
/// Returns the empty string when the filename has no extension or ends with a
/// dot. Case is preserved; the value is never normalized because the
/// processed key must match the raw key byte for byte.
pub fn file_extension(filename: &str) -> &str {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[idx..],
        _ => "",
    }
}

/// Extension of the trailing path segment of an object URL.
///
/// The worker derives the processed key from the message's raw image URL,
/// whose trailing segment is the raw object key the producer built with
/// [`object_key`]. Both sides therefore resolve to the same extension.
pub fn extension_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    file_extension(path.rsplit('/').next().unwrap_or(path))
}

/// Best-effort content type for a file extension.
///
/// Blob stores want a content type at upload time; unknown extensions fall
/// back to `application/octet-stream`.
pub fn guess_content_type(extension: &str) -> &'static str {
    match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
