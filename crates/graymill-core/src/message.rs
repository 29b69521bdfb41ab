//! The wire contract between the upload producer and the processing worker.
//!
//! One JSON message per upload: `{ "ImageGuid": "...", "RawImageUrl": "..." }`,
//! UTF-8 encoded. The queue delivers at-least-once, so the same message may
//! reach the worker multiple times; the payload itself carries no delivery
//! metadata.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while parsing or validating a queue message.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Malformed message payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Message is missing required field: {0}")]
    MissingField(&'static str),
}

/// Processing request flowing producer -> queue -> worker.
///
/// Field names are fixed by the wire format and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessImageMessage {
    #[serde(rename = "ImageGuid")]
    pub image_guid: String,

    #[serde(rename = "RawImageUrl")]
    pub raw_image_url: String,
}

impl ProcessImageMessage {
    pub fn new(image_guid: &Uuid, raw_image_url: impl Into<String>) -> Self {
        Self {
            image_guid: image_guid.to_string(),
            raw_image_url: raw_image_url.into(),
        }
    }

    /// Both fields are required and non-empty. A message failing validation
    /// can never become valid on redelivery, so the worker drops it
    /// terminally.
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.image_guid.is_empty() {
            return Err(MessageError::MissingField("ImageGuid"));
        }
        if self.raw_image_url.is_empty() {
            return Err(MessageError::MissingField("RawImageUrl"));
        }
        Ok(())
    }

    /// Deserialize and validate a raw queue payload.
    pub fn parse(payload: &[u8]) -> Result<Self, MessageError> {
        let message: Self = serde_json::from_slice(payload)?;
        message.validate()?;
        Ok(message)
    }

    /// Serialize for the queue. Serialization of this struct cannot fail.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_exact_wire_field_names() {
        let guid = Uuid::new_v4();
        let message = ProcessImageMessage::new(&guid, "http://host/raw/a.jpg");
        let json = String::from_utf8(message.to_bytes()).unwrap();

        assert!(json.contains("\"ImageGuid\""));
        assert!(json.contains("\"RawImageUrl\""));

        let parsed = ProcessImageMessage::parse(json.as_bytes()).unwrap();
        assert_eq!(parsed, message);
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            ProcessImageMessage::parse(b"not json"),
            Err(MessageError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(matches!(
            ProcessImageMessage::parse(br#"{"ImageGuid":"abc"}"#),
            Err(MessageError::Malformed(_))
        ));
        assert!(matches!(
            ProcessImageMessage::parse(br#"{"ImageGuid":"","RawImageUrl":"http://x/y.png"}"#),
            Err(MessageError::MissingField("ImageGuid"))
        ));
        assert!(matches!(
            ProcessImageMessage::parse(br#"{"ImageGuid":"abc","RawImageUrl":""}"#),
            Err(MessageError::MissingField("RawImageUrl"))
        ));
    }
}
