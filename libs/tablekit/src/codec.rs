use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Serialization failure inside a content codec.
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct CodecError(pub String);

/// Text envelope for serialized-content fields.
///
/// A codec turns a member value into text and back; the mapping engine
/// treats the text as opaque. Pluggable per content mapper instance.
pub trait ContentCodec: Send + Sync + 'static {
    /// # Errors
    /// Returns `CodecError` when the value cannot be serialized.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, CodecError>;

    /// # Errors
    /// Returns `CodecError` when the text is malformed for `T`.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, CodecError>;
}

/// Default codec: JSON via `serde_json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl ContentCodec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(|e| CodecError(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, CodecError> {
        serde_json::from_str(text).map_err(|e| CodecError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Payload {
        name: String,
        count: u32,
    }

    #[test]
    fn json_round_trip() {
        let value = Payload {
            name: "widget".to_owned(),
            count: 3,
        };
        let text = JsonCodec.encode(&value).unwrap();
        let back: Payload = JsonCodec.decode(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn malformed_text_is_an_error() {
        let err = JsonCodec.decode::<Payload>("{not json").unwrap_err();
        assert!(!err.0.is_empty());
    }
}
