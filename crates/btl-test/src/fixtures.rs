//! Test fixtures for common types.

use std::sync::Arc;

use serde_json::{Value, json};

use btl_crypto::LinkSecret;
use btl_gateway::{
    FieldKind, FieldSchema, GatewayResult, GenerationRequest, GenerationSpec, ResultSchema,
};
use btl_store::{KeyStore, MemoryBackend};

/// Fixed 32-byte link secret, hex-encoded.
pub const TEST_SECRET_HEX: &str =
    "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// A deterministic link secret.
///
/// # Panics
///
/// Never in practice; the constant is valid.
#[must_use]
pub fn test_secret() -> LinkSecret {
    LinkSecret::from_hex(TEST_SECRET_HEX).expect("fixture secret is valid")
}

/// A second secret, distinct from [`test_secret`].
///
/// # Panics
///
/// Never in practice; the bytes are long enough.
#[must_use]
pub fn other_secret() -> LinkSecret {
    LinkSecret::from_bytes(&[0x42; 32]).expect("fixture secret is valid")
}

/// A key store on a fresh in-memory backend.
#[must_use]
pub fn memory_store() -> KeyStore {
    KeyStore::new(Arc::new(MemoryBackend::new()))
}

/// Schema for a chapter title card: `title` (string), `mood` (enum), and
/// optional `pages` (integer). No other fields.
#[must_use]
pub fn title_schema() -> ResultSchema {
    ResultSchema::new()
        .field("title", FieldSchema::required(FieldKind::String))
        .field(
            "mood",
            FieldSchema::required(FieldKind::Enum {
                values: vec!["calm".into(), "tense".into(), "joyful".into()],
            }),
        )
        .field("pages", FieldSchema::optional(FieldKind::Integer))
        .deny_additional_fields()
}

/// Fallback matching [`title_schema`].
#[must_use]
pub fn title_fallback() -> Value {
    json!({"title": "Untitled", "mood": "calm"})
}

/// A valid output for [`title_schema`].
#[must_use]
pub fn title_output() -> Value {
    json!({"title": "The Harbour", "mood": "tense", "pages": 12})
}

/// A plain generation request.
#[must_use]
pub fn test_request() -> GenerationRequest {
    GenerationRequest::new(
        "You write chapter title cards.",
        "The crew reaches the harbour at dawn.",
    )
}

/// [`test_request`] with [`title_schema`] and [`title_fallback`].
///
/// # Errors
///
/// Never in practice; the fixtures are consistent.
pub fn title_spec() -> GatewayResult<GenerationSpec> {
    GenerationSpec::new(test_request(), title_schema(), title_fallback())
}
