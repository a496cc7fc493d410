//! Decoder for the reply envelope
//!
//! The assistant's text and follow-up prompts travel in a response header as
//! base64-encoded JSON, `{ "response": { "text": ..., "nextPrompts": [...] } }`.
//! The body holds audio and is never looked at here, and neither is the
//! status code.

use crate::error::ChatError;
use crate::transport::RawReply;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};

/// Header carrying the encoded reply
pub const TEXT_RESPONSE_HEADER: &str = "X-Text-Response";

/// Header names are stored lowercase
static TEXT_RESPONSE_HEADER_KEY: HeaderName = HeaderName::from_static("x-text-response");

/// Standard alphabet; padding may be present or not
const HEADER_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded assistant turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub text: String,
    /// Replaces the current suggestion set
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    response: EnvelopeResponse,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeResponse {
    text: String,
    next_prompts: Vec<String>,
}

/// Decode the reply carried by `reply`'s headers.
///
/// `Ok(None)` means the header is absent (or blank): the turn produced no
/// assistant message, which is a normal outcome.
pub fn decode(reply: &RawReply) -> Result<Option<AssistantReply>, ChatError> {
    let Some(value) = reply.headers.get(&TEXT_RESPONSE_HEADER_KEY) else {
        return Ok(None);
    };

    let encoded = value.to_str().map_err(|_| {
        ChatError::malformed_encoding(format!("{TEXT_RESPONSE_HEADER} is not visible ASCII"))
    })?;

    decode_header_value(encoded)
}

/// Decode a raw header value
pub fn decode_header_value(encoded: &str) -> Result<Option<AssistantReply>, ChatError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Ok(None);
    }

    let bytes = HEADER_ENGINE.decode(compact.as_bytes()).map_err(|e| {
        ChatError::malformed_encoding(format!("{TEXT_RESPONSE_HEADER} is not base64: {e}"))
    })?;

    let envelope: Envelope = serde_json::from_slice(&bytes).map_err(|e| {
        ChatError::malformed_payload(format!("{TEXT_RESPONSE_HEADER} is not a reply document: {e}"))
    })?;

    Ok(Some(AssistantReply {
        text: envelope.response.text,
        suggestions: envelope.response.next_prompts,
    }))
}

/// Produce the header value the service would send for `reply`
pub fn encode_header_value(reply: &AssistantReply) -> String {
    let envelope = Envelope {
        response: EnvelopeResponse {
            text: reply.text.clone(),
            next_prompts: reply.suggestions.clone(),
        },
    };
    // Serializing plain strings cannot fail
    let json = serde_json::to_vec(&envelope).unwrap_or_default();
    base64::engine::general_purpose::STANDARD.encode(json)
}
