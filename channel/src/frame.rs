use serde::de::DeserializeOwned;
use tracing::debug;

/// An inbound text frame after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound<E> {
    Event(E),
    /// Well-formed JSON that is not a known envelope.
    Unknown(String),
    /// The frame was not JSON at all; forwarded untouched.
    Raw(String),
}

/// Decode one inbound frame. Neither malformed JSON ([`Inbound::Raw`]) nor an
/// unrecognised envelope ([`Inbound::Unknown`]) is an error.
pub fn decode_frame<E: DeserializeOwned>(text: &str) -> Inbound<E> {
    let value = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => value,
        Err(err) => {
            debug!("forwarding non-JSON frame as raw data: {err}");
            return Inbound::Raw(text.to_string());
        }
    };
    match serde_json::from_value::<E>(value) {
        Ok(event) => Inbound::Event(event),
        Err(err) => {
            debug!("unrecognised envelope: {err}");
            Inbound::Unknown(text.to_string())
        }
    }
}
