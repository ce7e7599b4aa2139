//! Bincode envelope codec.

use crate::domain::envelope::{Request, Response};
use crate::domain::error::CodecError;
use crate::ports::outbound::EnvelopeCodec;
use bincode::Options;

/// Largest frame the codec will decode.
pub const MAX_FRAME_LEN: u64 = 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_FRAME_LEN)
}

/// Bincode serialization of [`Request`] and [`Response`].
///
/// The client-side helpers (`encode_request`, `decode_response`) use the
/// same options so both ends agree on the layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl BincodeCodec {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CodecError> {
        options()
            .serialize(request)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn decode_response(&self, frame: &[u8]) -> Result<Response, CodecError> {
        options()
            .deserialize(frame)
            .map_err(|e| CodecError::Decode(e.to_string()))
    }
}

impl EnvelopeCodec for BincodeCodec {
    fn decode(&self, frame: &[u8]) -> Result<Request, CodecError> {
        options()
            .deserialize(frame)
            .map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn encode(&self, response: &Response) -> Result<Vec<u8>, CodecError> {
        options()
            .serialize(response)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }
}
