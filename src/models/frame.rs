use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame payload is not a base64 data URI")]
    NotADataUri,
    #[error("frame payload declares no media type")]
    MissingMediaType,
    #[error("frame payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// One encoded camera frame with its declared media type.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl Frame {
    pub fn new(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URI, the format the capture
    /// client submits.
    pub fn from_data_uri(uri: &str) -> Result<Self, FrameError> {
        let rest = uri.strip_prefix("data:").ok_or(FrameError::NotADataUri)?;
        let (header, payload) = rest.split_once(',').ok_or(FrameError::NotADataUri)?;
        let media_type = header.strip_suffix(";base64").ok_or(FrameError::NotADataUri)?;
        if media_type.is_empty() {
            return Err(FrameError::MissingMediaType);
        }

        Ok(Self {
            media_type: media_type.to_string(),
            bytes: BASE64.decode(payload)?,
        })
    }

    /// Re-encode for transport to the vision model.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, BASE64.encode(&self.bytes))
    }
}
