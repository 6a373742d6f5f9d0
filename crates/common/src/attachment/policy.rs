use serde::{Deserialize, Serialize};

/// Default attachment ceiling, 10 MiB
pub const DEFAULT_MAX_ATTACHMENT_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("only images can be attached, got {0}")]
    NotAnImage(String),
    #[error("attachment is {size} bytes, the limit is {max}")]
    TooLarge { size: u64, max: u64 },
}

/// What may be attached to a trade chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPolicy {
    pub max_size: u64,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_ATTACHMENT_SIZE,
        }
    }
}

impl AttachmentPolicy {
    pub fn check(&self, size: u64, mime_type: &str) -> Result<(), PolicyError> {
        let is_image = mime_type
            .parse::<mime::Mime>()
            .map(|m| m.type_() == mime::IMAGE)
            .unwrap_or(false);
        if !is_image {
            return Err(PolicyError::NotAnImage(mime_type.to_string()));
        }
        if size > self.max_size {
            return Err(PolicyError::TooLarge {
                size,
                max: self.max_size,
            });
        }
        Ok(())
    }
}
