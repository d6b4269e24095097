//! Message validation rules.

use orkut_core::error::AppError;

/// Maximum allowed message size in bytes.
const MAX_MESSAGE_SIZE: usize = 65_536;

/// Validates an inbound message.
pub fn validate_inbound(raw: &str) -> Result<(), AppError> {
    if raw.len() > MAX_MESSAGE_SIZE {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {MAX_MESSAGE_SIZE} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates topic name format.
pub fn validate_topic(topic: &str) -> Result<(), AppError> {
    if topic.is_empty() || topic.len() > 256 {
        return Err(AppError::validation("Invalid topic name length"));
    }

    if !topic
        .chars()
        .all(|c| c.is_alphanumeric() || c == ':' || c == '-' || c == '_')
    {
        return Err(AppError::validation("Topic name contains invalid characters"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        assert!(validate_topic("user_presence").is_ok());
        assert!(validate_topic("audio-call-room_1").is_ok());
        assert!(validate_topic("").is_err());
        assert!(validate_topic("bad topic").is_err());
    }

    #[test]
    fn test_empty_message_rejected() {
        assert!(validate_inbound("   ").is_err());
        assert!(validate_inbound(r#"{"type":"heartbeat"}"#).is_ok());
    }
}
