//! Call-level enums shared by the HTTP fallback and the signaling engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Media kind of a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    /// Microphone only.
    #[default]
    Audio,
    /// Microphone and camera.
    Video,
}

impl CallType {
    /// Converts to the wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Whether the call captures camera frames.
    pub fn has_video(&self) -> bool {
        matches!(self, Self::Video)
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(AppError::validation(format!("Unknown call type: {other}"))),
        }
    }
}

/// Callee response to an incoming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallAction {
    /// Callee picked up.
    Accept,
    /// Callee declined.
    Reject,
}

impl CallAction {
    /// Converts to the wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for CallAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            other => Err(AppError::validation(format!("Unknown call action: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_type_parse() {
        assert_eq!("video".parse::<CallType>().unwrap(), CallType::Video);
        assert!("screen".parse::<CallType>().is_err());
    }

    #[test]
    fn test_call_action_serde() {
        let action: CallAction = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(action, CallAction::Reject);
        assert_eq!(serde_json::to_string(&CallAction::Accept).unwrap(), "\"accept\"");
    }
}
