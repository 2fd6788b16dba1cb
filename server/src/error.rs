//! Error taxonomy for the server.
//!
//! Validation and command errors are reported back to the connection that
//! sent the command and never touch the world. Transport errors tear down the
//! one connection they occurred on. Only a bind failure stops the process.

use std::io;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid command type is unset")]
    MissingType,

    #[error("unknown command type: {0}")]
    UnknownType(String),

    #[error("command is missing character_id")]
    MissingCharacterId,

    #[error("malformed command: {0}")]
    Malformed(String),

    #[error("invalid {kind} data: {reason}")]
    InvalidPayload { kind: &'static str, reason: String },

    #[error("mage attack requires 'target_id'")]
    MissingTarget,

    #[error("character {0} cannot target itself")]
    SelfTarget(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("character {0} not found")]
    NotFound(String),

    #[error("character {0} is dead and cannot act")]
    Dead(String),

    #[error("character {0} already exists in the world")]
    AlreadyExists(String),

    #[error("target {0} not found or dead")]
    TargetUnavailable(String),

    #[error("target {target} is too far ({distance:.1}) for radius {radius:.1}")]
    OutOfRange {
        target: String,
        distance: f32,
        radius: f32,
    },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("undecodable frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("frame exceeds {limit} bytes")]
    FrameTooLong { limit: usize },

    #[error("outbound writes stalled")]
    WriteStalled,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_converts_into_command_error() {
        let err: CommandError = ValidationError::MissingType.into();
        assert_eq!(err, CommandError::Validation(ValidationError::MissingType));
        assert_eq!(err.to_string(), "invalid command type is unset");
    }

    #[test]
    fn test_out_of_range_message() {
        let err = CommandError::OutOfRange {
            target: "b".to_string(),
            distance: 42.3,
            radius: 20.0,
        };
        assert_eq!(err.to_string(), "target b is too far (42.3) for radius 20.0");
    }

    #[test]
    fn test_bind_error_names_address() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:1".to_string(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "failed to bind 127.0.0.1:1: in use");
    }

    #[test]
    fn test_decode_error_wraps_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = TransportError::from(serde_err);
        assert!(err.to_string().starts_with("undecodable frame"));
    }
}
