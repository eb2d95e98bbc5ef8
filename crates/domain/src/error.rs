//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HomieError`]
//! at port boundaries (adapters box their errors into
//! [`HomieError::Transport`], the registry into [`HomieError::Registry`]).

use crate::datatype::DataType;
use crate::state::DeviceState;

/// Top-level error for the Homie device core.
#[derive(Debug, thiserror::Error)]
pub enum HomieError {
    /// An identifier or builder field failed validation.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A node or property id is already taken by a sibling.
    #[error("duplicate id")]
    DuplicateId(#[from] DuplicateIdError),

    /// Attachment attempted after the device already announced its tree.
    #[error("late attachment")]
    LateAttachment(#[from] LateAttachmentError),

    /// A node or property lookup failed.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A locally pushed value does not fit the declared datatype.
    #[error("type mismatch")]
    TypeMismatch(#[from] TypeMismatchError),

    /// An inbound payload could not be decoded.
    #[error("invalid payload")]
    InvalidPayload(#[from] InvalidPayloadError),

    /// The device is not in an operational state.
    #[error("device not ready (state {state})")]
    NotReady { state: DeviceState },

    /// The requested lifecycle transition is not allowed.
    #[error("invalid state transition {from} -> {to}")]
    InvalidTransition { from: DeviceState, to: DeviceState },

    /// Node class registry failure (duplicate or unknown type tag).
    #[error("registry error")]
    Registry(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The transport rejected a submission.
    #[error("transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Field-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required name is missing or empty.
    #[error("name must not be empty")]
    EmptyName,

    /// An identifier is empty or contains characters outside `[a-z0-9-]`.
    #[error("invalid {kind} id {value:?}: only [a-z0-9-] allowed")]
    InvalidId { kind: &'static str, value: String },

    /// A required builder field was not provided.
    #[error("missing field {0}")]
    MissingField(&'static str),

    /// QoS level outside `0..=2`.
    #[error("invalid QoS level {0}")]
    InvalidQos(u8),

    /// The format string does not suit the datatype.
    #[error("invalid format {format:?} for datatype {datatype}")]
    InvalidFormat { datatype: DataType, format: String },
}

/// Two siblings share an id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} id {id:?} already exists")]
pub struct DuplicateIdError {
    /// Kind of the clashing item (`"Node"`, `"Property"`).
    pub entity: &'static str,
    pub id: String,
}

/// Attachment after the tree was announced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot attach {entity} {id:?}: device already announced")]
pub struct LateAttachmentError {
    pub entity: &'static str,
    pub id: String,
}

/// Lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id:?} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A value handed to a property does not match its declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected} value, got {actual}")]
pub struct TypeMismatchError {
    pub expected: DataType,
    /// Description of what was received (datatype or offending value).
    pub actual: String,
}

/// An inbound payload could not be decoded for a datatype.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot decode {payload:?} as {datatype}")]
pub struct InvalidPayloadError {
    pub datatype: DataType,
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_invalid_id() {
        let err = ValidationError::InvalidId {
            kind: "node",
            value: "Bad Id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid node id \"Bad Id\": only [a-z0-9-] allowed"
        );
    }

    #[test]
    fn should_convert_duplicate_id_into_homie_error() {
        let err: HomieError = DuplicateIdError {
            entity: "Node",
            id: "light".to_string(),
        }
        .into();
        assert!(matches!(err, HomieError::DuplicateId(_)));
    }

    #[test]
    fn should_display_not_ready_with_state() {
        let err = HomieError::NotReady {
            state: DeviceState::Init,
        };
        assert_eq!(err.to_string(), "device not ready (state init)");
    }

    #[test]
    fn should_display_invalid_payload() {
        let err = InvalidPayloadError {
            datatype: DataType::Boolean,
            payload: "not-a-bool".to_string(),
        };
        assert_eq!(err.to_string(), "cannot decode \"not-a-bool\" as boolean");
    }
}
