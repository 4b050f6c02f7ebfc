// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error handling facilities for the conveyor control plane

use crate::api::external::ResourceType;
use serde::Deserialize;
use serde::Serialize;

/// An error that can be generated within a control plane component
///
/// These may be generated while handling a client request or as part of
/// background operation.  When generated as part of a request, an `Error`
/// will be converted into a transport-level error as one of the last steps
/// in processing the request.
///
/// General best practices for error design apply here.  Where possible, we
/// want to reuse existing variants rather than inventing new ones to
/// distinguish cases that no programmatic consumer needs to distinguish.
#[derive(Clone, Debug, Deserialize, thiserror::Error, PartialEq, Serialize)]
pub enum Error {
    /// An object needed as part of this operation was not found.
    #[error("Object (of type {type_name:?}) not found: {lookup_type:?}")]
    ObjectNotFound { type_name: ResourceType, lookup_type: LookupType },
    /// The request was well-formed, but the operation cannot be completed
    /// given the current state of the system.
    #[error("Invalid Request: {message}")]
    InvalidRequest { message: String },
    /// The request is not authorized to perform the requested operation.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },
    /// The system encountered an unhandled operational error.
    #[error("Internal Error: {internal_message}")]
    InternalError { internal_message: String },
    /// The system (or part of it) is unavailable.
    #[error("Service Unavailable: {internal_message}")]
    ServiceUnavailable { internal_message: String },
}

/// Indicates how an object was looked up (for an `ObjectNotFound` error)
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum LookupType {
    /// a specific resource code was requested
    ByCode(String),
    /// a specific name was requested
    ByName(String),
}

impl LookupType {
    /// Returns an ObjectNotFound error appropriate for the case where this
    /// lookup failed
    pub fn into_not_found(self, type_name: ResourceType) -> Error {
        Error::ObjectNotFound { type_name, lookup_type: self }
    }
}

impl Error {
    /// Returns whether the error is likely transient and could reasonably be
    /// retried
    pub fn retryable(&self) -> bool {
        match self {
            Error::ServiceUnavailable { .. } => true,

            Error::ObjectNotFound { .. }
            | Error::InvalidRequest { .. }
            | Error::Forbidden { .. }
            | Error::InternalError { .. } => false,
        }
    }

    /// Generates an [`Error::ObjectNotFound`] error for a lookup by resource
    /// code.
    pub fn not_found_by_code(type_name: ResourceType, code: &str) -> Error {
        LookupType::ByCode(code.to_owned()).into_not_found(type_name)
    }

    /// Generates an [`Error::Forbidden`] error with the specific message
    ///
    /// This is used when the acting user lacks the authority to carry out
    /// the requested operation.  The message should say which grant is
    /// missing so that the caller can surface something actionable.
    pub fn forbidden(message: &str) -> Error {
        Error::Forbidden { message: message.to_owned() }
    }

    /// Generates an [`Error::InternalError`] error with the specific message
    ///
    /// InternalError should be used for operational conditions that should
    /// not happen but that we cannot reasonably handle at runtime (e.g.,
    /// deserializing a value from the database, or finding two records for
    /// something that is supposed to be unique).
    pub fn internal_error(internal_message: &str) -> Error {
        Error::InternalError { internal_message: internal_message.to_owned() }
    }

    /// Generates an [`Error::InvalidRequest`] error with the specific message
    ///
    /// This should be used for failures due possibly to invalid client input
    /// or malformed requests.
    pub fn invalid_request(message: &str) -> Error {
        Error::InvalidRequest { message: message.to_owned() }
    }

    /// Generates an [`Error::ServiceUnavailable`] error with the specific
    /// message
    ///
    /// This should be used for transient failures where the caller might be
    /// expected to retry.  Logic errors or other problems that are unlikely
    /// to be fixed by retrying should use `internal_error()` instead.
    pub fn unavail(message: &str) -> Error {
        Error::ServiceUnavailable { internal_message: message.to_owned() }
    }
}

#[cfg(test)]
mod test {
    use super::Error;
    use super::LookupType;
    use crate::api::external::ResourceType;

    #[test]
    fn test_lookup_into_not_found() {
        let error = LookupType::ByCode(String::from("p-8a1f"))
            .into_not_found(ResourceType::Pipeline);
        assert_eq!(
            error,
            Error::not_found_by_code(ResourceType::Pipeline, "p-8a1f")
        );
        assert!(!error.retryable());
    }

    #[test]
    fn test_retryable() {
        assert!(Error::unavail("IAM backend is restarting").retryable());
        assert!(!Error::forbidden("need manage permission").retryable());
        assert!(!Error::internal_error("two records for one key").retryable());
    }
}
