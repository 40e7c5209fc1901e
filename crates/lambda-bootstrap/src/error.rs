// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for the bootstrap.
//!
//! [`LambdaEnvironmentTainted`] is the one fault the invocation loop treats as a
//! reason to terminate the process. Everything else surfaces through
//! [`RuntimeError`] to whoever called the loop.

use std::backtrace::Backtrace;

use serde_json::{Map, Value};
use thiserror::Error;

/// Boxed error returned by handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The execution environment can no longer be trusted.
///
/// Raised when talking to the runtime API fails in a way that leaves no sane
/// way to continue: connection setup failing, a non-2xx answer, a missing
/// request id. Carries every diagnostic gathered up to that point.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LambdaEnvironmentTainted {
    message: String,
    stack_trace: String,
    details: Vec<(String, Value)>,
}

impl LambdaEnvironmentTainted {
    /// Create a fault with the given diagnostic details.
    pub fn new<K, V>(message: impl Into<String>, details: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            message: message.into(),
            stack_trace: Backtrace::force_capture().to_string(),
            details: details
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack_trace(&self) -> &str {
        &self.stack_trace
    }

    /// Look up a single diagnostic detail by key.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Diagnostic details in the order they were gathered.
    pub fn details(&self) -> &[(String, Value)] {
        &self.details
    }

    /// The full record emitted to the log sink on termination.
    ///
    /// `message` and `stackTrace` come first; gathered details are merged in
    /// afterwards and win on key collisions, matching the order they were
    /// recorded in.
    pub fn error_details(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("message".to_string(), Value::String(self.message.clone()));
        map.insert(
            "stackTrace".to_string(),
            Value::String(self.stack_trace.clone()),
        );
        for (key, value) in &self.details {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

/// JSON encoding and decoding errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload is not valid JSON.
    #[error("malformed JSON payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A response map could not be encoded.
    #[error("could not encode JSON payload: {0}")]
    Marshal(#[source] serde_json::Error),

    /// The payload is valid JSON but not an object.
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
}

/// Faults that end the invocation loop.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime API misbehaved; the loop logs this and exits with status 1.
    #[error("lambda environment tainted: {0}")]
    EnvironmentTainted(#[from] LambdaEnvironmentTainted),

    /// The event or response could not be converted. Not handled by the loop.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The handler failed. Not handled by the loop.
    #[error("handler error: {0}")]
    Handler(#[source] HandlerError),

    /// The loop could not be configured.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_details_start_with_message_and_stack_trace() {
        let fault = LambdaEnvironmentTainted::new(
            "Error executing http call",
            [("ReadResponseCode.responseCode", "500")],
        );

        let details = fault.error_details();
        assert_eq!(details["message"], "Error executing http call");
        assert!(details.contains_key("stackTrace"));
        assert_eq!(details["ReadResponseCode.responseCode"], "500");
    }

    #[test]
    fn test_details_keep_insertion_order() {
        let fault = LambdaEnvironmentTainted::new("boom", [("b", "1"), ("a", "2"), ("c", "3")]);

        let keys: Vec<&str> = fault.details().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(fault.detail("a"), Some(&Value::from("2")));
        assert_eq!(fault.detail("missing"), None);
    }

    #[test]
    fn test_marshal_error_is_not_reported_as_malformed() {
        let json_error = serde_json::from_str::<Value>("{").unwrap_err();
        let error = CodecError::Marshal(json_error);

        assert!(error.to_string().starts_with("could not encode JSON payload: "));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_runtime_error_from_tainted() {
        let fault = LambdaEnvironmentTainted::new("tainted", Vec::<(String, Value)>::new());
        let error: RuntimeError = fault.into();
        assert!(matches!(error, RuntimeError::EnvironmentTainted(_)));
        assert_eq!(error.to_string(), "lambda environment tainted: tainted");
    }
}
