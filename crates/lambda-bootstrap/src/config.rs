// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Where the runtime API lives and how the loop talks to it.

use std::env;
use std::sync::Arc;

use crate::environment::{AWS_LAMBDA_RUNTIME_API, LambdaEnvironmentVariables};
use crate::error::ConfigError;
use crate::marshalling::{Codec, JsonCodec};

const NEXT_INVOCATION_PATH: &str = "/2018-06-01/runtime/invocation/next";

/// Environment variable switching on per-invocation performance metrics.
pub const PERFORMANCE_METRICS_VAR: &str = "LAMBDA_BOOTSTRAP_PERFORMANCE_METRICS";

fn next_invocation_url(authority: &str) -> String {
    format!("http://{}{}", authority, NEXT_INVOCATION_PATH)
}

fn response_url(authority: &str, request_id: &str) -> String {
    format!(
        "http://{}/2018-06-01/runtime/invocation/{}/response",
        authority, request_id
    )
}

/// Everything the invocation loop needs from its surroundings.
pub trait RuntimeConfiguration {
    fn next_invocation_url(&self) -> &str;

    fn response_url(&self, request_id: &str) -> String;

    fn environment_variables(&self) -> &LambdaEnvironmentVariables;

    /// Codec for events, responses and log records.
    fn codec(&self) -> Arc<dyn Codec> {
        Arc::new(JsonCodec)
    }
}

/// Configuration inside the Lambda execution environment.
///
/// The runtime API authority comes from `AWS_LAMBDA_RUNTIME_API`.
#[derive(Debug, Clone)]
pub struct ProductionConfiguration {
    authority: String,
    next_invocation_url: String,
    environment_variables: LambdaEnvironmentVariables,
}

impl ProductionConfiguration {
    /// Load configuration from the process environment.
    ///
    /// # Required Environment Variables
    /// - `AWS_LAMBDA_RUNTIME_API` - host and port of the runtime API
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(LambdaEnvironmentVariables::from_env())
    }

    /// Build from an explicit environment snapshot.
    pub fn new(environment_variables: LambdaEnvironmentVariables) -> Result<Self, ConfigError> {
        let authority = environment_variables
            .runtime_api()
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing(AWS_LAMBDA_RUNTIME_API))?
            .to_string();
        Ok(Self {
            next_invocation_url: next_invocation_url(&authority),
            authority,
            environment_variables,
        })
    }
}

impl RuntimeConfiguration for ProductionConfiguration {
    fn next_invocation_url(&self) -> &str {
        &self.next_invocation_url
    }

    fn response_url(&self, request_id: &str) -> String {
        response_url(&self.authority, request_id)
    }

    fn environment_variables(&self) -> &LambdaEnvironmentVariables {
        &self.environment_variables
    }
}

/// Configuration against a runtime API at an explicit address, for local runs
/// and tests.
#[derive(Debug, Clone)]
pub struct LocalConfiguration {
    authority: String,
    next_invocation_url: String,
    environment_variables: LambdaEnvironmentVariables,
}

impl LocalConfiguration {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let authority = format!("{}:{}", host.into(), port);
        Self {
            next_invocation_url: next_invocation_url(&authority),
            authority,
            environment_variables: LambdaEnvironmentVariables::from_env(),
        }
    }

    /// Runtime API on `127.0.0.1`.
    pub fn localhost(port: u16) -> Self {
        Self::new("127.0.0.1", port)
    }

    /// Replace the environment snapshot.
    pub fn with_environment_variables(mut self, variables: LambdaEnvironmentVariables) -> Self {
        self.environment_variables = variables;
        self
    }
}

impl RuntimeConfiguration for LocalConfiguration {
    fn next_invocation_url(&self) -> &str {
        &self.next_invocation_url
    }

    fn response_url(&self, request_id: &str) -> String {
        response_url(&self.authority, request_id)
    }

    fn environment_variables(&self) -> &LambdaEnvironmentVariables {
        &self.environment_variables
    }
}

/// Process-level switches read at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Time each invocation and log the results at debug level.
    pub enable_performance_metrics: bool,
}

impl BootstrapOptions {
    /// # Optional Environment Variables
    /// - `LAMBDA_BOOTSTRAP_PERFORMANCE_METRICS` - `true` or `1` to enable (default: false)
    pub fn from_env() -> Self {
        Self::from_value(env::var(PERFORMANCE_METRICS_VAR).ok().as_deref())
    }

    fn from_value(value: Option<&str>) -> Self {
        let enable_performance_metrics = value
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);
        Self {
            enable_performance_metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_urls() {
        let vars = LambdaEnvironmentVariables::from_map([("AWS_LAMBDA_RUNTIME_API", "127.0.0.1:9001")]);
        let config = ProductionConfiguration::new(vars).unwrap();

        assert_eq!(
            config.next_invocation_url(),
            "http://127.0.0.1:9001/2018-06-01/runtime/invocation/next"
        );
        assert_eq!(
            config.response_url("abc-123"),
            "http://127.0.0.1:9001/2018-06-01/runtime/invocation/abc-123/response"
        );
        assert_eq!(config.environment_variables().runtime_api(), Some("127.0.0.1:9001"));
    }

    #[test]
    fn test_production_requires_runtime_api() {
        let vars = LambdaEnvironmentVariables::from_map([("AWS_REGION", "eu-west-1")]);
        let err = ProductionConfiguration::new(vars).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("AWS_LAMBDA_RUNTIME_API")));

        let vars = LambdaEnvironmentVariables::from_map([("AWS_LAMBDA_RUNTIME_API", "  ")]);
        assert!(ProductionConfiguration::new(vars).is_err());
    }

    #[test]
    fn test_local_urls() {
        let config = LocalConfiguration::new("localhost", 8080);
        assert_eq!(
            config.next_invocation_url(),
            "http://localhost:8080/2018-06-01/runtime/invocation/next"
        );
        assert_eq!(
            config.response_url("r1"),
            "http://localhost:8080/2018-06-01/runtime/invocation/r1/response"
        );

        let config = LocalConfiguration::localhost(9001);
        assert_eq!(
            config.next_invocation_url(),
            "http://127.0.0.1:9001/2018-06-01/runtime/invocation/next"
        );
    }

    #[test]
    fn test_local_environment_override() {
        let vars = LambdaEnvironmentVariables::from_map([("_HANDLER", "demo")]);
        let config = LocalConfiguration::localhost(9001).with_environment_variables(vars);
        assert_eq!(config.environment_variables().handler(), Some("demo"));
        assert_eq!(config.environment_variables().runtime_api(), None);
    }

    #[test]
    fn test_default_codec_is_json() {
        let config = LocalConfiguration::localhost(9001);
        let event = config.codec().unmarshal(r#"{"a":1}"#).unwrap();
        assert_eq!(config.codec().marshal(&event).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_bootstrap_options_parsing() {
        assert!(!BootstrapOptions::from_value(None).enable_performance_metrics);
        assert!(BootstrapOptions::from_value(Some("true")).enable_performance_metrics);
        assert!(BootstrapOptions::from_value(Some("TRUE")).enable_performance_metrics);
        assert!(BootstrapOptions::from_value(Some("1")).enable_performance_metrics);
        assert!(!BootstrapOptions::from_value(Some("yes")).enable_performance_metrics);
        assert!(!BootstrapOptions::from_value(Some("0")).enable_performance_metrics);
    }
}
