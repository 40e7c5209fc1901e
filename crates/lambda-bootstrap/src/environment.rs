// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Snapshot of the environment variables the Lambda service sets.
//!
//! Every variable is optional. Reading is plain passthrough: a missing
//! variable is `None`, never an error.

use std::collections::BTreeMap;

pub const HANDLER: &str = "_HANDLER";
pub const AWS_REGION: &str = "AWS_REGION";
pub const AWS_EXECUTION_ENV: &str = "AWS_EXECUTION_ENV";
pub const AWS_LAMBDA_FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";
pub const AWS_LAMBDA_FUNCTION_MEMORY_SIZE: &str = "AWS_LAMBDA_FUNCTION_MEMORY_SIZE";
pub const AWS_LAMBDA_FUNCTION_VERSION: &str = "AWS_LAMBDA_FUNCTION_VERSION";
pub const AWS_LAMBDA_LOG_GROUP_NAME: &str = "AWS_LAMBDA_LOG_GROUP_NAME";
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const AWS_LAMBDA_RUNTIME_API: &str = "AWS_LAMBDA_RUNTIME_API";
pub const LAMBDA_TASK_ROOT: &str = "LAMBDA_TASK_ROOT";
pub const LAMBDA_RUNTIME_DIR: &str = "LAMBDA_RUNTIME_DIR";
pub const TZ: &str = "TZ";

/// All variable names the Lambda service documents for custom runtimes.
pub const RECOGNIZED_VARIABLES: [&str; 14] = [
    HANDLER,
    AWS_REGION,
    AWS_EXECUTION_ENV,
    AWS_LAMBDA_FUNCTION_NAME,
    AWS_LAMBDA_FUNCTION_MEMORY_SIZE,
    AWS_LAMBDA_FUNCTION_VERSION,
    AWS_LAMBDA_LOG_GROUP_NAME,
    AWS_ACCESS_KEY_ID,
    AWS_SECRET_ACCESS_KEY,
    AWS_SESSION_TOKEN,
    AWS_LAMBDA_RUNTIME_API,
    LAMBDA_TASK_ROOT,
    LAMBDA_RUNTIME_DIR,
    TZ,
];

const REDACTED_VARIABLES: [&str; 2] = [AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN];

/// Immutable copy of the process environment taken at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LambdaEnvironmentVariables {
    variables: BTreeMap<String, String>,
}

impl LambdaEnvironmentVariables {
    /// Snapshot the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn from_env() -> Self {
        Self {
            variables: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    pub fn from_map<K, V>(variables: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            variables: variables
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// The snapshot with credential values masked, for logging.
    pub fn redacted(&self) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .map(|(k, v)| {
                if REDACTED_VARIABLES.contains(&k.as_str()) {
                    (k.clone(), "***".to_string())
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect()
    }

    pub fn handler(&self) -> Option<&str> {
        self.get(HANDLER)
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.get(AWS_REGION)
    }

    pub fn aws_execution_env(&self) -> Option<&str> {
        self.get(AWS_EXECUTION_ENV)
    }

    pub fn function_name(&self) -> Option<&str> {
        self.get(AWS_LAMBDA_FUNCTION_NAME)
    }

    pub fn function_memory_size(&self) -> Option<&str> {
        self.get(AWS_LAMBDA_FUNCTION_MEMORY_SIZE)
    }

    pub fn function_version(&self) -> Option<&str> {
        self.get(AWS_LAMBDA_FUNCTION_VERSION)
    }

    pub fn log_group_name(&self) -> Option<&str> {
        self.get(AWS_LAMBDA_LOG_GROUP_NAME)
    }

    pub fn aws_access_key_id(&self) -> Option<&str> {
        self.get(AWS_ACCESS_KEY_ID)
    }

    pub fn aws_secret_access_key(&self) -> Option<&str> {
        self.get(AWS_SECRET_ACCESS_KEY)
    }

    pub fn aws_session_token(&self) -> Option<&str> {
        self.get(AWS_SESSION_TOKEN)
    }

    /// Host and port of the runtime API, e.g. `127.0.0.1:9001`.
    pub fn runtime_api(&self) -> Option<&str> {
        self.get(AWS_LAMBDA_RUNTIME_API)
    }

    pub fn task_root(&self) -> Option<&str> {
        self.get(LAMBDA_TASK_ROOT)
    }

    pub fn runtime_dir(&self) -> Option<&str> {
        self.get(LAMBDA_RUNTIME_DIR)
    }

    pub fn tz(&self) -> Option<&str> {
        self.get(TZ)
    }
}
