// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! One HTTP call against the runtime API, run as a [`Stepper`] pipeline.

use std::time::Duration;

use serde_json::Value;

use super::stepper::Stepper;
use super::steps::{
    CreateConnectionStep, HeaderMap, ReadHeaderMapStep, ReadResponseCodeStep, ReadStreamStep,
    StepResult, StreamType,
};
use super::transport::{ConnectionSettings, Transport};
use crate::error::LambdaEnvironmentTainted;
use crate::metrics::PerformanceMetrics;

/// Everything read from a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCallResult {
    pub response_code: u16,
    pub header_fields: HeaderMap,
    pub normal_response_text: Option<String>,
    pub error_response_text: Option<String>,
}

impl HttpCallResult {
    /// All values of a header, matched case-insensitively.
    pub fn header_values(&self, header_name: &str) -> Option<&[String]> {
        self.header_fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(header_name))
            .map(|(_, values)| values.as_slice())
    }

    /// First value of a header that must be present and non-empty.
    ///
    /// A header whose first value is blank counts as empty.
    pub fn first_header_value(&self, header_name: &str) -> Result<&str, LambdaEnvironmentTainted> {
        match self.header_values(header_name) {
            None => Err(self.header_fault(
                format!("Could not find header {}", header_name),
                header_name,
            )),
            Some([]) => Err(self.header_fault(
                "Could find header, though its value collection is empty".to_string(),
                header_name,
            )),
            Some([first, ..]) if first.trim().is_empty() => Err(self.header_fault(
                "Could find header, though its value collection is empty".to_string(),
                header_name,
            )),
            Some([first, ..]) => Ok(first),
        }
    }

    /// First value of a header if there is one.
    pub fn optional_header_value(&self, header_name: &str) -> Option<&str> {
        self.header_values(header_name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    fn header_fault(&self, message: String, header_name: &str) -> LambdaEnvironmentTainted {
        let available: Vec<String> = self.header_fields.keys().cloned().collect();
        LambdaEnvironmentTainted::new(
            message,
            [
                ("requiredHeader", Value::from(header_name)),
                ("availableHeaders", Value::from(available)),
            ],
        )
    }
}

/// Perform one call: connect, then read status, headers and both bodies.
///
/// Only a failure to connect stops the pipeline early. Everything else is
/// read even after an earlier piece failed, so the eventual fault carries as
/// much context as possible.
pub fn do_http_call<T, M>(
    transport: &T,
    url: &str,
    method: &str,
    read_timeout: Option<Duration>,
    metrics: &M,
    payload: Option<&str>,
) -> Result<HttpCallResult, LambdaEnvironmentTainted>
where
    T: Transport,
    M: PerformanceMetrics,
{
    metrics.add_metric("DoHttpCall", || -> Result<HttpCallResult, LambdaEnvironmentTainted> {
        let mut stepper = Stepper::new(format!("{} {}", method, url), metrics, |summary| {
            LambdaEnvironmentTainted::new("Error executing http call", summary)
        });
        let settings = ConnectionSettings::new(url, method, read_timeout);

        let mut connection =
            stepper.step_required(CreateConnectionStep::new(transport, settings, payload))?;
        let response_code = stepper.step(ReadResponseCodeStep::new(&mut connection))?;
        let header_fields = stepper.step(ReadHeaderMapStep::new(&mut connection))?;
        let normal_response_text =
            stepper.step(ReadStreamStep::new(&mut connection, StreamType::Input))?;
        let error_response_text =
            stepper.step(ReadStreamStep::new(&mut connection, StreamType::Error))?;

        stepper.assert_steps_finished_without_error()?;
        Ok(HttpCallResult {
            response_code: success_value(response_code)?,
            header_fields: success_value(header_fields)?,
            normal_response_text: success_value(normal_response_text)?,
            error_response_text: success_value(error_response_text)?,
        })
    })
}

fn success_value<T>(result: StepResult<T>) -> Result<T, LambdaEnvironmentTainted> {
    result.success_value().map_err(|failed| {
        LambdaEnvironmentTainted::new(
            format!("{} has no success value", failed.step_name()),
            [("step", failed.step_name().to_string())],
        )
    })
}
