// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runs the steps of one HTTP call and decides when a failure becomes fatal.
//!
//! Every step's outcome is appended to a diagnostic summary, successes as
//! `{step}.SuccessResult` and failures as `{step}.{key}` for each detail, in
//! execution order. When a failure becomes fatal the summary gathered so far
//! is handed to the exception factory.
//!
//! - [`Stepper::step_required`] fails on any error.
//! - [`Stepper::step`] fails only on a deal breaker and otherwise hands the
//!   result back, so later steps can still collect diagnostics.
//! - [`Stepper::assert_steps_finished_without_error`] fails if any recorded
//!   step failed.

use tracing::trace;

use super::steps::{ErrorInfo, Step, StepResult, SummaryText};
use crate::metrics::PerformanceMetrics;

/// Marker added when a required step's error is escalated.
pub const ESCALATION_KEY: &str = "Stepper.Message";
pub const ESCALATION_MESSAGE: &str = "Required step failed, escalating step error to deal breaker";

pub struct Stepper<'m, M, F> {
    name: String,
    metrics: &'m M,
    exception_factory: F,
    summary: ErrorInfo,
    failed: bool,
}

impl<'m, M, F, E> Stepper<'m, M, F>
where
    M: PerformanceMetrics,
    F: Fn(ErrorInfo) -> E,
{
    pub fn new(name: impl Into<String>, metrics: &'m M, exception_factory: F) -> Self {
        Self {
            name: name.into(),
            metrics,
            exception_factory,
            summary: Vec::new(),
            failed: false,
        }
    }

    /// Execute a step whose failure, of any kind, ends the call.
    pub fn step_required<S>(&mut self, mut step: S) -> Result<S::Output, E>
    where
        S: Step,
        S::Output: SummaryText,
    {
        let metrics = self.metrics;
        let metric_name = self.metric_name(step.name());
        metrics.add_metric(&metric_name, || {
            let result = step.execute();
            self.record(&result);
            match result {
                StepResult::Success { value, .. } => Ok(value),
                StepResult::Error { .. } => {
                    let mut summary = self.summary.clone();
                    summary.push((ESCALATION_KEY.to_string(), ESCALATION_MESSAGE.to_string()));
                    Err((self.exception_factory)(summary))
                }
                StepResult::DealBreaker { .. } => Err(self.fail()),
            }
        })
    }

    /// Execute a best-effort step. Only a deal breaker ends the call here.
    pub fn step<S>(&mut self, mut step: S) -> Result<StepResult<S::Output>, E>
    where
        S: Step,
        S::Output: SummaryText,
    {
        let metrics = self.metrics;
        let metric_name = self.metric_name(step.name());
        metrics.add_metric(&metric_name, || {
            let result = step.execute();
            self.record(&result);
            match result {
                StepResult::DealBreaker { .. } => Err(self.fail()),
                other => Ok(other),
            }
        })
    }

    /// Fail if any step recorded so far did not succeed.
    pub fn assert_steps_finished_without_error(&mut self) -> Result<(), E> {
        let metrics = self.metrics;
        let metric_name = self.metric_name("assertStepsFinishedWithoutError");
        metrics.add_metric(&metric_name, || {
            trace!(
                stepper = %self.name,
                status = if self.failed { "failed" } else { "success" },
                "Stepper finished"
            );
            if self.failed {
                Err(self.fail())
            } else {
                Ok(())
            }
        })
    }

    /// Diagnostics gathered so far.
    #[cfg(test)]
    pub fn summary(&self) -> &ErrorInfo {
        &self.summary
    }

    fn record<T: SummaryText>(&mut self, result: &StepResult<T>) {
        match result {
            StepResult::Success { step_name, value } => {
                let text = value.summary_text();
                trace!(stepper = %self.name, step = %step_name, result = %text, "step succeeded");
                self.summary
                    .push((format!("{}.SuccessResult", step_name), text));
            }
            StepResult::Error {
                step_name,
                error_info,
            }
            | StepResult::DealBreaker {
                step_name,
                error_info,
            } => {
                self.failed = true;
                self.summary.extend(
                    error_info
                        .iter()
                        .map(|(key, value)| (format!("{}.{}", step_name, key), value.clone())),
                );
            }
        }
    }

    fn fail(&mut self) -> E {
        self.failed = true;
        (self.exception_factory)(self.summary.clone())
    }

    fn metric_name(&self, step_name: &str) -> String {
        format!("Stepper[{}].{}", self.name, step_name)
    }
}
