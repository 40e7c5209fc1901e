// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The individual steps of one HTTP call.

use std::collections::BTreeMap;
use std::io::{self, Read};

use super::transport::{BodyStream, Connection, ConnectionSettings, Transport, millis_or_zero};

/// Diagnostic key/value pairs attached to a failed step.
pub type ErrorInfo = Vec<(String, String)>;

/// Header fields keyed by name, each with all of its values.
pub type HeaderMap = BTreeMap<String, Vec<String>>;

/// Plain text form of a step's success value, as recorded in diagnostics.
pub trait SummaryText {
    fn summary_text(&self) -> String;
}

impl SummaryText for u16 {
    fn summary_text(&self) -> String {
        self.to_string()
    }
}

impl SummaryText for String {
    fn summary_text(&self) -> String {
        self.clone()
    }
}

/// An absent body renders as `null`.
impl SummaryText for Option<String> {
    fn summary_text(&self) -> String {
        self.clone().unwrap_or_else(|| "null".to_string())
    }
}

/// Compact JSON, e.g. `{"Content-Type":["application/json"]}`.
impl SummaryText for HeaderMap {
    fn summary_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Outcome of executing one step.
#[derive(Debug)]
pub enum StepResult<T> {
    Success { step_name: String, value: T },
    /// Failed; the caller decides whether to carry on.
    Error { step_name: String, error_info: ErrorInfo },
    /// Failed in a way that is always fatal.
    DealBreaker { step_name: String, error_info: ErrorInfo },
}

impl<T> StepResult<T> {
    pub fn step_name(&self) -> &str {
        match self {
            StepResult::Success { step_name, .. }
            | StepResult::Error { step_name, .. }
            | StepResult::DealBreaker { step_name, .. } => step_name,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, StepResult::Success { .. })
    }

    /// The success value, or the failed result back.
    pub fn success_value(self) -> Result<T, Self> {
        match self {
            StepResult::Success { value, .. } => Ok(value),
            failed => Err(failed),
        }
    }
}

/// A named, fallible unit of work.
pub trait Step {
    type Output;

    fn name(&self) -> &str;

    fn execute(&mut self) -> StepResult<Self::Output>;

    fn success(&self, value: Self::Output) -> StepResult<Self::Output> {
        StepResult::Success {
            step_name: self.name().to_string(),
            value,
        }
    }

    fn error(&self, message: &str, error_info: ErrorInfo) -> StepResult<Self::Output> {
        StepResult::Error {
            step_name: self.name().to_string(),
            error_info: with_message(message, error_info),
        }
    }

    fn deal_breaker(&self, message: &str, error_info: ErrorInfo) -> StepResult<Self::Output> {
        StepResult::DealBreaker {
            step_name: self.name().to_string(),
            error_info: with_message(message, error_info),
        }
    }
}

fn with_message(message: &str, error_info: ErrorInfo) -> ErrorInfo {
    let mut info = Vec::with_capacity(error_info.len() + 1);
    info.push(("message".to_string(), message.to_string()));
    info.extend(error_info);
    info
}

fn exception_info(error: &io::Error, settings: &ConnectionSettings) -> ErrorInfo {
    let mut info = vec![
        ("exceptionMessage".to_string(), error.to_string()),
        ("exception".to_string(), format!("{:?}", error)),
    ];
    info.extend(settings.as_pairs());
    info
}

/// Opens the connection and writes the request body.
///
/// Any failure here is a deal breaker: not being able to reach the local
/// runtime API means the environment is broken.
pub struct CreateConnectionStep<'a, T> {
    transport: &'a T,
    settings: Option<ConnectionSettings>,
    payload: Option<&'a str>,
}

impl<'a, T: Transport> CreateConnectionStep<'a, T> {
    pub fn new(transport: &'a T, settings: ConnectionSettings, payload: Option<&'a str>) -> Self {
        Self {
            transport,
            settings: Some(settings),
            payload,
        }
    }
}

impl<T: Transport> Step for CreateConnectionStep<'_, T> {
    type Output = T::Connection;

    fn name(&self) -> &str {
        "CreateConnection"
    }

    fn execute(&mut self) -> StepResult<T::Connection> {
        let Some(settings) = self.settings.take() else {
            return self.deal_breaker("Connection step executed twice", Vec::new());
        };
        let diagnostics = vec![
            ("url".to_string(), settings.url.clone()),
            ("method".to_string(), settings.method.clone()),
            ("readTimeout".to_string(), millis_or_zero(settings.read_timeout)),
        ];
        match self.transport.open(settings, self.payload) {
            Ok(connection) => self.success(connection),
            Err(e) => {
                let mut info = diagnostics;
                info.push(("exceptionMessage".to_string(), e.to_string()));
                self.deal_breaker("Error opening connection of url", info)
            }
        }
    }
}

/// Reads the status code; anything outside 200..=299 is an error.
pub struct ReadResponseCodeStep<'a, C> {
    connection: &'a mut C,
}

impl<'a, C: Connection> ReadResponseCodeStep<'a, C> {
    pub fn new(connection: &'a mut C) -> Self {
        Self { connection }
    }
}

impl<C: Connection> Step for ReadResponseCodeStep<'_, C> {
    type Output = u16;

    fn name(&self) -> &str {
        "ReadResponseCode"
    }

    fn execute(&mut self) -> StepResult<u16> {
        match self.connection.response_code() {
            Ok(code) if (200..=299).contains(&code) => self.success(code),
            Ok(code) => {
                let mut info = vec![("responseCode".to_string(), code.to_string())];
                info.extend(self.connection.settings().as_pairs());
                self.error("Unsupported response code.", info)
            }
            // The connection state is unknown after this, nothing else can be trusted.
            Err(e) => {
                let mut info = vec![("exception".to_string(), format!("{:?}", e))];
                info.extend(self.connection.settings().as_pairs());
                self.deal_breaker("Exception receiving response code.", info)
            }
        }
    }
}

/// Reads all header fields. A nameless field is stored under `"null"`.
pub struct ReadHeaderMapStep<'a, C> {
    connection: &'a mut C,
}

impl<'a, C: Connection> ReadHeaderMapStep<'a, C> {
    pub fn new(connection: &'a mut C) -> Self {
        Self { connection }
    }
}

impl<C: Connection> Step for ReadHeaderMapStep<'_, C> {
    type Output = HeaderMap;

    fn name(&self) -> &str {
        "ReadHeaderMap"
    }

    fn execute(&mut self) -> StepResult<HeaderMap> {
        match self.connection.header_fields() {
            Ok(fields) => {
                let headers = fields
                    .into_iter()
                    .map(|(name, values)| (name.unwrap_or_else(|| "null".to_string()), values))
                    .collect();
                self.success(headers)
            }
            Err(e) => {
                let info = exception_info(&e, self.connection.settings());
                self.error("Unexpected error", info)
            }
        }
    }
}

/// Which body of the response to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Input,
    Error,
}

impl StreamType {
    fn label(self) -> &'static str {
        match self {
            StreamType::Input => "input",
            StreamType::Error => "error",
        }
    }
}

/// Reads one body stream to a string, `None` if the stream is absent.
pub struct ReadStreamStep<'a, C> {
    connection: &'a mut C,
    stream_type: StreamType,
    name: &'static str,
}

impl<'a, C: Connection> ReadStreamStep<'a, C> {
    pub fn new(connection: &'a mut C, stream_type: StreamType) -> Self {
        let name = match stream_type {
            StreamType::Input => "ReadInputStream",
            StreamType::Error => "ReadErrorStream",
        };
        Self {
            connection,
            stream_type,
            name,
        }
    }

    fn open_stream(&mut self) -> io::Result<Option<BodyStream>> {
        match self.stream_type {
            StreamType::Input => self.connection.input_stream(),
            StreamType::Error => self.connection.error_stream(),
        }
    }
}

impl<C: Connection> Step for ReadStreamStep<'_, C> {
    type Output = Option<String>;

    fn name(&self) -> &str {
        self.name
    }

    fn execute(&mut self) -> StepResult<Option<String>> {
        let stream = match self.open_stream() {
            Ok(stream) => stream,
            Err(e) => {
                let info = exception_info(&e, self.connection.settings());
                return self.error("Exception GETTING stream of connection", info);
            }
        };
        let Some(mut stream) = stream else {
            return self.success(None);
        };
        let mut text = String::new();
        match stream.read_to_string(&mut text) {
            Ok(_) => self.success(Some(text)),
            Err(e) => {
                let info = exception_info(&e, self.connection.settings());
                let message = format!(
                    "Exception READING {} stream of connection",
                    self.stream_type.label()
                );
                self.error(&message, info)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::{FakeResponse, FakeTransport};
    use super::*;

    fn settings() -> ConnectionSettings {
        ConnectionSettings::new("http://127.0.0.1:9001/next", "GET", None)
    }

    fn info_value<'a>(info: &'a ErrorInfo, key: &str) -> Option<&'a str> {
        info.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_summary_text_is_plain() {
        assert_eq!(202u16.summary_text(), "202");
        assert_eq!(Some("service unavailable".to_string()).summary_text(), "service unavailable");
        assert_eq!(None::<String>.summary_text(), "null");

        let headers: HeaderMap = [
            ("null".to_string(), vec!["HTTP/1.1 200 OK".to_string()]),
            ("Content-Type".to_string(), vec!["application/json".to_string()]),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            headers.summary_text(),
            r#"{"Content-Type":["application/json"],"null":["HTTP/1.1 200 OK"]}"#
        );

        let transport = FakeTransport::new(vec![FakeResponse::ok("id", None)]);
        let connection = transport.open(settings(), None).unwrap();
        assert_eq!(connection.summary_text(), "GET http://127.0.0.1:9001/next");
    }

    #[test]
    fn test_create_connection_failure_is_deal_breaker() {
        let transport = FakeTransport::new(vec![FakeResponse {
            open_fails: true,
            ..FakeResponse::ok("id", None)
        }]);
        let result = CreateConnectionStep::new(&transport, settings(), None).execute();

        match result {
            StepResult::DealBreaker { step_name, error_info } => {
                assert_eq!(step_name, "CreateConnection");
                assert_eq!(info_value(&error_info, "message"), Some("Error opening connection of url"));
                assert_eq!(info_value(&error_info, "url"), Some("http://127.0.0.1:9001/next"));
                assert_eq!(info_value(&error_info, "method"), Some("GET"));
                assert_eq!(info_value(&error_info, "readTimeout"), Some("0"));
            }
            other => panic!("expected deal breaker, got {:?}", other),
        }
    }

    #[test]
    fn test_response_code_outside_2xx_is_error() {
        let transport = FakeTransport::new(vec![FakeResponse::ok("id", None).with_code(404)]);
        let mut connection = transport.open(settings(), None).unwrap();
        let result = ReadResponseCodeStep::new(&mut connection).execute();

        match result {
            StepResult::Error { error_info, .. } => {
                assert_eq!(info_value(&error_info, "responseCode"), Some("404"));
                assert_eq!(info_value(&error_info, "requestMethod"), Some("GET"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_response_code_boundaries() {
        for (code, ok) in [(199, false), (200, true), (204, true), (299, true), (300, false)] {
            let transport = FakeTransport::new(vec![FakeResponse::ok("id", None).with_code(code)]);
            let mut connection = transport.open(settings(), None).unwrap();
            let result = ReadResponseCodeStep::new(&mut connection).execute();
            assert_eq!(!result.is_error(), ok, "code {}", code);
        }
    }

    #[test]
    fn test_response_code_exception_is_deal_breaker() {
        let transport = FakeTransport::new(vec![FakeResponse {
            code: Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")),
            ..FakeResponse::ok("id", None)
        }]);
        let mut connection = transport.open(settings(), None).unwrap();
        let result = ReadResponseCodeStep::new(&mut connection).execute();
        assert!(matches!(result, StepResult::DealBreaker { .. }));
    }

    #[test]
    fn test_header_map_normalizes_nameless_field() {
        let transport = FakeTransport::new(vec![FakeResponse::ok("abc", None)]);
        let mut connection = transport.open(settings(), None).unwrap();
        let headers = ReadHeaderMapStep::new(&mut connection)
            .execute()
            .success_value()
            .unwrap();

        assert_eq!(headers["null"], vec!["HTTP/1.1 200 OK".to_string()]);
        assert_eq!(headers["Lambda-Runtime-Aws-Request-Id"], vec!["abc".to_string()]);
    }

    #[test]
    fn test_header_map_failure_is_plain_error() {
        let transport = FakeTransport::new(vec![FakeResponse {
            headers: None,
            ..FakeResponse::ok("abc", None)
        }]);
        let mut connection = transport.open(settings(), None).unwrap();
        let result = ReadHeaderMapStep::new(&mut connection).execute();
        assert!(matches!(result, StepResult::Error { .. }));
    }

    #[test]
    fn test_stream_absent_is_success_none() {
        let transport = FakeTransport::new(vec![FakeResponse::ok("abc", None)]);
        let mut connection = transport.open(settings(), None).unwrap();
        let mut step = ReadStreamStep::new(&mut connection, StreamType::Error);
        assert_eq!(step.name(), "ReadErrorStream");
        assert_eq!(step.execute().success_value().unwrap(), None);
    }

    #[test]
    fn test_stream_is_read_fully() {
        let transport = FakeTransport::new(vec![FakeResponse::ok("abc", Some("{\"k\":\"ü\"}"))]);
        let mut connection = transport.open(settings(), None).unwrap();
        let text = ReadStreamStep::new(&mut connection, StreamType::Input)
            .execute()
            .success_value()
            .unwrap();
        assert_eq!(text.as_deref(), Some("{\"k\":\"ü\"}"));
    }

    #[test]
    fn test_stream_getting_failure_is_plain_error() {
        let transport = FakeTransport::new(vec![FakeResponse {
            input_fails: true,
            ..FakeResponse::ok("abc", None)
        }]);
        let mut connection = transport.open(settings(), None).unwrap();
        match ReadStreamStep::new(&mut connection, StreamType::Input).execute() {
            StepResult::Error { step_name, error_info } => {
                assert_eq!(step_name, "ReadInputStream");
                assert_eq!(
                    info_value(&error_info, "message"),
                    Some("Exception GETTING stream of connection")
                );
            }
            other => panic!("expected error, got {:?}", other),
        }
    }
}
