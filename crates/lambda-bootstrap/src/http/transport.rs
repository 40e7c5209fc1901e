// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Connection-level access to the runtime API.
//!
//! A [`Connection`] is read piece by piece (status, headers, body streams) so
//! the pipeline can record each piece as a separate step. [`UreqTransport`] is
//! the production implementation; tests substitute in-memory fakes.

use std::fmt;
use std::io::{self, Read};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::steps::SummaryText;

/// Connect timeout for every call. The runtime API always lives on loopback.
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(100);

/// Body stream handed out by a connection.
pub type BodyStream = Box<dyn Read + Send + Sync + 'static>;

/// Header fields as the connection reports them.
///
/// A `None` name carries a pseudo header such as the status line.
pub type RawHeaderFields = Vec<(Option<String>, Vec<String>)>;

/// How a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub url: String,
    pub method: String,
    pub connect_timeout: Duration,
    /// `None` waits indefinitely for the response.
    pub read_timeout: Option<Duration>,
    pub use_caches: bool,
}

impl ConnectionSettings {
    pub fn new(url: impl Into<String>, method: impl Into<String>, read_timeout: Option<Duration>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout,
            use_caches: false,
        }
    }

    /// Settings as diagnostic pairs, appended to step error details.
    pub fn as_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("url".to_string(), self.url.clone()),
            ("requestMethod".to_string(), self.method.clone()),
            ("useCaches".to_string(), self.use_caches.to_string()),
            (
                "connectTimeout".to_string(),
                self.connect_timeout.as_millis().to_string(),
            ),
            ("readTimeout".to_string(), millis_or_zero(self.read_timeout)),
        ]
    }
}

/// Timeout in milliseconds, `0` meaning unbounded.
pub fn millis_or_zero(timeout: Option<Duration>) -> String {
    timeout.map(|t| t.as_millis()).unwrap_or(0).to_string()
}

/// Opens connections.
pub trait Transport {
    type Connection: Connection;

    /// Open and configure a connection, writing `payload` as the request body
    /// if one is given.
    fn open(&self, settings: ConnectionSettings, payload: Option<&str>) -> io::Result<Self::Connection>;
}

/// One request/response exchange, read piece by piece.
///
/// The response code must be read before the headers.
pub trait Connection: fmt::Debug + SummaryText {
    fn settings(&self) -> &ConnectionSettings;

    fn response_code(&mut self) -> io::Result<u16>;

    fn header_fields(&mut self) -> io::Result<RawHeaderFields>;

    /// Body of a successful response, `None` if there is none to read.
    fn input_stream(&mut self) -> io::Result<Option<BodyStream>>;

    /// Body of an error response, `None` if the response was not an error.
    fn error_stream(&mut self) -> io::Result<Option<BodyStream>>;
}

/// Agents are keyed by connect and read timeout.
type AgentKey = (Duration, Option<Duration>);

/// Production transport over `ureq`.
///
/// Keeps one agent per timeout pair so pooled connections survive between
/// calls.
#[derive(Debug, Default)]
pub struct UreqTransport {
    agents: Mutex<Vec<(AgentKey, ureq::Agent)>>,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn agent(&self, settings: &ConnectionSettings) -> ureq::Agent {
        let key = (settings.connect_timeout, settings.read_timeout);
        let mut agents = self.agents.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, agent)) = agents.iter().find(|(existing, _)| *existing == key) {
            return agent.clone();
        }
        let mut builder = ureq::AgentBuilder::new().timeout_connect(settings.connect_timeout);
        if let Some(read_timeout) = settings.read_timeout {
            builder = builder.timeout_read(read_timeout);
        }
        let agent = builder.build();
        agents.push((key, agent.clone()));
        agent
    }

    #[cfg(test)]
    fn agent_count(&self) -> usize {
        self.agents.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Transport for UreqTransport {
    type Connection = UreqConnection;

    fn open(&self, settings: ConnectionSettings, payload: Option<&str>) -> io::Result<UreqConnection> {
        let request = self.agent(&settings).request(&settings.method, &settings.url);

        let mut connection = UreqConnection {
            settings,
            state: ExchangeState::Pending(Box::new(request)),
        };
        // Writing a body needs the connection, so the whole exchange happens here.
        if let Some(payload) = payload {
            connection.exchange(Some(payload))?;
        }
        Ok(connection)
    }
}

enum ExchangeState {
    Pending(Box<ureq::Request>),
    Received(Response),
}

struct Response {
    status: u16,
    is_error: bool,
    status_line: String,
    headers: RawHeaderFields,
    body: Option<ureq::Response>,
}

impl Response {
    fn from_ureq(response: ureq::Response, is_error: bool) -> Self {
        let status = response.status();
        let status_line = format!(
            "{} {} {}",
            response.http_version(),
            status,
            response.status_text()
        );
        let mut headers: RawHeaderFields = Vec::new();
        for name in response.headers_names() {
            if headers
                .iter()
                .any(|(existing, _)| existing.as_deref() == Some(name.as_str()))
            {
                continue;
            }
            let values = response
                .all(&name)
                .into_iter()
                .map(str::to_string)
                .collect();
            headers.push((Some(name), values));
        }
        Self {
            status,
            is_error,
            status_line,
            headers,
            body: Some(response),
        }
    }
}

/// A connection made through [`UreqTransport`].
pub struct UreqConnection {
    settings: ConnectionSettings,
    state: ExchangeState,
}

impl UreqConnection {
    fn exchange(&mut self, payload: Option<&str>) -> io::Result<&mut Response> {
        if let ExchangeState::Pending(request) = &self.state {
            let request = (**request).clone();
            let outcome = match payload {
                Some(body) => request.send_string(body),
                None => request.call(),
            };
            let response = match outcome {
                Ok(response) => Response::from_ureq(response, false),
                Err(ureq::Error::Status(_, response)) => Response::from_ureq(response, true),
                Err(ureq::Error::Transport(transport)) => {
                    return Err(io::Error::other(transport.to_string()));
                }
            };
            self.state = ExchangeState::Received(response);
        }
        received(&mut self.state)
    }

    fn take_body(&mut self, want_error: bool) -> io::Result<Option<BodyStream>> {
        let response = received(&mut self.state)?;
        if response.is_error != want_error {
            if want_error {
                return Ok(None);
            }
            return Err(io::Error::other(format!(
                "server returned HTTP response code: {} for URL: {}",
                response.status, self.settings.url
            )));
        }
        Ok(response.body.take().map(|body| body.into_reader()))
    }
}

fn received(state: &mut ExchangeState) -> io::Result<&mut Response> {
    match state {
        ExchangeState::Received(response) => Ok(response),
        ExchangeState::Pending(_) => Err(io::Error::other(
            "response code must be read before the response",
        )),
    }
}

impl Connection for UreqConnection {
    fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    fn response_code(&mut self) -> io::Result<u16> {
        self.exchange(None).map(|response| response.status)
    }

    fn header_fields(&mut self) -> io::Result<RawHeaderFields> {
        let response = received(&mut self.state)?;
        let mut fields = vec![(None, vec![response.status_line.clone()])];
        fields.extend(response.headers.iter().cloned());
        Ok(fields)
    }

    fn input_stream(&mut self) -> io::Result<Option<BodyStream>> {
        self.take_body(false)
    }

    fn error_stream(&mut self) -> io::Result<Option<BodyStream>> {
        self.take_body(true)
    }
}

impl SummaryText for UreqConnection {
    fn summary_text(&self) -> String {
        format!("{} {}", self.settings.method, self.settings.url)
    }
}

impl fmt::Debug for UreqConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            ExchangeState::Pending(_) => "pending".to_string(),
            ExchangeState::Received(response) => format!("received {}", response.status),
        };
        f.debug_struct("UreqConnection")
            .field("method", &self.settings.method)
            .field("url", &self.settings.url)
            .field("state", &state)
            .finish()
    }
}
