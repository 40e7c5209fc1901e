// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fetching invocations from the runtime API and delivering their results.

use std::time::Duration;

use crate::config::RuntimeConfiguration;
use crate::error::LambdaEnvironmentTainted;
use crate::http::client::do_http_call;
use crate::http::transport::Transport;
use crate::log_map;
use crate::logging::StructuralLogger;
use crate::metrics::PerformanceMetrics;

/// Header carrying the id of the invocation being served.
pub const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// Read timeout for delivering a result. Fetching has none: the runtime API
/// holds the request open until there is work.
pub const DELIVER_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// One unit of work handed out by the runtime API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub request_id: String,
    pub content_type: Option<String>,
    pub payload: Option<String>,
}

/// Block until the runtime API hands out the next invocation.
pub fn next_invocation<T, M>(
    transport: &T,
    next_invocation_url: &str,
    metrics: &M,
    logger: &StructuralLogger,
) -> Result<Invocation, LambdaEnvironmentTainted>
where
    T: Transport,
    M: PerformanceMetrics,
{
    metrics.add_metric("RetrieveNextInvocation", || -> Result<Invocation, LambdaEnvironmentTainted> {
        let result = do_http_call(transport, next_invocation_url, "GET", None, metrics, None)?;
        let invocation = Invocation {
            request_id: result.first_header_value(REQUEST_ID_HEADER)?.to_string(),
            content_type: result
                .optional_header_value(CONTENT_TYPE_HEADER)
                .map(str::to_string),
            payload: result.normal_response_text.filter(|text| !text.is_empty()),
        };

        logger.debug_log_map(|| {
            log_map! {
                "message" => "Received next invocation",
                "requestId" => invocation.request_id.as_str(),
                "contentType" => invocation.content_type.as_deref(),
                "payload" => invocation.payload.as_deref(),
            }
        });
        Ok(invocation)
    })
}

/// Post the handler's result for `invocation`.
pub fn respond<C, T, M>(
    transport: &T,
    configuration: &C,
    invocation: &Invocation,
    payload: &str,
    metrics: &M,
    logger: &StructuralLogger,
) -> Result<(), LambdaEnvironmentTainted>
where
    C: RuntimeConfiguration + ?Sized,
    T: Transport,
    M: PerformanceMetrics,
{
    metrics.add_metric("DeliverInvocationResult", || -> Result<(), LambdaEnvironmentTainted> {
        let url = configuration.response_url(&invocation.request_id);
        let result = do_http_call(
            transport,
            &url,
            "POST",
            Some(DELIVER_READ_TIMEOUT),
            metrics,
            Some(payload),
        )?;

        logger.debug_log_map(|| {
            log_map! {
                "message" => "Delivered invocation result",
                "requestId" => invocation.request_id.as_str(),
                "contentType" => invocation.content_type.as_deref(),
                "endpointResponse" => result.normal_response_text.as_deref(),
                "invocationPayload" => invocation.payload.as_deref(),
                "resultPayload" => payload,
            }
        });
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocalConfiguration;
    use crate::http::steps::fakes::{FakeResponse, FakeTransport};
    use crate::marshalling::JsonCodec;
    use crate::metrics::NoopMetrics;
    use serde_json::Value;
    use std::sync::Arc;

    const NEXT_URL: &str = "http://127.0.0.1:9001/2018-06-01/runtime/invocation/next";

    fn logger() -> StructuralLogger {
        StructuralLogger::new(Arc::new(JsonCodec))
    }

    #[test]
    fn test_next_invocation_reads_id_type_and_payload() {
        let transport = FakeTransport::new(vec![FakeResponse::ok("abc-123", Some(r#"{"a":1}"#))]);
        let invocation = next_invocation(&transport, NEXT_URL, &NoopMetrics, &logger()).unwrap();

        assert_eq!(
            invocation,
            Invocation {
                request_id: "abc-123".to_string(),
                content_type: Some("application/json".to_string()),
                payload: Some(r#"{"a":1}"#.to_string()),
            }
        );
        assert_eq!(
            transport.calls()[0],
            format!("open GET {} read_timeout=0 payload=-", NEXT_URL)
        );
    }

    #[test]
    fn test_next_invocation_without_content_type_or_body() {
        let transport = FakeTransport::new(vec![FakeResponse::ok("abc", Some("")).with_headers(
            vec![(
                Some("lambda-runtime-aws-request-id".to_string()),
                vec!["abc".to_string()],
            )],
        )]);
        let invocation = next_invocation(&transport, NEXT_URL, &NoopMetrics, &logger()).unwrap();

        assert_eq!(invocation.request_id, "abc");
        assert_eq!(invocation.content_type, None);
        assert_eq!(invocation.payload, None);
    }

    #[test]
    fn test_next_invocation_without_request_id_fails() {
        let transport = FakeTransport::new(vec![FakeResponse::ok("abc", Some("{}")).with_headers(
            vec![(
                Some("Content-Type".to_string()),
                vec!["application/json".to_string()],
            )],
        )]);
        let fault = next_invocation(&transport, NEXT_URL, &NoopMetrics, &logger()).unwrap_err();

        assert_eq!(
            fault.message(),
            "Could not find header Lambda-Runtime-Aws-Request-Id"
        );
        assert_eq!(
            fault.detail("requiredHeader"),
            Some(&Value::from(REQUEST_ID_HEADER))
        );
    }

    #[test]
    fn test_next_invocation_with_empty_request_id_fails() {
        let transport = FakeTransport::new(vec![FakeResponse::ok("abc", None).with_headers(vec![(
            Some(REQUEST_ID_HEADER.to_string()),
            Vec::new(),
        )])]);
        let fault = next_invocation(&transport, NEXT_URL, &NoopMetrics, &logger()).unwrap_err();

        assert_eq!(
            fault.message(),
            "Could find header, though its value collection is empty"
        );
    }

    #[test]
    fn test_next_invocation_with_blank_request_id_fails() {
        let transport = FakeTransport::new(vec![FakeResponse::ok("", Some("{}"))]);
        let fault = next_invocation(&transport, NEXT_URL, &NoopMetrics, &logger()).unwrap_err();

        assert_eq!(
            fault.message(),
            "Could find header, though its value collection is empty"
        );
        assert_eq!(
            fault.detail("requiredHeader"),
            Some(&Value::from(REQUEST_ID_HEADER))
        );
    }

    #[test]
    fn test_next_invocation_connection_failure() {
        let transport = FakeTransport::new(Vec::new());
        let fault = next_invocation(&transport, NEXT_URL, &NoopMetrics, &logger()).unwrap_err();

        assert_eq!(fault.message(), "Error executing http call");
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn test_respond_posts_to_request_url_with_bounded_timeout() {
        let transport = FakeTransport::new(vec![FakeResponse::ok("ignored", Some("accepted"))]);
        let configuration = LocalConfiguration::localhost(9001);
        let invocation = Invocation {
            request_id: "abc-123".to_string(),
            content_type: None,
            payload: None,
        };

        respond(
            &transport,
            &configuration,
            &invocation,
            r#"{"ok":true}"#,
            &NoopMetrics,
            &logger(),
        )
        .unwrap();

        assert_eq!(
            transport.calls()[0],
            r#"open POST http://127.0.0.1:9001/2018-06-01/runtime/invocation/abc-123/response read_timeout=1000 payload={"ok":true}"#
        );
    }

    #[test]
    fn test_respond_fails_on_error_status() {
        let transport = FakeTransport::new(vec![FakeResponse {
            error: Some("invalid request id".to_string()),
            ..FakeResponse::ok("ignored", None).with_code(400)
        }]);
        let configuration = LocalConfiguration::localhost(9001);
        let invocation = Invocation {
            request_id: "abc-123".to_string(),
            content_type: None,
            payload: None,
        };

        let fault = respond(
            &transport,
            &configuration,
            &invocation,
            "{}",
            &NoopMetrics,
            &logger(),
        )
        .unwrap_err();
        assert_eq!(
            fault.detail("ReadResponseCode.responseCode"),
            Some(&Value::from("400"))
        );
    }
}
