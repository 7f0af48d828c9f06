use crate::constants::limits::AUTH_PHRASE_SCAN_BYTES;
use crate::errors::{ApiError, ApiErrorKind};
use crate::model::{Outcome, RawResponse, RequestContext, RequestDescriptor};
use crate::pipeline::executor::PRIVATE_NETWORK_HINT;
use crate::services::logger::Logger;
use crate::utils::redact::redact_text;
use crate::utils::text::truncate_utf8_prefix;
use serde_json::Value;

const AUTH_PHRASES: &[&str] = &[
    "unauthorized",
    "forbidden",
    "token expired",
    "invalid token",
    "authentication failed",
];

/// Folds a raw execution result into a classified outcome. Everything
/// attached to the outcome has been through redaction; the original
/// error and body never reach the caller verbatim.
pub fn classify(
    result: Result<RawResponse, ApiError>,
    descriptor: &RequestDescriptor,
    logger: &Logger,
) -> Outcome {
    let request = RequestContext::from_descriptor(descriptor);
    let outcome = match result {
        Err(err) => classify_error(err, request),
        Ok(raw) => classify_response(raw, request),
    };
    logger.info(
        "Classified outcome",
        Some(&serde_json::json!({
            "outcome": outcome.variant(),
            "intent": descriptor.intent,
        })),
    );
    outcome
}

fn classify_error(err: ApiError, request: RequestContext) -> Outcome {
    let message = redact_text(&err.message, usize::MAX);
    match err.kind {
        ApiErrorKind::Timeout => Outcome::NetworkError {
            code: "TIMEOUT".to_string(),
            message,
            request,
            suggestion: Some(
                "The API did not respond in time; retry or raise the timeout.".to_string(),
            ),
        },
        ApiErrorKind::Auth => Outcome::AuthError {
            status: None,
            message,
            request,
            suggestion: Some(
                "Check the courier credentials and token endpoint configuration.".to_string(),
            ),
        },
        ApiErrorKind::Transport => {
            let suggestion = if err.code == "PRIVATE_NETWORK" {
                Some(PRIVATE_NETWORK_HINT.to_string())
            } else if err.code == "CONNECTION_FAILED" {
                Some("Verify the hostname resolves and the API is reachable.".to_string())
            } else {
                None
            };
            Outcome::NetworkError {
                code: err.code,
                message,
                request,
                suggestion,
            }
        }
        _ => Outcome::UnknownError { message, request },
    }
}

fn classify_response(raw: RawResponse, request: RequestContext) -> Outcome {
    if raw.status == 401 || raw.status == 403 || body_has_auth_phrase(&raw.body) {
        return Outcome::AuthError {
            status: Some(raw.status),
            message: auth_message(&raw),
            request,
            suggestion: Some("The API rejected the credentials; re-check them.".to_string()),
        };
    }
    if let Some(exceeded) = raw.size_exceeded {
        return Outcome::TooLarge {
            approx_size_bytes: exceeded.approx_bytes,
            truncated_data: exceeded.sample,
            request,
        };
    }
    if raw.status >= 500 {
        return Outcome::ServerError {
            status: raw.status,
            message: response_message(&raw),
            request,
        };
    }
    if raw.status >= 400 {
        return Outcome::ClientError {
            status: raw.status,
            message: response_message(&raw),
            request,
        };
    }
    if let Some(pagination) = &raw.pagination {
        if !pagination.followed {
            return Outcome::Paginated {
                next_page_token: pagination.next_token.clone(),
                first_page: raw.body,
                request,
            };
        }
    }
    if raw.status < 400 {
        return Outcome::Success { data: raw.body };
    }
    Outcome::UnknownError {
        message: format!("Unrecognized response with status {}", raw.status),
        request,
    }
}

/// Bounded scan of the serialized body for authentication failure
/// phrases; proxied APIs often wrap a 401 in a 200 envelope.
fn body_has_auth_phrase(body: &Value) -> bool {
    if body.is_null() {
        return false;
    }
    let serialized = body.to_string();
    let prefix = truncate_utf8_prefix(&serialized, AUTH_PHRASE_SCAN_BYTES).to_lowercase();
    AUTH_PHRASES.iter().any(|phrase| prefix.contains(phrase))
}

fn auth_message(raw: &RawResponse) -> String {
    match raw.status {
        401 => "Authentication failed (401 Unauthorized)".to_string(),
        403 => "Access denied (403 Forbidden)".to_string(),
        _ => "The response body reports an authentication failure".to_string(),
    }
}

fn response_message(raw: &RawResponse) -> String {
    let from_body = raw
        .body
        .get("message")
        .or_else(|| raw.body.get("error"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let message = from_body.unwrap_or_else(|| {
        if raw.status_text.is_empty() {
            format!("HTTP {}", raw.status)
        } else {
            format!("HTTP {} {}", raw.status, raw.status_text)
        }
    });
    redact_text(&message, usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuthSpec, Param, Transport};
    use serde_json::json;

    fn raw(status: u16, body: Value) -> RawResponse {
        RawResponse {
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body,
            transport: Transport::Direct,
            size_exceeded: None,
            pagination: None,
        }
    }

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor::new("https://api.example.com/x").with_intent("fetch_courier_data")
    }

    fn logger() -> Logger {
        Logger::new("test")
    }

    #[test]
    fn success_passes_body_through() {
        let outcome = classify(Ok(raw(200, json!({"data": [1]}))), &descriptor(), &logger());
        match outcome {
            Outcome::Success { data } => assert_eq!(data, json!({"data": [1]})),
            other => panic!("unexpected outcome: {}", other.variant()),
        }
    }

    #[test]
    fn status_401_is_an_auth_error() {
        let outcome = classify(Ok(raw(401, json!({}))), &descriptor(), &logger());
        assert_eq!(outcome.variant(), "auth_error");
    }

    #[test]
    fn auth_phrase_in_body_is_an_auth_error() {
        let outcome = classify(
            Ok(raw(200, json!({"error": "Token expired, please refresh"}))),
            &descriptor(),
            &logger(),
        );
        assert_eq!(outcome.variant(), "auth_error");
    }

    #[test]
    fn statuses_split_client_and_server_errors() {
        assert_eq!(
            classify(Ok(raw(404, json!({}))), &descriptor(), &logger()).variant(),
            "client_error"
        );
        assert_eq!(
            classify(Ok(raw(503, json!({}))), &descriptor(), &logger()).variant(),
            "server_error"
        );
    }

    #[test]
    fn timeout_errors_classify_as_network() {
        let outcome = classify(
            Err(ApiError::timeout("Request to 'api.example.com' timed out")),
            &descriptor(),
            &logger(),
        );
        match outcome {
            Outcome::NetworkError { code, .. } => assert_eq!(code, "TIMEOUT"),
            other => panic!("unexpected outcome: {}", other.variant()),
        }
    }

    #[test]
    fn private_network_rejection_carries_suggestion() {
        let err = ApiError::transport("Cannot reach private or loopback address '127.0.0.1'")
            .with_code("PRIVATE_NETWORK")
            .with_hint(PRIVATE_NETWORK_HINT);
        let outcome = classify(Err(err), &descriptor(), &logger());
        match outcome {
            Outcome::NetworkError {
                code, suggestion, ..
            } => {
                assert_eq!(code, "PRIVATE_NETWORK");
                assert_eq!(suggestion.as_deref(), Some(PRIVATE_NETWORK_HINT));
            }
            other => panic!("unexpected outcome: {}", other.variant()),
        }
    }

    #[test]
    fn mint_failures_become_auth_outcomes() {
        let outcome = classify(
            Err(ApiError::auth("Token not found at path access_token")),
            &descriptor(),
            &logger(),
        );
        assert_eq!(outcome.variant(), "auth_error");
    }

    #[test]
    fn size_exceeded_wins_over_success() {
        let mut response = raw(200, Value::Null);
        response.size_exceeded = Some(crate::model::SizeExceeded {
            approx_bytes: 8_000_000,
            sample: json!([1, 2, 3]),
        });
        let outcome = classify(Ok(response), &descriptor(), &logger());
        match outcome {
            Outcome::TooLarge {
                approx_size_bytes, ..
            } => assert_eq!(approx_size_bytes, 8_000_000),
            other => panic!("unexpected outcome: {}", other.variant()),
        }
    }

    #[test]
    fn unfollowed_pagination_surfaces_first_page() {
        let mut response = raw(200, json!({"data": [1], "next_page_url": "https://x/p2"}));
        response.pagination = Some(crate::model::PaginationSignal {
            followed: false,
            merged_pages: 1,
            warning: false,
            next_token: Some("https://x/p2".to_string()),
        });
        let outcome = classify(Ok(response), &descriptor(), &logger());
        match outcome {
            Outcome::Paginated {
                next_page_token, ..
            } => assert_eq!(next_page_token.as_deref(), Some("https://x/p2")),
            other => panic!("unexpected outcome: {}", other.variant()),
        }
    }

    #[test]
    fn classified_context_redacts_descriptor_credentials() {
        let descriptor = RequestDescriptor::new("https://api.example.com/x")
            .with_auth(AuthSpec::Bearer {
                token: "abc123".to_string(),
            });
        let mut with_header = descriptor.clone();
        with_header.headers.push(Param::new("Authorization", "Bearer abc123"));
        let outcome = classify(Ok(raw(500, json!({}))), &with_header, &logger());
        let serialized = serde_json::to_string(&outcome).unwrap();
        assert!(!serialized.contains("abc123"));
        assert!(serialized.contains("[REDACTED]"));
    }
}
