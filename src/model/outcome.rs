use super::descriptor::RequestDescriptor;
use crate::utils::redact::{is_sensitive_header, redact_object, redact_text};
use serde::Serialize;
use serde_json::Value;

/// Redacted view of the request attached to classified outcomes. Safe
/// to log and to surface in the admin UI: credentials never survive
/// the conversion from a descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct RequestContext {
    pub url: String,
    pub method: String,
    pub intent: String,
    pub auth: Value,
    pub headers: Value,
}

impl RequestContext {
    pub fn from_descriptor(descriptor: &RequestDescriptor) -> Self {
        let auth = serde_json::to_value(&descriptor.auth)
            .map(|v| redact_object(&v))
            .unwrap_or(Value::Null);
        let mut headers = serde_json::Map::new();
        for param in &descriptor.headers {
            let value = if is_sensitive_header(&param.key) {
                crate::constants::redaction::MARKER.to_string()
            } else {
                redact_text(&param.value, usize::MAX)
            };
            headers.insert(param.key.clone(), Value::String(value));
        }
        Self {
            url: redact_text(&descriptor.url, usize::MAX),
            method: descriptor.method.as_str().to_string(),
            intent: descriptor.intent.clone(),
            auth,
            headers: Value::Object(headers),
        }
    }
}

/// Classified result of one execution. Returned as data, never thrown:
/// callers branch on the variant instead of wrapping every call site in
/// error handling.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        data: Value,
    },
    TooLarge {
        approx_size_bytes: usize,
        truncated_data: Value,
        request: RequestContext,
    },
    Paginated {
        first_page: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        next_page_token: Option<String>,
        request: RequestContext,
    },
    AuthError {
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        message: String,
        request: RequestContext,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
    NetworkError {
        code: String,
        message: String,
        request: RequestContext,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
    ServerError {
        status: u16,
        message: String,
        request: RequestContext,
    },
    ClientError {
        status: u16,
        message: String,
        request: RequestContext,
    },
    UnknownError {
        message: String,
        request: RequestContext,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn variant(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::TooLarge { .. } => "too_large",
            Outcome::Paginated { .. } => "paginated",
            Outcome::AuthError { .. } => "auth_error",
            Outcome::NetworkError { .. } => "network_error",
            Outcome::ServerError { .. } => "server_error",
            Outcome::ClientError { .. } => "client_error",
            Outcome::UnknownError { .. } => "unknown_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AuthSpec;

    #[test]
    fn context_redacts_inline_auth() {
        let descriptor = RequestDescriptor::new("https://api.example.com/x").with_auth(
            AuthSpec::Bearer {
                token: "abc123".to_string(),
            },
        );
        let context = RequestContext::from_descriptor(&descriptor);
        assert_eq!(context.auth["token"], "[REDACTED]");
        assert_eq!(context.auth["type"], "bearer");
    }

    #[test]
    fn context_redacts_authorization_header() {
        let descriptor = RequestDescriptor::new("https://api.example.com/x")
            .header("Authorization", "Bearer abc123")
            .header("Accept", "application/json");
        let context = RequestContext::from_descriptor(&descriptor);
        assert_eq!(context.headers["Authorization"], "[REDACTED]");
        assert_eq!(context.headers["Accept"], "application/json");
    }
}
