use super::auth::AuthSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const GENERIC_INTENT: &str = "generic_request";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One header or query parameter. Kept as an ordered pair list rather
/// than a map so insertion order survives serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub key: String,
    pub value: String,
}

impl Param {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Canonical description of one HTTP call, produced by the cURL parser
/// or built directly from a form, then normalized before execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: Vec<Param>,
    #[serde(default)]
    pub query_params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default)]
    pub auth: AuthSpec,
    #[serde(default = "default_intent")]
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<String>,
    #[serde(default)]
    pub follow_pagination: bool,
}

fn default_intent() -> String {
    GENERIC_INTENT.to_string()
}

impl RequestDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            query_params: Vec::new(),
            body: None,
            auth: AuthSpec::None,
            intent: GENERIC_INTENT.to_string(),
            credential_ref: None,
            follow_pagination: false,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = intent.into();
        self
    }

    pub fn with_auth(mut self, auth: AuthSpec) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Param::new(key, value));
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push(Param::new(key, value));
        self
    }

    /// Accepts headers supplied as a plain key/value mapping (form input).
    pub fn headers_from_map<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in entries {
            self.headers.push(Param::new(key, value));
        }
        self
    }

    /// Accepts query parameters supplied as a plain key/value mapping.
    pub fn query_params_from_map<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in entries {
            self.query_params.push(Param::new(key, value));
        }
        self
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|h| h.key.eq_ignore_ascii_case(name))
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.key.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn has_query_param(&self, key: &str) -> bool {
        self.query_params
            .iter()
            .any(|p| p.key.eq_ignore_ascii_case(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_insertion_order() {
        let descriptor = RequestDescriptor::new("https://api.example.com")
            .header("X-First", "1")
            .header("X-Second", "2");
        assert_eq!(descriptor.headers[0].key, "X-First");
        assert_eq!(descriptor.headers[1].key, "X-Second");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let descriptor =
            RequestDescriptor::new("https://api.example.com").header("Authorization", "Bearer x");
        assert!(descriptor.has_header("authorization"));
        assert_eq!(descriptor.header_value("AUTHORIZATION"), Some("Bearer x"));
    }

    #[test]
    fn serde_uses_camel_case_field_names() {
        let descriptor = RequestDescriptor::new("https://api.example.com").query_param("page", "1");
        let value = serde_json::to_value(&descriptor).unwrap();
        assert!(value.get("queryParams").is_some());
        assert_eq!(value["intent"], "generic_request");
    }
}
