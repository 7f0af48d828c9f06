use super::descriptor::{HttpMethod, Param};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyLocation {
    #[default]
    Header,
    Query,
}

/// How a request authenticates. `JwtAuth` describes how to mint a
/// token, not the token itself; the resolver exchanges it for a
/// `Bearer` header at execution time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthSpec {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    Jwt {
        token: String,
    },
    JwtAuth {
        token_endpoint: String,
        #[serde(default = "default_token_method")]
        token_method: HttpMethod,
        #[serde(default)]
        token_headers: Vec<Param>,
        #[serde(default)]
        token_body: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expires_in_seconds: Option<i64>,
    },
    ApiKey {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        header_name: Option<String>,
        #[serde(default)]
        location: ApiKeyLocation,
    },
}

fn default_token_method() -> HttpMethod {
    HttpMethod::Post
}

impl AuthSpec {
    /// Classifies a raw bearer token: three dot-separated segments make
    /// it a JWT, anything else is an opaque bearer token.
    pub fn bearer_or_jwt(token: impl Into<String>) -> Self {
        let token = token.into();
        if looks_like_jwt(&token) {
            AuthSpec::Jwt { token }
        } else {
            AuthSpec::Bearer { token }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, AuthSpec::None)
    }
}

pub fn looks_like_jwt(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_segment_tokens_classify_as_jwt() {
        assert!(matches!(
            AuthSpec::bearer_or_jwt("aaa.bbb.ccc"),
            AuthSpec::Jwt { .. }
        ));
        assert!(matches!(
            AuthSpec::bearer_or_jwt("opaque-token"),
            AuthSpec::Bearer { .. }
        ));
        assert!(matches!(
            AuthSpec::bearer_or_jwt("a.b"),
            AuthSpec::Bearer { .. }
        ));
        assert!(matches!(
            AuthSpec::bearer_or_jwt("a..c"),
            AuthSpec::Bearer { .. }
        ));
    }

    #[test]
    fn serde_tags_on_type() {
        let spec = AuthSpec::Basic {
            username: "alice".to_string(),
            password: "secret".to_string(),
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["type"], "basic");

        let parsed: AuthSpec =
            serde_json::from_value(serde_json::json!({"type": "none"})).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn jwt_auth_defaults_apply_on_deserialize() {
        let parsed: AuthSpec = serde_json::from_value(serde_json::json!({
            "type": "jwt_auth",
            "token_endpoint": "https://auth.example.com/token",
        }))
        .unwrap();
        match parsed {
            AuthSpec::JwtAuth {
                token_method,
                token_path,
                expires_in_seconds,
                ..
            } => {
                assert_eq!(token_method, HttpMethod::Post);
                assert!(token_path.is_none());
                assert!(expires_in_seconds.is_none());
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
