use crate::constants::auth::{
    DEFAULT_API_KEY_HEADER, DEFAULT_EXPIRES_SECONDS, DEFAULT_TOKEN_PATH, EXPIRY_SKEW_SECONDS,
};
use crate::constants::network::TIMEOUT_TOKEN_MINT_MS;
use crate::errors::ApiError;
use crate::model::{ApiKeyLocation, AuthSpec, HttpMethod, Param, RequestDescriptor};
use crate::services::credentials::{CredentialStore, StoredCredentials};
use crate::services::logger::Logger;
use crate::services::token_cache::{TokenCache, TokenCacheEntry, TokenType};
use crate::utils::data_path::lookup_string;
use crate::utils::redact::redact_object;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Arc;

const AUTHORIZATION: &str = "Authorization";

/// Turns a descriptor's auth spec into concrete headers or query
/// params, minting bearer tokens on demand. Never mutates its input;
/// the resolved copy is what travels to the executor.
pub struct AuthResolver {
    client: reqwest::Client,
    cache: Arc<TokenCache>,
    credentials: Option<Arc<dyn CredentialStore>>,
    logger: Logger,
}

impl AuthResolver {
    pub fn new(
        cache: Arc<TokenCache>,
        credentials: Option<Arc<dyn CredentialStore>>,
        logger: Logger,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(TIMEOUT_TOKEN_MINT_MS))
            .build()
            .map_err(|err| ApiError::internal(format!("Failed to build mint client: {}", err)))?;
        Ok(Self {
            client,
            cache,
            credentials,
            logger,
        })
    }

    pub async fn resolve(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<RequestDescriptor, ApiError> {
        let mut out = descriptor.clone();

        if let Some(reference) = out.credential_ref.clone() {
            if out.auth.is_none() {
                out.auth = self.load_stored_auth(&reference).await?;
            }
        }

        match out.auth.clone() {
            AuthSpec::None => {}
            AuthSpec::Basic { username, password } => {
                if !out.has_header(AUTHORIZATION) {
                    let encoded = base64::engine::general_purpose::STANDARD
                        .encode(format!("{}:{}", username, password));
                    out.headers
                        .push(Param::new(AUTHORIZATION, format!("Basic {}", encoded)));
                }
            }
            AuthSpec::Bearer { token } | AuthSpec::Jwt { token } => {
                if !out.has_header(AUTHORIZATION) {
                    out.headers
                        .push(Param::new(AUTHORIZATION, format!("Bearer {}", token)));
                }
            }
            AuthSpec::JwtAuth {
                token_endpoint,
                token_method,
                token_headers,
                token_body,
                token_path,
                expires_in_seconds,
            } => {
                // An explicit Authorization header outranks minting; in
                // that case there is nothing to exchange.
                if !out.has_header(AUTHORIZATION) {
                    let token = self
                        .obtain_token(
                            &token_endpoint,
                            token_method,
                            &token_headers,
                            &token_body,
                            token_path.as_deref(),
                            expires_in_seconds,
                            out.credential_ref.as_deref().unwrap_or(&token_endpoint),
                        )
                        .await?;
                    out.headers
                        .push(Param::new(AUTHORIZATION, format!("Bearer {}", token)));
                }
            }
            AuthSpec::ApiKey {
                key,
                header_name,
                location,
            } => {
                let name = header_name.unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string());
                match location {
                    ApiKeyLocation::Header => {
                        if !out.has_header(&name) {
                            out.headers.push(Param::new(name, key));
                        }
                    }
                    ApiKeyLocation::Query => {
                        if !out.has_query_param(&name) {
                            out.query_params.push(Param::new(name, key));
                        }
                    }
                }
            }
        }

        Ok(out)
    }

    async fn load_stored_auth(&self, reference: &str) -> Result<AuthSpec, ApiError> {
        let store = self.credentials.as_ref().ok_or_else(|| {
            ApiError::auth("No credential store configured")
                .with_hint("Wire a CredentialStore into the pipeline to use stored credentials.")
        })?;
        let record = store.get(reference).await?.ok_or_else(|| {
            ApiError::auth(format!("No stored credentials for courier '{}'", reference))
                .with_code("CREDENTIALS_NOT_FOUND")
        })?;
        Ok(auth_from_stored(record))
    }

    #[allow(clippy::too_many_arguments)]
    async fn obtain_token(
        &self,
        endpoint: &str,
        method: HttpMethod,
        headers: &[Param],
        body: &Value,
        token_path: Option<&str>,
        expires_in_seconds: Option<i64>,
        owner_id: &str,
    ) -> Result<String, ApiError> {
        let key = TokenCache::mint_key(endpoint, body, owner_id);
        if let Some(entry) = self.cache.get(&key, EXPIRY_SKEW_SECONDS) {
            self.logger.debug(
                "Reusing cached token",
                Some(&serde_json::json!({"owner": owner_id})),
            );
            return Ok(entry.token);
        }

        let payload = self.mint(endpoint, method, headers, body).await?;
        let path = token_path.unwrap_or(DEFAULT_TOKEN_PATH);
        let token = lookup_string(&payload, path)
            .ok_or_else(|| ApiError::auth(format!("Token not found at path {}", path)))?;

        let now = Utc::now();
        let token_type = if crate::model::looks_like_jwt(&token) {
            TokenType::Jwt
        } else {
            TokenType::Bearer
        };
        let expires_at = match token_type {
            TokenType::Jwt => decode_jwt_expiry(&token),
            TokenType::Bearer => None,
        }
        .unwrap_or_else(|| {
            now + Duration::seconds(expires_in_seconds.unwrap_or(DEFAULT_EXPIRES_SECONDS))
        });

        self.cache.put(
            &key,
            TokenCacheEntry {
                token: token.clone(),
                token_type,
                issued_at: now,
                expires_at: Some(expires_at),
                owner_id: owner_id.to_string(),
            },
        );
        self.logger.info(
            "Minted new token",
            Some(&serde_json::json!({"owner": owner_id, "expires_at": expires_at.to_rfc3339()})),
        );
        Ok(token)
    }

    async fn mint(
        &self,
        endpoint: &str,
        method: HttpMethod,
        headers: &[Param],
        body: &Value,
    ) -> Result<Value, ApiError> {
        let mut request = self.client.request(method.to_reqwest(), endpoint);
        let mut form_encoded = false;
        for header in headers {
            if header.key.eq_ignore_ascii_case("content-type")
                && header.value.contains("x-www-form-urlencoded")
            {
                form_encoded = true;
            }
            request = request.header(header.key.as_str(), header.value.as_str());
        }
        if method != HttpMethod::Get && !body.is_null() {
            request = if form_encoded {
                let pairs = form_pairs(body);
                let encoded = serde_urlencoded::to_string(&pairs).map_err(|_| {
                    ApiError::auth("Token body could not be form-encoded")
                        .with_hint("Form-encoded token bodies must be flat key/value objects.")
                })?;
                request.body(encoded)
            } else {
                request.json(body)
            };
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                ApiError::auth(format!("Token endpoint {} timed out", endpoint))
            } else {
                ApiError::auth(format!("Token endpoint request failed: {}", err))
            }
        })?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(ApiError::auth(format!(
                "Token endpoint returned status {}",
                status.as_u16()
            ))
            .with_details(redact_object(&payload)));
        }
        Ok(payload)
    }
}

fn auth_from_stored(record: StoredCredentials) -> AuthSpec {
    if let Some(token) = record.token {
        return AuthSpec::bearer_or_jwt(token);
    }
    if let Some(key) = record.api_key {
        return AuthSpec::ApiKey {
            key,
            header_name: None,
            location: ApiKeyLocation::Header,
        };
    }
    match (record.username, record.password) {
        (Some(username), password) => AuthSpec::Basic {
            username,
            password: password.unwrap_or_default(),
        },
        _ => AuthSpec::None,
    }
}

fn form_pairs(body: &Value) -> Vec<(String, String)> {
    match body {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let rendered = v
                    .as_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| v.to_string());
                (k.clone(), rendered)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Reads `exp` (epoch seconds) out of a JWT's payload segment.
fn decode_jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.as_bytes())
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(payload.as_bytes()))
        .ok()?;
    let claims: Value = serde_json::from_slice(&decoded).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    DateTime::<Utc>::from_timestamp(exp, 0)
}
