use crate::constants::limits::{RESPONSE_CEILING_BYTES, TRUNCATED_SAMPLE_ITEMS};
use crate::constants::network::{TIMEOUT_DIRECT_MS, TIMEOUT_PROXY_MS};
use crate::constants::pagination::{MAX_PAGES, PAGE_PARAM};
use crate::constants::private_networks::{LOOPBACK_NAMES, PRIVATE_PREFIXES};
use crate::constants::env as env_constants;
use crate::errors::ApiError;
use crate::model::{
    HttpMethod, PaginationSignal, Param, RawResponse, RequestDescriptor, SizeExceeded, Transport,
};
use crate::pipeline::extract::truncated_sample;
use crate::services::logger::Logger;
use crate::utils::data_path::{lookup_path, lookup_string};
use serde_json::Value;
use std::net::Ipv4Addr;
use std::time::Duration;
use url::Url;

pub const PRIVATE_NETWORK_HINT: &str =
    "Cannot reach private IP addresses; use a public endpoint.";

const NEXT_URL_PATHS: &[&str] = &["next_page_url", "pagination.next_page", "meta.pagination.next"];
const MORE_FLAG_PATHS: &[&str] = &["has_more", "hasMore", "pagination.has_more"];

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub primary_proxy_url: Option<String>,
    pub secondary_proxy_url: Option<String>,
    pub direct_timeout_ms: u64,
    pub proxy_timeout_ms: u64,
    pub response_ceiling_bytes: usize,
    pub max_pages: usize,
    /// Overall deadline across the whole fallback chain; callers
    /// abandoning a flow can also pass one per call.
    pub deadline_ms: Option<u64>,
    /// Self-hosted deployments that genuinely sit next to the courier
    /// API can disable the private-network guard.
    pub allow_private_networks: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            primary_proxy_url: std::env::var(env_constants::PROXY_URL).ok(),
            secondary_proxy_url: std::env::var(env_constants::FALLBACK_PROXY_URL).ok(),
            direct_timeout_ms: TIMEOUT_DIRECT_MS,
            proxy_timeout_ms: TIMEOUT_PROXY_MS,
            response_ceiling_bytes: RESPONSE_CEILING_BYTES,
            max_pages: MAX_PAGES,
            deadline_ms: None,
            allow_private_networks: false,
        }
    }
}

/// Executes a resolved descriptor: direct call first, then each
/// configured proxy, strictly in order. Only network-level failures and
/// 5xx answers move the chain forward; a 4xx is a real answer.
pub struct RequestExecutor {
    config: ExecutorConfig,
    client: reqwest::Client,
    logger: Logger,
}

impl RequestExecutor {
    pub fn new(config: ExecutorConfig, logger: Logger) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|err| ApiError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            config,
            client,
            logger,
        })
    }

    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, ApiError> {
        self.execute_with_deadline(descriptor, self.config.deadline_ms.map(Duration::from_millis))
            .await
    }

    pub async fn execute_with_deadline(
        &self,
        descriptor: &RequestDescriptor,
        deadline: Option<Duration>,
    ) -> Result<RawResponse, ApiError> {
        if !self.config.allow_private_networks {
            if let Some(host) = private_network_host(&descriptor.url) {
                return Err(ApiError::transport(format!(
                    "Cannot reach private or loopback address '{}'",
                    host
                ))
                .with_code("PRIVATE_NETWORK")
                .with_hint(PRIVATE_NETWORK_HINT));
            }
        }

        let work = self.run(descriptor);
        let mut raw = match deadline {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| ApiError::timeout("Execution deadline exceeded"))??,
            None => work.await?,
        };
        apply_size_ceiling(&mut raw, self.config.response_ceiling_bytes);
        Ok(raw)
    }

    async fn run(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, ApiError> {
        let mut raw = self.transport_chain(descriptor).await?;
        if descriptor.follow_pagination {
            self.follow_pagination(descriptor, &mut raw).await;
        } else if let Some(shape) = detect_pagination(&raw.body) {
            raw.pagination = Some(PaginationSignal {
                followed: false,
                merged_pages: 1,
                warning: false,
                next_token: shape.token(),
            });
        }
        Ok(raw)
    }

    async fn transport_chain(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<RawResponse, ApiError> {
        let mut last_error: Option<ApiError> = None;
        let mut last_server_error: Option<RawResponse> = None;

        match self.direct(descriptor).await {
            Ok(raw) if raw.status < 500 => return Ok(raw),
            Ok(raw) => {
                self.logger.warn(
                    "Direct call returned server error, falling back to proxy",
                    Some(&serde_json::json!({"status": raw.status, "intent": descriptor.intent})),
                );
                last_server_error = Some(raw);
            }
            Err(err) => {
                self.logger.warn(
                    "Direct call failed, falling back to proxy",
                    Some(&serde_json::json!({"code": err.code, "intent": descriptor.intent})),
                );
                last_error = Some(err);
            }
        }

        let proxies = [
            (self.config.primary_proxy_url.as_deref(), Transport::PrimaryProxy),
            (self.config.secondary_proxy_url.as_deref(), Transport::SecondaryProxy),
        ];
        for (proxy_url, transport) in proxies {
            let Some(proxy_url) = proxy_url else { continue };
            match self.via_proxy(descriptor, proxy_url, transport).await {
                Ok(raw) if raw.status < 500 => return Ok(raw),
                Ok(raw) => last_server_error = Some(raw),
                Err(err) => {
                    self.logger.warn(
                        "Proxy transport failed",
                        Some(&serde_json::json!({"transport": transport.as_str(), "code": err.code})),
                    );
                    last_error = Some(err);
                }
            }
        }

        // A 5xx answer from any transport is still an answer; only a
        // chain with no HTTP response at all is a transport failure.
        if let Some(raw) = last_server_error {
            return Ok(raw);
        }
        let last = last_error.unwrap_or_else(|| ApiError::transport("No transport available"));
        Err(
            ApiError::transport(format!("All transports failed: {}", last.message))
                .with_code(last.code.clone())
                .with_details(serde_json::json!({"last_error": last.message})),
        )
    }

    async fn direct(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, ApiError> {
        let url = compose_url(descriptor)?;
        let host = url.host_str().unwrap_or_default().to_string();
        let mut request = self
            .client
            .request(descriptor.method.to_reqwest(), url)
            .timeout(Duration::from_millis(self.config.direct_timeout_ms));
        for header in &descriptor.headers {
            request = request.header(header.key.as_str(), header.value.as_str());
        }
        if let Some(body) = request_body(descriptor) {
            request = match body {
                Value::String(text) => request.body(text),
                other => request.json(&other),
            };
        }
        let response = request
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, &host))?;
        raw_from_response(response, Transport::Direct).await
    }

    async fn via_proxy(
        &self,
        descriptor: &RequestDescriptor,
        proxy_url: &str,
        transport: Transport,
    ) -> Result<RawResponse, ApiError> {
        let proxy_host = Url::parse(proxy_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_default();
        let response = self
            .client
            .post(proxy_url)
            .timeout(Duration::from_millis(self.config.proxy_timeout_ms))
            .json(&proxy_envelope(descriptor))
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, &proxy_host))?;
        let raw = raw_from_response(response, transport).await?;
        Ok(unwrap_proxy_envelope(raw))
    }

    /// Fetches follow-up pages and merges their array fields into the
    /// first body. Stops early rather than crossing the size ceiling,
    /// and a failing page ends the merge instead of failing the call.
    async fn follow_pagination(&self, descriptor: &RequestDescriptor, first: &mut RawResponse) {
        let mut merged = first.body.clone();
        let mut pages = 1;
        let mut warning = false;
        let mut page_number: u64 = pagination_start(descriptor) + 1;
        let mut next = detect_pagination(&first.body);

        while let Some(shape) = next.take() {
            if pages >= self.config.max_pages {
                warning = true;
                break;
            }
            let page_descriptor = match page_request(descriptor, &shape, page_number) {
                Some(d) => d,
                None => break,
            };
            let page = match self.transport_chain(&page_descriptor).await {
                Ok(page) if page.status < 400 => page,
                Ok(_) | Err(_) => {
                    warning = true;
                    break;
                }
            };
            if approx_size(&merged) + approx_size(&page.body)
                > self.config.response_ceiling_bytes
            {
                warning = true;
                break;
            }
            merge_array_fields(&mut merged, &page.body);
            pages += 1;
            page_number += 1;
            next = detect_pagination(&page.body);
        }

        if warning {
            self.logger.warn(
                "Pagination stopped early",
                Some(&serde_json::json!({"pages": pages, "intent": descriptor.intent})),
            );
        }
        first.body = merged;
        first.pagination = Some(PaginationSignal {
            followed: true,
            merged_pages: pages,
            warning,
            next_token: None,
        });
    }
}

#[derive(Debug, Clone)]
enum PaginationShape {
    NextUrl(String),
    MoreFlag,
}

impl PaginationShape {
    fn token(&self) -> Option<String> {
        match self {
            PaginationShape::NextUrl(url) => Some(url.clone()),
            PaginationShape::MoreFlag => None,
        }
    }
}

fn detect_pagination(body: &Value) -> Option<PaginationShape> {
    for path in NEXT_URL_PATHS {
        if let Some(next) = lookup_string(body, path) {
            if !next.trim().is_empty() {
                return Some(PaginationShape::NextUrl(next));
            }
        }
    }
    for path in MORE_FLAG_PATHS {
        if lookup_path(body, path).and_then(|v| v.as_bool()) == Some(true) {
            return Some(PaginationShape::MoreFlag);
        }
    }
    None
}

fn pagination_start(descriptor: &RequestDescriptor) -> u64 {
    descriptor
        .query_params
        .iter()
        .find(|p| p.key == PAGE_PARAM)
        .and_then(|p| p.value.parse().ok())
        .unwrap_or(1)
}

fn page_request(
    descriptor: &RequestDescriptor,
    shape: &PaginationShape,
    page_number: u64,
) -> Option<RequestDescriptor> {
    let mut next = descriptor.clone();
    next.follow_pagination = false;
    match shape {
        PaginationShape::NextUrl(raw) => {
            let resolved = if raw.starts_with("http://") || raw.starts_with("https://") {
                raw.clone()
            } else {
                Url::parse(&descriptor.url).ok()?.join(raw).ok()?.to_string()
            };
            next.url = resolved;
            next.query_params.clear();
        }
        PaginationShape::MoreFlag => {
            next.query_params.retain(|p| p.key != PAGE_PARAM);
            next.query_params
                .push(Param::new(PAGE_PARAM, page_number.to_string()));
        }
    }
    Some(next)
}

fn merge_array_fields(merged: &mut Value, page: &Value) {
    match (merged, page) {
        (Value::Array(target), Value::Array(extra)) => {
            target.extend(extra.iter().cloned());
        }
        (Value::Object(target), Value::Object(extra)) => {
            for (key, value) in target.iter_mut() {
                if let (Value::Array(items), Some(Value::Array(more))) = (&mut *value, extra.get(key))
                {
                    items.extend(more.iter().cloned());
                }
            }
        }
        _ => {}
    }
}

pub fn approx_size(body: &Value) -> usize {
    serde_json::to_string(body).map(|s| s.len()).unwrap_or(0)
}

fn apply_size_ceiling(raw: &mut RawResponse, ceiling: usize) {
    let approx = approx_size(&raw.body);
    if approx <= ceiling {
        return;
    }
    let sample = truncated_sample(&raw.body, TRUNCATED_SAMPLE_ITEMS);
    raw.size_exceeded = Some(SizeExceeded {
        approx_bytes: approx,
        sample,
    });
    raw.body = Value::Null;
}

fn request_body(descriptor: &RequestDescriptor) -> Option<Value> {
    if descriptor.method == HttpMethod::Get {
        return None;
    }
    match &descriptor.body {
        None | Some(Value::Null) => None,
        Some(body) => Some(body.clone()),
    }
}

fn compose_url(descriptor: &RequestDescriptor) -> Result<Url, ApiError> {
    let mut url = Url::parse(&descriptor.url)
        .map_err(|_| ApiError::validation(format!("Invalid URL: {}", descriptor.url)))?;
    if !descriptor.query_params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for param in &descriptor.query_params {
            pairs.append_pair(&param.key, &param.value);
        }
    }
    Ok(url)
}

fn proxy_envelope(descriptor: &RequestDescriptor) -> Value {
    let headers: serde_json::Map<String, Value> = descriptor
        .headers
        .iter()
        .map(|h| (h.key.clone(), Value::String(h.value.clone())))
        .collect();
    let query: serde_json::Map<String, Value> = descriptor
        .query_params
        .iter()
        .map(|p| (p.key.clone(), Value::String(p.value.clone())))
        .collect();
    serde_json::json!({
        "url": descriptor.url,
        "method": descriptor.method.as_str(),
        "headers": headers,
        "queryParams": query,
        "body": descriptor.body,
        "auth": serde_json::to_value(&descriptor.auth).unwrap_or(Value::Null),
        "apiIntent": descriptor.intent,
    })
}

/// Proxies report upstream failures as `{error:true, status, ...}`;
/// fold that back into a status-bearing response so classification
/// sees the upstream's answer.
fn unwrap_proxy_envelope(raw: RawResponse) -> RawResponse {
    let is_envelope = raw.body.get("error").and_then(|v| v.as_bool()) == Some(true);
    if !is_envelope {
        return raw;
    }
    let status = raw
        .body
        .get("status")
        .and_then(|v| v.as_u64())
        .map(|s| s as u16)
        .unwrap_or(502);
    let status_text = raw
        .body
        .get("statusText")
        .and_then(|v| v.as_str())
        .unwrap_or("Bad Gateway")
        .to_string();
    let message = raw
        .body
        .get("message")
        .cloned()
        .unwrap_or(Value::Null);
    let details = raw.body.get("details").cloned().unwrap_or(Value::Null);
    RawResponse {
        status,
        status_text,
        body: serde_json::json!({"message": message, "details": details}),
        ..raw
    }
}

async fn raw_from_response(
    response: reqwest::Response,
    transport: Transport,
) -> Result<RawResponse, ApiError> {
    let status = response.status();
    let host = response
        .url()
        .host_str()
        .unwrap_or_default()
        .to_string();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| Param::new(name.as_str(), v))
        })
        .collect();
    let text = response
        .text()
        .await
        .map_err(|err| map_reqwest_error(err, &host))?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok(RawResponse {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("").to_string(),
        headers,
        body,
        transport,
        size_exceeded: None,
        pagination: None,
    })
}

fn map_reqwest_error(err: reqwest::Error, host: &str) -> ApiError {
    if err.is_timeout() {
        return ApiError::timeout(format!("Request to '{}' timed out", host));
    }
    if err.is_connect() {
        return ApiError::transport(format!(
            "Could not reach host '{}': connection failed",
            host
        ))
        .with_code("CONNECTION_FAILED");
    }
    ApiError::transport(err.to_string()).with_code("NETWORK_ERROR")
}

/// Hostname when the URL points at a loopback or private network.
pub fn private_network_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed
        .host_str()?
        .trim_matches(|c| c == '[' || c == ']')
        .to_lowercase();
    if LOOPBACK_NAMES.contains(&host.as_str()) {
        return Some(host);
    }
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        if ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified() {
            return Some(host);
        }
    }
    if PRIVATE_PREFIXES.iter().any(|prefix| host.starts_with(prefix)) {
        return Some(host);
    }
    None
}
