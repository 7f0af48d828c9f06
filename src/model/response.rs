use super::descriptor::Param;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Direct,
    PrimaryProxy,
    SecondaryProxy,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Direct => "direct",
            Transport::PrimaryProxy => "primary_proxy",
            Transport::SecondaryProxy => "secondary_proxy",
        }
    }
}

/// Raised by the executor when a body crossed the response ceiling; the
/// full body is dropped and `sample` carries the truncated view.
#[derive(Debug, Clone, Serialize)]
pub struct SizeExceeded {
    pub approx_bytes: usize,
    pub sample: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationSignal {
    /// true when the executor merged pages itself
    pub followed: bool,
    pub merged_pages: usize,
    pub warning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// What a transport produced, before classification.
#[derive(Debug, Clone, Serialize)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<Param>,
    pub body: Value,
    pub transport: Transport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_exceeded: Option<SizeExceeded>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationSignal>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
