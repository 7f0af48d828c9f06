use crate::errors::ApiError;
use crate::model::{HttpMethod, RequestDescriptor, GENERIC_INTENT};
use serde_json::Value;
use std::collections::HashSet;

/// Fills defaults and enforces the descriptor invariants before the
/// request moves on to auth resolution. Idempotent.
pub fn normalize(descriptor: RequestDescriptor) -> Result<RequestDescriptor, ApiError> {
    let mut out = descriptor;

    out.url = out.url.trim().to_string();
    if out.url.is_empty() {
        return Err(ApiError::validation("URL is required")
            .with_hint("Provide an absolute URL, or paste a cURL command that contains one."));
    }
    if !out.url.starts_with("http://") && !out.url.starts_with("https://") {
        out.url = format!("https://{}", out.url);
    }

    if out.intent.trim().is_empty() {
        out.intent = GENERIC_INTENT.to_string();
    }

    match &out.body {
        None => out.body = Some(Value::Object(serde_json::Map::new())),
        Some(body) => {
            // A real body on a GET means the method was never set; a
            // request with a payload is a POST.
            if out.method == HttpMethod::Get && has_payload(body) {
                out.method = HttpMethod::Post;
            }
        }
    }

    // Params already embedded in the URL win over the supplied list.
    let embedded = embedded_query_keys(&out.url);
    out.query_params.retain(|p| !embedded.contains(&p.key));

    // Headers deduplicate case-insensitively, first occurrence wins.
    let mut seen = HashSet::new();
    out.headers.retain(|h| seen.insert(h.key.to_lowercase()));

    Ok(out)
}

fn has_payload(body: &Value) -> bool {
    match body {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

fn embedded_query_keys(url: &str) -> HashSet<String> {
    let Some((_, query)) = url.split_once('?') else {
        return HashSet::new();
    };
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let raw_key = pair.split_once('=').map(|(k, _)| k).unwrap_or(pair);
            urlencoding::decode(raw_key)
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| raw_key.to_string())
        })
        .collect()
}
