use crate::errors::ApiError;
use crate::model::{AuthSpec, HttpMethod, Param, RequestDescriptor};
use crate::utils::text::collapse_line_continuations;
use base64::Engine;
use serde_json::Value;

/// Parses a pasted cURL command into a canonical descriptor.
///
/// Supported flags: `-X/--request`, `-H/--header`, `-d/--data` (and the
/// `--data-raw` alias curl emits when copying from browser devtools),
/// `-u/--user`. Anything else is ignored rather than rejected so that
/// commands copied from shells with extra options still import.
pub fn parse(curl_text: &str) -> Result<RequestDescriptor, ApiError> {
    let trimmed = curl_text.trim();
    if trimmed != "curl" && !trimmed.starts_with("curl ") && !trimmed.starts_with("curl\t") {
        return Err(ApiError::parse("Input is not a cURL command")
            .with_hint("Paste a command that starts with 'curl'."));
    }

    let collapsed = collapse_line_continuations(trimmed);
    let tokens = tokenize(&collapsed);

    let mut method: Option<HttpMethod> = None;
    let mut headers: Vec<Param> = Vec::new();
    let mut body_raw: Option<String> = None;
    let mut user: Option<String> = None;
    let mut candidates: Vec<String> = Vec::new();

    let mut index = 1; // skip the leading "curl"
    while index < tokens.len() {
        match tokens[index].as_str() {
            "-X" | "--request" => {
                index += 1;
                if let Some(token) = tokens.get(index) {
                    method = HttpMethod::from_token(token);
                }
            }
            "-H" | "--header" => {
                index += 1;
                if let Some(raw) = tokens.get(index) {
                    if let Some((key, value)) = raw.split_once(':') {
                        headers.push(Param::new(key.trim(), value.trim()));
                    }
                }
            }
            "-d" | "--data" | "--data-raw" => {
                index += 1;
                body_raw = tokens.get(index).cloned();
            }
            "-u" | "--user" => {
                index += 1;
                user = tokens.get(index).cloned();
            }
            flag if flag.starts_with('-') => {}
            other => candidates.push(other.to_string()),
        }
        index += 1;
    }

    let raw_url = locate_url(&candidates)
        .ok_or_else(|| ApiError::parse("No URL found in cURL command"))?;
    let (url, query_params) = split_query(&ensure_scheme(&raw_url));

    // Header-derived auth; the consumed Authorization header is dropped
    // and re-attached by the resolver, keeping the header list free of
    // credentials.
    let mut auth = AuthSpec::None;
    let mut kept_headers = Vec::with_capacity(headers.len());
    for header in headers {
        if header.key.eq_ignore_ascii_case("authorization") {
            if let Some(derived) = auth_from_authorization(&header.value) {
                auth = derived;
                continue;
            }
        }
        kept_headers.push(header);
    }

    // -u is processed after the header scan, so it wins when both are present.
    if let Some(user) = user {
        let (username, password) = match user.split_once(':') {
            Some((u, p)) => (u.to_string(), p.to_string()),
            None => (user, String::new()),
        };
        auth = AuthSpec::Basic { username, password };
    }

    let body = body_raw.map(|raw| {
        serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw))
    });
    let method = match (method, &body) {
        (Some(explicit), _) => explicit,
        (None, Some(_)) => HttpMethod::Post,
        (None, None) => HttpMethod::Get,
    };

    let mut descriptor = RequestDescriptor::new(url)
        .with_method(method)
        .with_auth(auth);
    descriptor.headers = kept_headers;
    descriptor.query_params = query_params;
    descriptor.body = body;
    Ok(descriptor)
}

/// Renders a descriptor back into an equivalent cURL command. Basic
/// auth comes out as `-u`; bearer tokens as an Authorization header.
pub fn to_curl(descriptor: &RequestDescriptor) -> String {
    let mut parts = vec!["curl".to_string()];

    if descriptor.method != HttpMethod::Get {
        parts.push("-X".to_string());
        parts.push(descriptor.method.as_str().to_string());
    }
    for header in &descriptor.headers {
        parts.push("-H".to_string());
        parts.push(shell_quote(&format!("{}: {}", header.key, header.value)));
    }
    match &descriptor.auth {
        AuthSpec::Basic { username, password } => {
            parts.push("-u".to_string());
            parts.push(shell_quote(&format!("{}:{}", username, password)));
        }
        AuthSpec::Bearer { token } | AuthSpec::Jwt { token } => {
            parts.push("-H".to_string());
            parts.push(shell_quote(&format!("Authorization: Bearer {}", token)));
        }
        _ => {}
    }
    if let Some(body) = &descriptor.body {
        let rendered = match body {
            Value::Null => None,
            Value::Object(map) if map.is_empty() => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        };
        if let Some(rendered) = rendered {
            parts.push("-d".to_string());
            parts.push(shell_quote(&rendered));
        }
    }

    let mut url = descriptor.url.clone();
    if !descriptor.query_params.is_empty() {
        let query = descriptor
            .query_params
            .iter()
            .map(|p| {
                format!(
                    "{}={}",
                    urlencoding::encode(&p.key),
                    urlencoding::encode(&p.value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        let separator = if url.contains('?') { "&" } else { "?" };
        url = format!("{}{}{}", url, separator, query);
    }
    parts.push(shell_quote(&url));

    parts.join(" ")
}

fn tokenize(command: &str) -> Vec<String> {
    if let Some(tokens) = shlex::split(command) {
        return tokens;
    }
    // Unbalanced quoting: best-effort whitespace split with the stray
    // quotes stripped, so a slightly mangled paste still imports.
    command
        .split_whitespace()
        .map(|token| token.trim_matches(|c| c == '\'' || c == '"').to_string())
        .collect()
}

fn locate_url(candidates: &[String]) -> Option<String> {
    if let Some(with_scheme) = candidates
        .iter()
        .find(|c| c.starts_with("http://") || c.starts_with("https://"))
    {
        return Some(with_scheme.clone());
    }
    candidates
        .iter()
        .rev()
        .find(|c| c.contains('.') || c.contains('/'))
        .cloned()
}

fn ensure_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Splits the query string off a URL into decoded key/value pairs.
/// Splitting only happens on `&` outside quotes, and decode failures
/// fall back to the raw pair instead of failing the parse.
fn split_query(url: &str) -> (String, Vec<Param>) {
    let Some((base, query)) = url.split_once('?') else {
        return (url.to_string(), Vec::new());
    };
    let mut params = Vec::new();
    for pair in split_outside_quotes(query, '&') {
        if pair.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair.as_str(), ""),
        };
        let key = urlencoding::decode(raw_key)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| raw_key.to_string());
        let value = urlencoding::decode(raw_value)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| raw_value.to_string());
        params.push(Param::new(key, value));
    }
    (base.to_string(), params)
}

fn split_outside_quotes(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in text.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == separator => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    parts.push(current);
    parts
}

fn auth_from_authorization(value: &str) -> Option<AuthSpec> {
    let trimmed = value.trim();
    if let Some(encoded) = strip_scheme_prefix(trimmed, "Basic") {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        return Some(AuthSpec::Basic {
            username: username.to_string(),
            password: password.to_string(),
        });
    }
    if let Some(token) = strip_scheme_prefix(trimmed, "Bearer") {
        return Some(AuthSpec::bearer_or_jwt(token));
    }
    None
}

fn strip_scheme_prefix<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let (head, tail) = value.split_once(' ')?;
    if head.eq_ignore_ascii_case(scheme) {
        Some(tail.trim())
    } else {
        None
    }
}

fn shell_quote(text: &str) -> String {
    if !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@".contains(c))
    {
        return text.to_string();
    }
    format!("'{}'", text.replace('\'', "'\\''"))
}
