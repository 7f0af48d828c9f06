use serde_json::Value;

/// Walks a dot-separated path (`data.session.token`) through a JSON value.
/// Numeric segments index into arrays.
pub fn lookup_path<'a>(target: &'a Value, path: &str) -> Option<&'a Value> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Some(target);
    }
    let mut current = target;
    for segment in trimmed.split('.') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        current = if let Ok(index) = segment.parse::<usize>() {
            current.as_array().and_then(|arr| arr.get(index))?
        } else {
            current.get(segment)?
        };
    }
    Some(current)
}

pub fn lookup_string(target: &Value, path: &str) -> Option<String> {
    lookup_path(target, path)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
