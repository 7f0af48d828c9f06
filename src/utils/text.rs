pub fn truncate_utf8_prefix(value: &str, max_bytes: usize) -> String {
    if max_bytes == 0 {
        return String::new();
    }
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

pub fn collapse_line_continuations(value: &str) -> String {
    value.replace("\\\r\n", " ").replace("\\\n", " ")
}

#[cfg(test)]
mod tests {
    use super::{collapse_line_continuations, truncate_utf8_prefix};

    #[test]
    fn truncate_utf8_prefix_handles_ascii() {
        assert_eq!(truncate_utf8_prefix("hello", 3), "hel");
    }

    #[test]
    fn truncate_utf8_prefix_does_not_split_utf8() {
        assert_eq!(truncate_utf8_prefix("a😀b", 2), "a");
        assert_eq!(truncate_utf8_prefix("a😀b", 5), "a😀");
    }

    #[test]
    fn collapse_joins_continued_lines() {
        assert_eq!(
            collapse_line_continuations("curl \\\n  -X POST \\\r\n  https://x.com"),
            "curl    -X POST    https://x.com"
        );
    }
}
