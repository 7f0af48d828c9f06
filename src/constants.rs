pub mod network {
    pub const TIMEOUT_DIRECT_MS: u64 = 30_000;
    pub const TIMEOUT_PROXY_MS: u64 = 45_000;
    pub const TIMEOUT_TOKEN_MINT_MS: u64 = 15_000;
}

pub mod limits {
    pub const RESPONSE_CEILING_BYTES: usize = 5_500_000;
    pub const TRUNCATED_SAMPLE_ITEMS: usize = 100;
    pub const AUTH_PHRASE_SCAN_BYTES: usize = 4_096;
}

pub mod pagination {
    pub const MAX_PAGES: usize = 5;
    pub const PAGE_PARAM: &str = "page";
}

pub mod batch {
    pub const SIZE: usize = 5;
    pub const INTER_BATCH_DELAY_MS: u64 = 1_000;
}

pub mod auth {
    pub const DEFAULT_TOKEN_PATH: &str = "access_token";
    pub const DEFAULT_EXPIRES_SECONDS: i64 = 3_600;
    pub const EXPIRY_SKEW_SECONDS: i64 = 30;
    pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";
}

pub mod private_networks {
    pub const LOOPBACK_NAMES: &[&str] = &["localhost", "::1"];
    pub const PRIVATE_PREFIXES: &[&str] = &["10.", "192.168.", "127."];
}

pub mod redaction {
    pub const MARKER: &str = "[REDACTED]";
    pub const INLINE_MARKER: &str = "***REDACTED***";
}

pub mod env {
    pub const PROXY_URL: &str = "COURIER_BRIDGE_PROXY_URL";
    pub const FALLBACK_PROXY_URL: &str = "COURIER_BRIDGE_FALLBACK_PROXY_URL";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}
