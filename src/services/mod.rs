pub mod credentials;
pub mod logger;
pub mod token_cache;
