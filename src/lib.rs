//! Core request pipeline for the courier admin console.
//!
//! Turns a pasted cURL command or a form-built descriptor into a
//! canonical HTTP request, resolves its authentication (including
//! mint-on-demand bearer tokens), executes it with direct-then-proxy
//! fallback, and classifies the result into an [`model::Outcome`] the
//! UI can present without unpacking transport errors.

pub mod constants;
pub mod errors;
pub mod model;
pub mod pipeline;
pub mod services;
pub mod utils;

pub use errors::{ApiError, ApiErrorKind};
pub use model::{
    ApiKeyLocation, AuthSpec, HttpMethod, Outcome, Param, RawResponse, RequestContext,
    RequestDescriptor, Transport,
};
pub use pipeline::{
    normalize, parse, to_curl, AuthResolver, ExecutorConfig, Pipeline, PipelineConfig,
    RequestExecutor,
};
pub use services::credentials::{CredentialStore, MemoryCredentialStore, StoredCredentials};
pub use services::token_cache::{TokenCache, TokenCacheEntry, TokenType};
