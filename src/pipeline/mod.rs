pub mod auth;
pub mod classifier;
pub mod executor;
pub mod extract;
pub mod normalizer;
pub mod parser;

pub use auth::AuthResolver;
pub use executor::{ExecutorConfig, RequestExecutor};
pub use normalizer::normalize;
pub use parser::{parse, to_curl};

use crate::constants::batch::{INTER_BATCH_DELAY_MS, SIZE};
use crate::errors::{ApiError, ApiErrorKind};
use crate::model::{Outcome, RequestDescriptor};
use crate::services::credentials::CredentialStore;
use crate::services::logger::Logger;
use crate::services::token_cache::TokenCache;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub executor: ExecutorConfig,
    pub batch_size: usize,
    pub inter_batch_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorConfig::default(),
            batch_size: SIZE,
            inter_batch_delay_ms: INTER_BATCH_DELAY_MS,
        }
    }
}

/// The five-stage request pipeline behind the admin console: normalize,
/// resolve auth, execute with transport fallback, classify. Parse and
/// validation problems surface as errors for inline correction; once a
/// request is executable, failures come back as classified outcomes.
pub struct Pipeline {
    resolver: AuthResolver,
    executor: RequestExecutor,
    token_cache: Arc<TokenCache>,
    logger: Logger,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        credentials: Option<Arc<dyn CredentialStore>>,
    ) -> Result<Self, ApiError> {
        let logger = Logger::new("courier_bridge");
        let token_cache = Arc::new(TokenCache::new());
        let resolver = AuthResolver::new(
            token_cache.clone(),
            credentials,
            logger.child("auth"),
        )?;
        let executor = RequestExecutor::new(config.executor.clone(), logger.child("executor"))?;
        Ok(Self {
            resolver,
            executor,
            token_cache,
            logger,
            config,
        })
    }

    pub fn with_defaults() -> Result<Self, ApiError> {
        Self::new(PipelineConfig::default(), None)
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.token_cache
    }

    /// Runs one descriptor through the pipeline. Auth failures past
    /// normalization come back as `AuthError` outcomes so the caller
    /// can tell "credentials are wrong" from "the API is down".
    pub async fn run_request(&self, descriptor: RequestDescriptor) -> Result<Outcome, ApiError> {
        let normalized = normalizer::normalize(descriptor)?;
        let resolved = match self.resolver.resolve(&normalized).await {
            Ok(resolved) => resolved,
            Err(err) if err.kind == ApiErrorKind::Auth => {
                return Ok(classifier::classify(Err(err), &normalized, &self.logger));
            }
            Err(err) => return Err(err),
        };
        let result = self.executor.execute(&resolved).await;
        Ok(classifier::classify(result, &resolved, &self.logger))
    }

    /// Batch execution: fixed-size groups run concurrently with a
    /// pause between groups so downstream rate limits survive. One
    /// request failing never cancels its siblings.
    pub async fn run_batch(
        &self,
        descriptors: Vec<RequestDescriptor>,
    ) -> Vec<Result<Outcome, ApiError>> {
        let batch_size = self.config.batch_size.max(1);
        let mut results = Vec::with_capacity(descriptors.len());
        for (index, chunk) in descriptors.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.inter_batch_delay_ms)).await;
            }
            let batch = chunk
                .iter()
                .cloned()
                .map(|descriptor| self.run_request(descriptor));
            results.extend(futures::future::join_all(batch).await);
            self.logger.debug(
                "Batch completed",
                Some(&serde_json::json!({"batch": index + 1, "size": chunk.len()})),
            );
        }
        results
    }
}
