use courier_bridge::{ExecutorConfig, Pipeline, PipelineConfig};

/// Pipeline wired for tests: mock servers listen on loopback, so the
/// private-network guard is relaxed and no proxy is configured unless
/// a test asks for one.
pub fn test_pipeline(primary_proxy: Option<String>, secondary_proxy: Option<String>) -> Pipeline {
    Pipeline::new(test_config(primary_proxy, secondary_proxy), None).expect("pipeline builds")
}

pub fn test_config(
    primary_proxy: Option<String>,
    secondary_proxy: Option<String>,
) -> PipelineConfig {
    PipelineConfig {
        executor: ExecutorConfig {
            primary_proxy_url: primary_proxy,
            secondary_proxy_url: secondary_proxy,
            direct_timeout_ms: 5_000,
            proxy_timeout_ms: 5_000,
            allow_private_networks: true,
            ..ExecutorConfig::default()
        },
        batch_size: 2,
        inter_batch_delay_ms: 10,
    }
}
