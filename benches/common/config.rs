use std::env;

/// Configuration for benchmarks, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Redis URL; Redis benchmarks run only when REDIS_URL is set
    pub redis_url: Option<String>,

    /// Simulated producer latency in milliseconds (from PRODUCER_LATENCY_MS env var, defaults to 5)
    pub producer_latency_ms: u64,

    /// Sample size for benchmarks (from BENCH_SAMPLE_SIZE env var, defaults to 20)
    pub sample_size: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            redis_url: env::var("REDIS_URL").ok(),
            producer_latency_ms: env::var("PRODUCER_LATENCY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            sample_size: env::var("BENCH_SAMPLE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        let config = Self::default();
        eprintln!("Benchmark Configuration:");
        eprintln!(
            "  Redis URL: {}",
            config.redis_url.as_deref().unwrap_or("(unset, skipping Redis)")
        );
        eprintln!("  Producer Latency: {}ms", config.producer_latency_ms);
        eprintln!("  Sample Size: {}", config.sample_size);
        config
    }
}
