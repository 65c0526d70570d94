use cache_aside::CacheError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Payload cached by the benchmarks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyReport {
    pub key: String,
    pub revenue: u64,
    pub line_items: Vec<u32>,
}

/// Slow producer standing in for an expensive query; counts its invocations
#[derive(Clone)]
pub struct ReportSource {
    latency: Duration,
    runs: Arc<AtomicUsize>,
}

impl ReportSource {
    pub fn new(latency_ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(latency_ms),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn produce(&self, key: String) -> Result<Option<QuarterlyReport>, CacheError> {
        self.runs.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.latency).await;

        let revenue = key.bytes().map(u64::from).sum();
        Ok(Some(QuarterlyReport {
            key,
            revenue,
            line_items: (0..32).collect(),
        }))
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::Relaxed)
    }
}

/// Keys `report:0` .. `report:{n-1}`
pub fn report_keys(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("report:{}", i)).collect()
}

/// `count` keys out of `n`, 80% of them drawn from the first fifth
pub fn skewed_keys(n: usize, count: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    let hot = (n / 5).max(1);

    (0..count)
        .map(|_| {
            let id = if rng.gen_bool(0.8) {
                rng.gen_range(0..hot)
            } else {
                rng.gen_range(0..n)
            };
            format!("report:{}", id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_report_source_counts_runs() {
        let source = ReportSource::new(0);

        let report = source.produce("report:1".into()).await.unwrap().unwrap();
        assert_eq!(report.key, "report:1");
        assert_eq!(source.runs(), 1);
    }

    #[test]
    fn test_key_helpers() {
        assert_eq!(report_keys(3), vec!["report:0", "report:1", "report:2"]);
        assert!(skewed_keys(100, 50).iter().all(|k| k.starts_with("report:")));
    }
}
