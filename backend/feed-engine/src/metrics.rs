//! Feed engine metrics for observability

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<FeedMetricsInner> = OnceLock::new();

struct FeedMetricsInner {
    posts: IntCounter,
    follow_ops: IntCounterVec,
    feed_requests: IntCounterVec,
    feed_size: Histogram,
    cache_invalidations: IntCounter,
}

impl FeedMetricsInner {
    fn new() -> Self {
        Self {
            posts: IntCounter::new("feed_engine_posts_total", "Total posts appended")
                .expect("valid metric definition"),
            follow_ops: IntCounterVec::new(
                Opts::new(
                    "feed_engine_follow_ops_total",
                    "Follow graph mutations that changed an edge",
                ),
                &["op"],
            )
            .expect("valid metric definition"),
            feed_requests: IntCounterVec::new(
                Opts::new("feed_engine_feed_requests_total", "Total feed reads"),
                &["source"],
            )
            .expect("valid metric definition"),
            feed_size: Histogram::with_opts(
                HistogramOpts::new("feed_engine_feed_size", "Posts returned per feed read")
                    .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
            )
            .expect("valid metric definition"),
            cache_invalidations: IntCounter::new(
                "feed_engine_cache_invalidations_total",
                "Feed cache entries invalidated by writes",
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.posts.clone()))?;
        registry.register(Box::new(self.follow_ops.clone()))?;
        registry.register(Box::new(self.feed_requests.clone()))?;
        registry.register(Box::new(self.feed_size.clone()))?;
        registry.register(Box::new(self.cache_invalidations.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static FeedMetricsInner {
    METRICS.get_or_init(FeedMetricsInner::new)
}

/// Where a feed read was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Cache,
    Composed,
}

impl FeedSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedSource::Cache => "cache",
            FeedSource::Composed => "composed",
        }
    }
}

/// Feed engine metrics wrapper
#[derive(Clone, Default)]
pub struct FeedMetrics;

impl FeedMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_post(&self) {
        get_metrics().posts.inc();
    }

    pub fn record_follow(&self) {
        get_metrics().follow_ops.with_label_values(&["follow"]).inc();
    }

    pub fn record_unfollow(&self) {
        get_metrics()
            .follow_ops
            .with_label_values(&["unfollow"])
            .inc();
    }

    pub fn record_feed(&self, source: FeedSource, size: usize) {
        let metrics = get_metrics();
        metrics
            .feed_requests
            .with_label_values(&[source.as_str()])
            .inc();
        metrics.feed_size.observe(size as f64);
    }

    pub fn record_invalidations(&self, count: usize) {
        get_metrics().cache_invalidations.inc_by(count as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_source_labels() {
        assert_eq!(FeedSource::Cache.as_str(), "cache");
        assert_eq!(FeedSource::Composed.as_str(), "composed");
    }

    #[test]
    fn test_counters_advance() {
        let metrics = FeedMetrics::new();
        let before = get_metrics().posts.get();
        metrics.record_post();
        assert!(get_metrics().posts.get() > before);

        let before = get_metrics()
            .feed_requests
            .with_label_values(&["cache"])
            .get();
        metrics.record_feed(FeedSource::Cache, 3);
        assert!(
            get_metrics()
                .feed_requests
                .with_label_values(&["cache"])
                .get()
                > before
        );
    }

    #[test]
    fn test_register_with_registry() {
        let registry = Registry::new();
        FeedMetrics::register(&registry).unwrap();
        FeedMetrics::new().record_follow();

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"feed_engine_posts_total".to_string()));
        assert!(names.contains(&"feed_engine_follow_ops_total".to_string()));
    }
}
