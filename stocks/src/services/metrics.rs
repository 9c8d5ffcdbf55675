use std::sync::LazyLock;

use metrics::{counter, describe_counter};

/// Global metrics registry for the stock service.
pub static METRICS: LazyLock<Metrics> = LazyLock::new(|| {
    describe_counter!(
        "stock_lookups_total",
        "Total number of stock price requests by kind",
    );

    describe_counter!(
        "price_fetch_failures_total",
        "Total number of failed upstream quote fetches by failure kind",
    );

    describe_counter!("likes_recorded_total", "Total number of recorded likes");

    describe_counter!(
        "likes_skipped_total",
        "Total number of likes not recorded, by reason",
    );

    Metrics
});

/// Application metrics facade.
pub struct Metrics;

impl Metrics {
    /// Counts one request, labelled `single` or `compare`.
    pub fn record_lookup(&self, kind: &'static str) {
        counter!("stock_lookups_total", "kind" => kind).increment(1);
    }

    /// Labelled by failure kind only; failing symbols are caller-controlled.
    pub fn record_price_failure(&self, kind: &'static str) {
        counter!("price_fetch_failures_total", "kind" => kind).increment(1);
    }

    pub fn record_like(&self) {
        counter!("likes_recorded_total").increment(1);
    }

    /// Counts a like request that did not change the count: `duplicate` or
    /// `hash_failure`.
    pub fn record_skipped_like(&self, reason: &'static str) {
        counter!("likes_skipped_total", "reason" => reason).increment(1);
    }
}
