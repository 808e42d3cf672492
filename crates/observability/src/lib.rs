use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct PlannerMetrics {
    submissions_total: AtomicU64,
    matches_total: AtomicU64,
    no_match_total: AtomicU64,
    gateway_failures_total: AtomicU64,
    stale_discarded_total: AtomicU64,
    unlocks_total: AtomicU64,
    exports_total: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub submissions_total: u64,
    pub matches_total: u64,
    pub no_match_total: u64,
    pub gateway_failures_total: u64,
    pub stale_discarded_total: u64,
    pub unlocks_total: u64,
    pub exports_total: u64,
}

impl PlannerMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_submission(&self) {
        self.submissions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_match(&self) {
        self.matches_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_no_match(&self) {
        self.no_match_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_gateway_failure(&self) {
        self.gateway_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_stale_discarded(&self) {
        self.stale_discarded_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unlock(&self) {
        self.unlocks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_export(&self) {
        self.exports_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submissions_total: self.submissions_total.load(Ordering::Relaxed),
            matches_total: self.matches_total.load(Ordering::Relaxed),
            no_match_total: self.no_match_total.load(Ordering::Relaxed),
            gateway_failures_total: self.gateway_failures_total.load(Ordering::Relaxed),
            stale_discarded_total: self.stale_discarded_total.load(Ordering::Relaxed),
            unlocks_total: self.unlocks_total.load(Ordering::Relaxed),
            exports_total: self.exports_total.load(Ordering::Relaxed),
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,honeymoon_planner=info,honeymoon_gateway=info,honeymoon_storage=warn",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
