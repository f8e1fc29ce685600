use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignments_total: IntCounterVec,
    pub match_requests_total: IntCounter,
    pub match_latency_seconds: Histogram,
    pub location_updates_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total order assignments by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let match_requests_total = IntCounter::new(
            "match_requests_total",
            "Number of nearest-driver lookups served",
        )
        .expect("valid match_requests_total metric");

        let match_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "match_latency_seconds",
                "Latency of nearest-driver lookups in seconds",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.01, 0.1]),
        )
        .expect("valid match_latency_seconds metric");

        let location_updates_total = IntCounter::new(
            "location_updates_total",
            "Number of driver location pings received",
        )
        .expect("valid location_updates_total metric");

        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(match_requests_total.clone()))
            .expect("register match_requests_total");
        registry
            .register(Box::new(match_latency_seconds.clone()))
            .expect("register match_latency_seconds");
        registry
            .register(Box::new(location_updates_total.clone()))
            .expect("register location_updates_total");

        Self {
            registry,
            assignments_total,
            match_requests_total,
            match_latency_seconds,
            location_updates_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
