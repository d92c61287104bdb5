use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transitions_total: IntCounterVec,
    pub assignments_total: IntCounterVec,
    pub open_requests: IntGauge,
    pub matching_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Lifecycle transitions by new status"),
            &["status"],
        )
        .expect("valid transitions_total metric");

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Assignment attempts by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let open_requests = IntGauge::new(
            "open_requests",
            "Requests currently waiting in the fetching state",
        )
        .expect("valid open_requests metric");

        let matching_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "matching_latency_seconds",
                "Latency of assignment attempts in seconds",
            ),
            &["outcome"],
        )
        .expect("valid matching_latency_seconds metric");

        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(open_requests.clone()))
            .expect("register open_requests");
        registry
            .register(Box::new(matching_latency_seconds.clone()))
            .expect("register matching_latency_seconds");

        Self {
            registry,
            transitions_total,
            assignments_total,
            open_requests,
            matching_latency_seconds,
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
