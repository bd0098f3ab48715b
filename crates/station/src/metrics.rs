use prometheus::{opts, Counter, Encoder, Gauge, Registry, TextEncoder};

/// Prometheus metrics for the dispense pipeline
#[derive(Debug)]
pub struct StationMetrics {
    registry: Registry,

    pub dispense_requests_total: Counter,
    pub dispense_sent_total: Counter,
    pub dispense_rejected_total: Counter,
    pub dispense_failed_total: Counter,

    pub funder_balance_wei: Gauge,
}

impl StationMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let dispense_requests_total = Counter::with_opts(opts!(
            "gas_station_dispense_requests_total",
            "Total number of dispense requests received"
        ))?;

        let dispense_sent_total = Counter::with_opts(opts!(
            "gas_station_dispense_sent_total",
            "Total number of transfers accepted for broadcast"
        ))?;

        let dispense_rejected_total = Counter::with_opts(opts!(
            "gas_station_dispense_rejected_total",
            "Total number of dispense requests rejected (invalid or already funded)"
        ))?;

        let dispense_failed_total = Counter::with_opts(opts!(
            "gas_station_dispense_failed_total",
            "Total number of dispense requests that failed"
        ))?;

        let funder_balance_wei = Gauge::with_opts(opts!(
            "gas_station_funder_balance_wei",
            "Last observed funder balance in wei"
        ))?;

        registry.register(Box::new(dispense_requests_total.clone()))?;
        registry.register(Box::new(dispense_sent_total.clone()))?;
        registry.register(Box::new(dispense_rejected_total.clone()))?;
        registry.register(Box::new(dispense_failed_total.clone()))?;
        registry.register(Box::new(funder_balance_wei.clone()))?;

        Ok(Self {
            registry,
            dispense_requests_total,
            dispense_sent_total,
            dispense_rejected_total,
            dispense_failed_total,
            funder_balance_wei,
        })
    }

    /// Gather metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_counters() {
        let metrics = StationMetrics::new().unwrap();
        metrics.dispense_requests_total.inc();
        metrics.funder_balance_wei.set(42.0);

        let text = metrics.gather().unwrap();
        assert!(text.contains("# TYPE gas_station_dispense_requests_total counter"));
        assert!(text.contains("# TYPE gas_station_funder_balance_wei gauge"));
        assert!(text.lines().any(|l| l.starts_with("gas_station_dispense_requests_total 1")));
        assert!(text.lines().any(|l| l.starts_with("gas_station_funder_balance_wei 42")));
    }
}
