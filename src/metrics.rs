//! Metrics and tracing helpers.
//!
//! With the `metrics` feature, [`METRICS`] records store round trips, connection opens
//! and pool pressure through OpenTelemetry instruments backed by a Prometheus registry;
//! [`DocguardMetrics::metrics_text`] renders them in the text exposition format.
//! With the `tracing` feature, [`tracing_helpers`] builds the spans used around
//! connection acquisition and store operations.

#[cfg(feature = "metrics")]
pub use self::otel::{DocguardMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider as _, ObservableGauge};
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;

    pub static METRICS: Lazy<DocguardMetrics> = Lazy::new(DocguardMetrics::init);

    pub struct DocguardMetrics {
        pub registry: Registry,
        pub store_ops_total: Counter<u64>,
        pub store_op_duration: Histogram<f64>,
        pub store_errors_total: Counter<u64>,
        pub connections_opened_total: Counter<u64>,
        pub connection_open_duration: Histogram<f64>,
        pub pool_exhausted_total: Counter<u64>,
        pub pool_created: Arc<AtomicUsize>,
        _pool_created_gauge: ObservableGauge<u64>,
        _provider: SdkMeterProvider,
    }

    impl DocguardMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let provider = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => SdkMeterProvider::builder().with_reader(exporter).build(),
                Err(e) => {
                    log::warn!("prometheus exporter unavailable, metrics are not exported: {e}");
                    SdkMeterProvider::builder().build()
                }
            };
            let meter = provider.meter("docguard");

            let store_ops_total = meter
                .u64_counter("docguard_store_ops_total")
                .with_description("Total store round trips")
                .build();

            let store_op_duration = meter
                .f64_histogram("docguard_store_op_duration_seconds")
                .with_description("Duration of store round trips")
                .build();

            let store_errors_total = meter
                .u64_counter("docguard_store_errors_total")
                .with_description("Store round trips that returned an error")
                .build();

            let connections_opened_total = meter
                .u64_counter("docguard_connections_opened_total")
                .with_description("Connections opened by the pool")
                .build();

            let connection_open_duration = meter
                .f64_histogram("docguard_connection_open_seconds")
                .with_description("Time spent opening connections")
                .build();

            let pool_exhausted_total = meter
                .u64_counter("docguard_pool_exhausted_total")
                .with_description("Connection requests rejected because the pool was exhausted")
                .build();

            let pool_created = Arc::new(AtomicUsize::new(0));
            let created_clone = Arc::clone(&pool_created);

            let pool_created_gauge = meter
                .u64_observable_gauge("docguard_pool_created")
                .with_description("Last reported value of the pool creation counter")
                .with_callback(move |observer| {
                    observer.observe(created_clone.load(Ordering::Relaxed) as u64, &[]);
                })
                .build();

            Self {
                registry,
                store_ops_total,
                store_op_duration,
                store_errors_total,
                connections_opened_total,
                connection_open_duration,
                pool_exhausted_total,
                pool_created,
                _pool_created_gauge: pool_created_gauge,
                _provider: provider,
            }
        }

        pub fn record_store_op(&self, op: &'static str, elapsed: Duration) {
            let attrs = [KeyValue::new("op", op)];
            self.store_ops_total.add(1, &attrs);
            self.store_op_duration.record(elapsed.as_secs_f64(), &attrs);
        }

        pub fn record_store_error(&self, op: &'static str) {
            self.store_errors_total.add(1, &[KeyValue::new("op", op)]);
        }

        pub fn record_connection_opened(&self, elapsed: Duration) {
            self.connections_opened_total.add(1, &[]);
            self.connection_open_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_pool_exhausted(&self) {
            self.pool_exhausted_total.add(1, &[]);
        }

        pub fn record_pool_created(&self, created: usize) {
            self.pool_created.store(created, Ordering::Relaxed);
        }

        /// Prometheus text exposition of everything recorded so far
        pub fn metrics_text(&self) -> String {
            let mut buf = Vec::new();
            if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
                log::warn!("failed to encode metrics: {e}");
            }
            String::from_utf8_lossy(&buf).into_owned()
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn acquire_connection_span(host: &str, port: u16) -> Span {
        tracing::debug_span!("docguard.connection.open", host = %host, port = port)
    }

    pub fn pool_acquire_span() -> Span {
        tracing::trace_span!("docguard.pool.acquire")
    }

    pub fn store_op_span(op: &'static str, table: &str) -> Span {
        tracing::debug_span!("docguard.store", op = op, table = %table)
    }
}
