//! Observability hooks.
//!
//! With the `metrics` feature, [`METRICS`] records statement counts, round-trip
//! durations, store errors and rejected queries on the OpenTelemetry global meter;
//! whatever exporter the host process installs picks them up. With the `tracing`
//! feature, [`tracing_helpers`] opens a span around each store round-trip.

#[cfg(feature = "metrics")]
pub use self::otel::{QuarryMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
        KeyValue,
    };
    use std::time::Duration;

    pub static METRICS: Lazy<QuarryMetrics> = Lazy::new(QuarryMetrics::init);

    pub struct QuarryMetrics {
        pub statements_total: Counter<u64>,
        pub statement_duration: Histogram<f64>,
        pub store_errors_total: Counter<u64>,
        pub rejected_queries_total: Counter<u64>,
    }

    impl QuarryMetrics {
        pub fn init() -> Self {
            let meter = global::meter("quarry");

            let statements_total = meter
                .u64_counter("quarry_statements_total")
                .with_description("Statements sent to the store")
                .build();

            let statement_duration = meter
                .f64_histogram("quarry_statement_duration_seconds")
                .with_description("Store round-trip duration")
                .build();

            let store_errors_total = meter
                .u64_counter("quarry_store_errors_total")
                .with_description("Statements that failed in the store")
                .build();

            let rejected_queries_total = meter
                .u64_counter("quarry_rejected_queries_total")
                .with_description("Queries rejected before reaching the store")
                .build();

            Self {
                statements_total,
                statement_duration,
                store_errors_total,
                rejected_queries_total,
            }
        }

        /// `kind` is `query` or `execute`.
        pub fn record_statement(&self, kind: &'static str, elapsed: Duration) {
            let attrs = [KeyValue::new("kind", kind)];
            self.statements_total.add(1, &attrs);
            self.statement_duration.record(elapsed.as_secs_f64(), &attrs);
        }

        pub fn record_store_error(&self, code: Option<&str>) {
            let code = code.unwrap_or("unknown").to_string();
            self.store_errors_total.add(1, &[KeyValue::new("code", code)]);
        }

        pub fn record_rejected(&self, kind: &'static str) {
            self.rejected_queries_total
                .add(1, &[KeyValue::new("reason", kind)]);
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn execute_query_span(sql: &str) -> Span {
        tracing::debug_span!("quarry.query", db.statement = %sql)
    }

    pub fn execute_statement_span(sql: &str) -> Span {
        tracing::debug_span!("quarry.execute", db.statement = %sql)
    }

    pub fn repository_span(operation: &'static str, table: &'static str) -> Span {
        tracing::info_span!("quarry.repository", operation, table)
    }

    pub fn acquire_connection_span() -> Span {
        tracing::debug_span!("quarry.connect")
    }

    pub fn begin_transaction_span() -> Span {
        tracing::debug_span!("quarry.transaction.begin")
    }

    pub fn commit_transaction_span() -> Span {
        tracing::debug_span!("quarry.transaction.commit")
    }

    pub fn rollback_transaction_span() -> Span {
        tracing::debug_span!("quarry.transaction.rollback")
    }

    /// Print spans and events to the test harness output. Safe to call repeatedly.
    pub fn init_test_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    }
}
