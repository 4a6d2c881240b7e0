use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};
use tracing::{event, Level};

/// Counters for registry operations, kept in a private registry so they can
/// be rendered next to the HTTP metrics.
pub struct ProductMetrics {
    registry: Registry,
    operations: IntCounterVec,
}

#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Success,
    Rejected,
    Failed,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Rejected => "rejected",
            Outcome::Failed => "failed",
        }
    }
}

impl ProductMetrics {
    pub fn new() -> Result<ProductMetrics, prometheus::Error> {
        let registry = Registry::new();
        let operations = IntCounterVec::new(
            Opts::new(
                "product_operations_total",
                "Product registry operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations.clone()))?;

        Ok(ProductMetrics { registry, operations })
    }

    pub fn record(&self, operation: &str, outcome: Outcome) {
        self.operations
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
    }

    pub fn count(&self, operation: &str, outcome: Outcome) -> u64 {
        self.operations
            .with_label_values(&[operation, outcome.as_str()])
            .get()
    }

    pub fn render(&self) -> String {
        match TextEncoder::new().encode_to_string(&self.registry.gather()) {
            Ok(text) => text,
            Err(e) => {
                event!(Level::WARN, "Error occurred while encoding product metrics: {}", e);
                String::new()
            }
        }
    }
}
