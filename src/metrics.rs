use prometheus::{Encoder, TextEncoder};

use crate::errors::ServiceError;

/// Gather all registered metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, ServiceError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ServiceError::InternalError(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| ServiceError::InternalError(format!("Metrics are not UTF-8: {}", e)))
}

/// `GET /metrics`
pub async fn metrics_handler() -> Result<String, ServiceError> {
    gather_metrics()
}
