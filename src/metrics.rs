//! Per-operation metrics.

use std::time::Instant;

/// Header carrying the request units charged for a call.
pub const REQUEST_CHARGE_HEADER: &str = "x-ms-request-charge";

/// Timing and cost of a single remote call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OperationMetrics {
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// Request units charged by the service, when it reports them.
    pub request_charge: Option<f64>,
}

impl OperationMetrics {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            request_charge: None,
        }
    }

    pub fn with_charge(duration_ms: f64, request_charge: Option<f64>) -> Self {
        Self {
            duration_ms,
            request_charge,
        }
    }

    /// Build metrics from a start instant and the response headers.
    pub fn from_response(start: Instant, headers: &reqwest::header::HeaderMap) -> Self {
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let request_charge = headers
            .get(REQUEST_CHARGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok());
        Self::with_charge(duration_ms, request_charge)
    }

    /// Fold another call's metrics into this one.
    pub fn accumulate(&mut self, other: &OperationMetrics) {
        self.duration_ms += other.duration_ms;
        self.request_charge = match (self.request_charge, other.request_charge) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
    }
}
