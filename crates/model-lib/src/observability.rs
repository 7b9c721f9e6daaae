//! Observability infrastructure for the predictor service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, request outcomes, model readiness and version)
//! - Structured JSON logging with tracing

use crate::error::FieldViolation;
use crate::models::Feature;
use crate::predictor::{Prediction, PredictionRequest, ValidatedFeatures};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_gauge, GaugeVec, Histogram,
    IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    validation_errors_total: IntCounter,
    prediction_errors_total: IntCounter,
    model_ready: IntGauge,
    model_version_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "diabetes_api_prediction_latency_seconds",
                "Time spent validating and scoring a prediction request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter!(
                "diabetes_api_predictions_total",
                "Total number of predictions served"
            )
            .expect("Failed to register predictions_total"),

            validation_errors_total: register_int_counter!(
                "diabetes_api_validation_errors_total",
                "Total number of prediction requests rejected by validation"
            )
            .expect("Failed to register validation_errors_total"),

            prediction_errors_total: register_int_counter!(
                "diabetes_api_prediction_errors_total",
                "Total number of prediction requests that failed on the server side"
            )
            .expect("Failed to register prediction_errors_total"),

            model_ready: register_int_gauge!(
                "diabetes_api_model_ready",
                "1 when the model is loaded and serving, 0 otherwise"
            )
            .expect("Failed to register model_ready"),

            model_version_info: register_gauge_vec!(
                "diabetes_api_model_version_info",
                "Information about the currently loaded model",
                &["version"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_validation_errors(&self) {
        self.inner().validation_errors_total.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    /// Record the outcome of model loading
    pub fn set_model_state(&self, version: Option<&str>) {
        self.inner().model_version_info.reset();
        match version {
            Some(version) => {
                self.inner().model_ready.set(1);
                self.inner().model_version_info.with_label_values(&[version]).set(1.0);
            }
            None => self.inner().model_ready.set(0),
        }
    }
}

/// Structured logger for service events
///
/// Every served prediction is logged with its inputs, output and latency;
/// this is the monitoring hook for model behaviour in production.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log a served prediction
    pub fn log_prediction(
        &self,
        features: &ValidatedFeatures,
        prediction: &Prediction,
        model_version: &str,
        latency_ms: f64,
        prediction_number: u64,
    ) {
        info!(
            event = "prediction_served",
            service = %self.service,
            prediction_number = prediction_number,
            pregnancies = features.get(Feature::Pregnancies),
            glucose = features.get(Feature::Glucose),
            blood_pressure = features.get(Feature::BloodPressure),
            bmi = features.get(Feature::Bmi),
            age = features.get(Feature::Age),
            diabetic = prediction.diabetic,
            probability = prediction.probability,
            model_version = %model_version,
            latency_ms = latency_ms,
            "Prediction served"
        );
    }

    /// Log a request rejected by validation.
    ///
    /// `request` is `None` when the body could not be parsed at all.
    pub fn log_rejected(&self, request: Option<&PredictionRequest>, violations: &[FieldViolation], latency_ms: f64) {
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        let inputs = request.map(request_inputs).unwrap_or_default();
        warn!(
            event = "prediction_rejected",
            service = %self.service,
            request = %inputs,
            fields = ?fields,
            violations = ?violations,
            latency_ms = latency_ms,
            "Prediction request failed validation"
        );
    }

    /// Log a validated request that could not be scored
    pub fn log_prediction_failure(&self, features: &ValidatedFeatures, reason: &str, latency_ms: f64) {
        error!(
            event = "prediction_failed",
            service = %self.service,
            pregnancies = features.get(Feature::Pregnancies),
            glucose = features.get(Feature::Glucose),
            blood_pressure = features.get(Feature::BloodPressure),
            bmi = features.get(Feature::Bmi),
            age = features.get(Feature::Age),
            reason = %reason,
            latency_ms = latency_ms,
            "Prediction failed"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, artifact_dir: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            service_version = %version,
            artifact_dir = %artifact_dir,
            "Predictor service starting"
        );
    }

    /// Log the outcome of model loading
    pub fn log_model_load(&self, model_version: Option<&str>, reason: Option<&str>) {
        match model_version {
            Some(version) => info!(
                event = "model_loaded",
                service = %self.service,
                model_version = %version,
                "Model loaded, service ready"
            ),
            None => error!(
                event = "model_load_failed",
                service = %self.service,
                reason = %reason.unwrap_or("unknown"),
                "Model failed to load, service will not accept predictions"
            ),
        }
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Predictor service shutting down"
        );
    }
}

/// Raw request inputs as compact JSON, field names as sent on the wire
fn request_inputs(request: &PredictionRequest) -> String {
    serde_json::to_string(request).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_creation() {
        let metrics = ServiceMetrics::new();

        metrics.observe_prediction_latency(0.002);
        metrics.inc_predictions();
        metrics.inc_validation_errors();
        metrics.inc_prediction_errors();
        metrics.set_model_state(Some("v1.0.0"));
        metrics.set_model_state(None);

        // A second handle shares the registered metrics
        let again = ServiceMetrics::new();
        again.inc_predictions();
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("diabetes-api");
        assert_eq!(logger.service, "diabetes-api");
    }

    #[test]
    fn test_rejected_request_inputs_are_logged() {
        let request: PredictionRequest = serde_json::from_value(serde_json::json!({
            "Pregnancies": 1, "Glucose": -5, "BMI": 22.0, "Age": 25
        }))
        .unwrap();
        let inputs = request_inputs(&request);
        assert!(inputs.contains("\"Glucose\":-5"));
        assert!(inputs.contains("\"Age\":25"));
        assert!(!inputs.contains("BloodPressure"));

        let logger = StructuredLogger::new("diabetes-api");
        let violations = vec![FieldViolation::new("BloodPressure", "field required")];
        logger.log_rejected(Some(&request), &violations, 0.1);
        logger.log_rejected(None, &violations, 0.1);
    }

    #[test]
    fn test_prediction_failure_logs_features() {
        let features = PredictionRequest::from_values(1, 85.0, 65.0, 22.0, 25)
            .validate()
            .unwrap();
        let logger = StructuredLogger::new("diabetes-api");
        logger.log_prediction_failure(&features, "model unavailable: still loading", 0.2);
    }
}
