//! Client for the remote assessment analysis service.
//!
//! # Responsibility
//! - Mirror the service's wire contract (camelCase JSON over POST) and
//!   hand results back as typed values.
//!
//! # Invariants
//! - This crate only consumes the service; session lifecycle and scoring
//!   live on the remote side.
//! - Every response field beyond `session_id` is optional; the client
//!   never fails on an omitted enrichment field.

use crate::remote::{TransportError, TransportResult};
use log::{info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAssessmentRequest {
    pub test_id: String,
    pub test_name: String,
    pub category: String,
    pub camera_index: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAssessmentResponse {
    pub session_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub test_id: String,
    pub test_name: String,
    pub category: String,
    pub score: f64,
    pub unit: String,
    pub duration_ms: i64,
    pub reps: i64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub percentile: Option<i64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub recommendations: Option<Vec<String>>,
    #[serde(default)]
    pub talent_score: Option<f64>,
    #[serde(default)]
    pub olympic_readiness: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopAssessmentRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopAssessmentResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Blocking client for the assessment endpoints.
pub struct AssessmentClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl AssessmentClient {
    /// Builds a client against `base_url` (e.g. `http://127.0.0.1:8000`).
    pub fn new(base_url: impl Into<String>) -> TransportResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            http,
        })
    }

    /// Opens an assessment session on the remote side.
    pub fn start(&self, request: &StartAssessmentRequest) -> TransportResult<StartAssessmentResponse> {
        self.post("assessment/start", request)
    }

    /// Submits a completed attempt for analysis and enrichment.
    pub fn analyze(&self, request: &AnalyzeRequest) -> TransportResult<AnalyzeResponse> {
        self.post("assessment/analyze", request)
    }

    /// Closes an assessment session.
    pub fn stop(&self, request: &StopAssessmentRequest) -> TransportResult<StopAssessmentResponse> {
        self.post("assessment/stop", request)
    }

    fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> TransportResult<R> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self.http.post(&url).json(body).send()?;
        let status = response.status();
        if !status.is_success() {
            warn!(
                "event=assessment_call module=remote status=error endpoint={endpoint} http_status={}",
                status.as_u16()
            );
            return Err(TransportError::Status {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
            });
        }
        let decoded = response.json::<R>()?;
        info!("event=assessment_call module=remote status=ok endpoint={endpoint}");
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AnalyzeResponse, AssessmentClient, StartAssessmentRequest, StopAssessmentRequest,
        TransportError,
    };

    #[test]
    fn start_request_serializes_camel_case() {
        let request = StartAssessmentRequest {
            test_id: "t1".into(),
            test_name: "40yd".into(),
            category: "Speed".into(),
            camera_index: 0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["testId"], "t1");
        assert_eq!(json["testName"], "40yd");
        assert_eq!(json["cameraIndex"], 0);
    }

    #[test]
    fn analyze_response_tolerates_missing_fields() {
        let decoded: AnalyzeResponse = serde_json::from_str("{}").unwrap();
        assert!(decoded.percentile.is_none());
        assert!(decoded.recommendations.is_none());

        let decoded: AnalyzeResponse =
            serde_json::from_str(r#"{"percentile": 87, "talentScore": 9.1}"#).unwrap();
        assert_eq!(decoded.percentile, Some(87));
        assert_eq!(decoded.talent_score, Some(9.1));
    }

    #[test]
    fn unreachable_host_is_a_typed_error() {
        let client = AssessmentClient::new("http://127.0.0.1:1").unwrap();
        let err = client
            .stop(&StopAssessmentRequest {
                session_id: "s1".into(),
            })
            .unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
    }

    #[test]
    fn trailing_slash_in_base_url_is_normalized() {
        let client = AssessmentClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url, "http://localhost:8000");
    }
}
