use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use tix_processor_core::AnalysisResult;

use crate::config::ApiConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum EgressError {
    #[error("API credentials are not configured")]
    MissingCredentials,
    #[error("API rejected the report with status {status}")]
    Status { status: u16 },
    #[error("API transport error: {0}")]
    Transport(String),
}

/// Flat report document posted to the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReport {
    pub timestamp: i64,
    pub up_usage: f64,
    pub up_quality: f64,
    pub down_usage: f64,
    pub down_quality: f64,
    pub hurst_up_rs: f64,
    pub hurst_up_wavelet: f64,
    pub hurst_down_rs: f64,
    pub hurst_down_wavelet: f64,
    pub ip_address: String,
}

impl ApiReport {
    pub fn new(result: &AnalysisResult, ip_address: &str) -> Self {
        ApiReport {
            timestamp: result.timestamp,
            up_usage: result.upstream.usage,
            up_quality: result.upstream.quality,
            down_usage: result.downstream.usage,
            down_quality: result.downstream.quality,
            hurst_up_rs: result.upstream.hurst.rs,
            hurst_up_wavelet: result.upstream.hurst.wavelet,
            hurst_down_rs: result.downstream.hurst.rs,
            hurst_down_wavelet: result.downstream.hurst.wavelet,
            ip_address: ip_address.to_string(),
        }
    }
}

/// Destination for condensed results; the worker loop is generic over it.
#[async_trait]
pub trait ResultsSink {
    async fn post(
        &self,
        user_id: u64,
        installation_id: u64,
        report: &ApiReport,
    ) -> Result<(), EgressError>;
}

/// HTTP client for the reporting API.
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, EgressError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| EgressError::Transport(err.to_string()))?;
        Ok(ApiClient { http, config })
    }
}

#[async_trait]
impl ResultsSink for ApiClient {
    async fn post(
        &self,
        user_id: u64,
        installation_id: u64,
        report: &ApiReport,
    ) -> Result<(), EgressError> {
        let (user, password) = self
            .config
            .credentials()
            .ok_or(EgressError::MissingCredentials)?;

        let response = self
            .http
            .post(self.config.report_url(user_id, installation_id))
            .basic_auth(user, Some(password))
            .json(report)
            .send()
            .await
            .map_err(|err| EgressError::Transport(err.to_string()))?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            status => Err(EgressError::Status { status }),
        }
    }
}
