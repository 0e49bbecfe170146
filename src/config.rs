//! Configuration for the camera link and the analysis pipeline.
//!
//! Both structs deserialize with serde and fall back to field defaults, so the
//! embedding application can load them from any config source and override only
//! what it needs. The analysis API token has no usable default and must be
//! injected; it is never compiled into the crate.

use std::time::Duration;

use serde::Deserialize;

/// Default cap on a single encoded frame, in bytes.
pub const DEFAULT_MAX_FRAME_LEN: usize = 2_000_000;

/// Camera link settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera device host (the ESP32's address on the local network).
    pub host: String,
    /// Camera device TCP port.
    pub port: u16,
    /// Deadline for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Deadline for each socket read. A camera that goes silent for longer
    /// than this faults the link; the caller decides whether to reconnect.
    pub recv_timeout: Duration,
    /// Frames with a declared length of zero or above this cap are skipped.
    pub max_frame_len: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            host: "192.168.4.1".to_string(),
            port: 8080,
            connect_timeout: Duration::from_secs(5),
            recv_timeout: Duration::from_secs(3),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Remote vision-analysis service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Base URL of the analysis service.
    pub base_url: String,
    /// Bearer credential attached to every request. Empty by default; the
    /// embedding application must inject a real token.
    pub api_token: String,
    /// Bot identifier submitted with each chat job.
    pub bot_id: String,
    /// User identifier submitted with each chat job.
    pub user_id: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Wall-clock budget shared by the upload and job-start stages.
    pub overall_budget: Duration,
    /// Independent deadline for the polling stage, measured from job start.
    pub poll_timeout: Duration,
    /// Delay between consecutive status polls.
    pub poll_interval: Duration,
    /// How long a terminal Done/Error state is held before decaying to Idle.
    pub cooldown: Duration,
    /// Instruction sent alongside the image snapshot.
    pub prompt: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coze.cn".to_string(),
            api_token: String::new(),
            bot_id: String::new(),
            user_id: "hmd-panel".to_string(),
            request_timeout: Duration::from_secs(30),
            overall_budget: Duration::from_secs(30),
            poll_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
            cooldown: Duration::from_secs(2),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

/// Default analysis instruction: asks for a bare JSON object matching
/// [`AnalysisResult`](crate::types::AnalysisResult).
pub const DEFAULT_PROMPT: &str = "You are a mycology expert analyzing a photo of a mushroom. \
Identify the species and assess its growth. Respond strictly as a JSON object with these \
fields: species_name (the species' common name), introduction (a brief introduction of \
about 50 words), growth_analysis (growth stage and health assessment). Return only the \
JSON object, with no surrounding text.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_defaults_match_device_protocol() {
        let config = CameraConfig::default();
        assert_eq!(config.max_frame_len, 2_000_000);
        assert_eq!(config.recv_timeout, Duration::from_secs(3));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn analysis_token_is_not_baked_in() {
        let config = AnalysisConfig::default();
        assert!(config.api_token.is_empty());
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn partial_overrides_deserialize_over_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"base_url":"http://localhost:9999","api_token":"t"}"#)
                .expect("valid config");
        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.api_token, "t");
        assert_eq!(config.overall_budget, Duration::from_secs(30));
    }
}
