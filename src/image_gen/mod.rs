//! # Image Generation Module
//!
//! Client for the Fusion Brain (Kandinsky) pipeline API. A job is submitted
//! as a multipart request, then its status endpoint is polled a bounded
//! number of times with a fixed delay until the job is done or failed.

pub mod postprocess;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, error, info, warn};

use crate::config::{ImageServiceConfig, PollSettings, DEFAULT_IMAGE_SIZE};
use crate::errors::ImageError;

pub use postprocess::decode_to_png;

/// Style that is sent by omitting the style field
pub const DEFAULT_STYLE: &str = "DEFAULT";

/// Styles offered on the style keyboard
pub const SUPPORTED_STYLES: [&str; 8] = [
    "DEFAULT",
    "UHD",
    "ANIME",
    "NEON",
    "DETAILED",
    "KANDINSKY",
    "3D_MODEL",
    "WATERCOLOR",
];

/// One image generation job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub style: String,
    pub width: u32,
    pub height: u32,
    pub negative_prompt: Option<String>,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            style: style.into(),
            width: DEFAULT_IMAGE_SIZE,
            height: DEFAULT_IMAGE_SIZE,
            negative_prompt: None,
        }
    }

    pub fn with_negative_prompt(mut self, negative_prompt: Option<String>) -> Self {
        self.negative_prompt = negative_prompt;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateQuery<'a> {
    query: &'a str,
}

/// The `params` part of a pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    num_images: u32,
    width: u32,
    height: u32,
    generate_params: GenerateQuery<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt_decoder: Option<&'a str>,
}

impl<'a> GenerationParams<'a> {
    fn from_request(request: &'a ImageRequest) -> Self {
        Self {
            kind: "GENERATE",
            num_images: 1,
            width: request.width,
            height: request.height,
            generate_params: GenerateQuery {
                query: &request.prompt,
            },
            style: Some(request.style.as_str()).filter(|style| *style != DEFAULT_STYLE),
            negative_prompt_decoder: request
                .negative_prompt
                .as_deref()
                .filter(|prompt| !prompt.is_empty()),
        }
    }
}

/// Serialize the generation parameters sent with a job
pub fn generation_params_json(request: &ImageRequest) -> Result<String> {
    Ok(serde_json::to_string(&GenerationParams::from_request(
        request,
    ))?)
}

#[derive(Debug, Clone, Deserialize)]
struct PipelineInfo {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RunResponse {
    uuid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StatusResult {
    #[serde(default)]
    files: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: String,
    #[serde(default)]
    result: Option<StatusResult>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Status of a submitted job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    /// Base64 payloads of the generated files
    Done(Vec<String>),
    Failed(Option<String>),
}

impl From<StatusResponse> for JobStatus {
    fn from(response: StatusResponse) -> Self {
        match response.status.as_str() {
            "DONE" => JobStatus::Done(response.result.unwrap_or_default().files),
            "FAIL" => JobStatus::Failed(response.error_description),
            _ => JobStatus::Pending,
        }
    }
}

/// Poll `check` until the job settles or `settings.max_attempts` checks ran
///
/// Pending statuses and request errors both use up an attempt. The delay
/// only runs when another check follows, so an all-pending job makes
/// `max_attempts` checks separated by `max_attempts - 1` delays.
pub async fn poll_job<F, Fut>(
    job_id: &str,
    settings: PollSettings,
    mut check: F,
) -> Result<String, ImageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobStatus>>,
{
    for attempt in 1..=settings.max_attempts {
        match check().await {
            Ok(JobStatus::Done(files)) => {
                return match files.into_iter().next() {
                    Some(payload) => {
                        info!(job_id, attempt, "Image generation finished");
                        Ok(payload)
                    }
                    None => {
                        warn!(job_id, "Job finished without result files");
                        Err(ImageError::RemoteFailure("no files in result".to_string()))
                    }
                };
            }
            Ok(JobStatus::Failed(description)) => {
                let description = description.unwrap_or_else(|| "Unknown error".to_string());
                error!(job_id, error = %description, "Image generation failed");
                return Err(ImageError::RemoteFailure(description));
            }
            Ok(JobStatus::Pending) => {
                debug!(job_id, attempt, "Image generation still pending");
            }
            Err(e) => {
                warn!(job_id, attempt, error = %e, "Status check failed");
            }
        }

        if attempt < settings.max_attempts {
            tokio::time::sleep(settings.delay).await;
        }
    }

    Err(ImageError::Timeout {
        attempts: settings.max_attempts,
    })
}

/// An asynchronous image generation service
#[async_trait]
pub trait ImagePipeline: Send + Sync {
    /// Whether the service resolved its pipeline and accepts jobs
    fn is_available(&self) -> bool;

    /// Named styles the service accepts
    fn styles(&self) -> Vec<String>;

    /// Submit a job and return its identifier
    async fn submit(&self, request: &ImageRequest) -> Result<String, ImageError>;

    /// Wait for a job and return its base64 payload
    async fn await_result(&self, job_id: &str) -> Result<String, ImageError>;
}

/// Fusion Brain pipeline client
pub struct FusionBrainClient {
    http: reqwest::Client,
    config: ImageServiceConfig,
    /// Resolved once at startup, `None` marks the service as unavailable
    pipeline_id: Option<String>,
    styles: Vec<String>,
}

impl FusionBrainClient {
    /// Create the client and resolve the pipeline identifier
    ///
    /// A failed lookup does not fail construction: the client reports itself
    /// unavailable and refuses jobs instead.
    pub async fn connect(config: ImageServiceConfig) -> Self {
        let http = reqwest::Client::new();
        let pipeline_id = match fetch_pipeline_id(&http, &config).await {
            Ok(id) => {
                info!(pipeline_id = %id, "Resolved image pipeline");
                Some(id)
            }
            Err(e) => {
                error!(error = %e, "Failed to resolve image pipeline, image generation disabled");
                None
            }
        };

        Self {
            http,
            config,
            pipeline_id,
            styles: SUPPORTED_STYLES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn pipeline_id(&self) -> Option<&str> {
        self.pipeline_id.as_deref()
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        with_auth(builder, &self.config)
    }

    async fn check_status(&self, job_id: &str) -> Result<JobStatus> {
        let response = self
            .auth(
                self.http
                    .get(format!("{}pipeline/status/{job_id}", self.config.base_url)),
            )
            .timeout(self.config.request_timeout)
            .send()
            .await?
            .json::<StatusResponse>()
            .await?;
        Ok(response.into())
    }
}

fn with_auth(builder: reqwest::RequestBuilder, config: &ImageServiceConfig) -> reqwest::RequestBuilder {
    builder
        .header("X-Key", format!("Key {}", config.api_key))
        .header("X-Secret", format!("Secret {}", config.secret_key))
}

async fn fetch_pipeline_id(http: &reqwest::Client, config: &ImageServiceConfig) -> Result<String> {
    let pipelines = with_auth(http.get(format!("{}pipelines", config.base_url)), config)
        .timeout(config.request_timeout)
        .send()
        .await?
        .error_for_status()?
        .json::<Vec<PipelineInfo>>()
        .await
        .context("Malformed pipeline listing")?;

    pipelines
        .into_iter()
        .next()
        .map(|pipeline| pipeline.id)
        .ok_or_else(|| anyhow!("Pipeline listing is empty"))
}

#[async_trait]
impl ImagePipeline for FusionBrainClient {
    fn is_available(&self) -> bool {
        self.pipeline_id.is_some()
    }

    fn styles(&self) -> Vec<String> {
        self.styles.clone()
    }

    async fn submit(&self, request: &ImageRequest) -> Result<String, ImageError> {
        let pipeline_id = self.pipeline_id.as_ref().ok_or(ImageError::Unavailable)?;

        let params = generation_params_json(request)
            .map_err(|e| ImageError::SubmissionFailed(e.to_string()))?;
        let params_part = Part::text(params)
            .mime_str("application/json")
            .map_err(|e| ImageError::SubmissionFailed(e.to_string()))?;
        let form = Form::new()
            .text("pipeline_id", pipeline_id.clone())
            .part("params", params_part);

        let result = async {
            let response = self
                .auth(self.http.post(format!("{}pipeline/run", self.config.base_url)))
                .timeout(self.config.submit_timeout)
                .multipart(form)
                .send()
                .await?
                .error_for_status()?
                .json::<RunResponse>()
                .await?;
            Ok::<_, reqwest::Error>(response.uuid)
        }
        .await;

        match result {
            Ok(job_id) => {
                info!(job_id = %job_id, style = %request.style, "Image job submitted");
                Ok(job_id)
            }
            Err(e) => {
                error!(error = %e, "Image job submission failed");
                Err(ImageError::SubmissionFailed(e.to_string()))
            }
        }
    }

    async fn await_result(&self, job_id: &str) -> Result<String, ImageError> {
        if !self.is_available() {
            return Err(ImageError::Unavailable);
        }
        poll_job(job_id, self.config.poll, || self.check_status(job_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_default_style_is_omitted() {
        let request = ImageRequest::new("кот", DEFAULT_STYLE);
        let params: Value = serde_json::from_str(&generation_params_json(&request).unwrap()).unwrap();

        assert_eq!(params["type"], "GENERATE");
        assert_eq!(params["numImages"], 1);
        assert_eq!(params["width"], 1024);
        assert_eq!(params["height"], 1024);
        assert_eq!(params["generateParams"]["query"], "кот");
        assert!(params.get("style").is_none());
        assert!(params.get("negativePromptDecoder").is_none());
    }

    #[test]
    fn test_style_and_negative_prompt_are_sent_when_set() {
        let request = ImageRequest::new("кот", "ANIME")
            .with_negative_prompt(Some("цвета".to_string()));
        let params: Value = serde_json::from_str(&generation_params_json(&request).unwrap()).unwrap();

        assert_eq!(params["style"], "ANIME");
        assert_eq!(params["negativePromptDecoder"], "цвета");
    }

    #[test]
    fn test_status_mapping() {
        let done: StatusResponse = serde_json::from_str(
            r#"{"uuid":"1","status":"DONE","result":{"files":["aGVsbG8="],"censored":false}}"#,
        )
        .unwrap();
        assert_eq!(JobStatus::from(done), JobStatus::Done(vec!["aGVsbG8=".to_string()]));

        let failed: StatusResponse =
            serde_json::from_str(r#"{"status":"FAIL","errorDescription":"censored"}"#).unwrap();
        assert_eq!(
            JobStatus::from(failed),
            JobStatus::Failed(Some("censored".to_string()))
        );

        let processing: StatusResponse = serde_json::from_str(r#"{"status":"PROCESSING"}"#).unwrap();
        assert_eq!(JobStatus::from(processing), JobStatus::Pending);
    }
}
