//! Label detection through the Google Cloud Vision REST API.
//!
//! [`LabelDetector`] is the seam the aggregator talks to. [`CloudVisionClient`]
//! implements it with one blocking `images:annotate` request per image.
//!
//! # Example
//!
//! ```no_run
//! use framelabel::{CloudVisionClient, LabelDetector, VisionConfig};
//!
//! let client = CloudVisionClient::new(VisionConfig::from_env()?)?;
//! let bytes = std::fs::read("frame.jpg")?;
//! for label in client.detect_labels(&bytes)? {
//!     println!("{label}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{env, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::LabelError;

/// Default `images:annotate` endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
/// Label count the service returns when no limit is given.
pub const DEFAULT_MAX_RESULTS: u32 = 10;

const API_KEY_VARS: [&str; 2] = ["FRAMELABEL_VISION_API_KEY", "GOOGLE_API_KEY"];
const ACCESS_TOKEN_VAR: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
const QUOTA_PROJECT_VAR: &str = "GOOGLE_CLOUD_QUOTA_PROJECT";
const ENDPOINT_VAR: &str = "FRAMELABEL_VISION_ENDPOINT";

/// Returns the labels describing an encoded image.
pub trait LabelDetector {
    /// Detect labels for `image_bytes` (an encoded JPEG/PNG), most
    /// confident first.
    fn detect_labels(&self, image_bytes: &[u8]) -> Result<Vec<String>, LabelError>;
}

impl<D: LabelDetector + ?Sized> LabelDetector for &D {
    fn detect_labels(&self, image_bytes: &[u8]) -> Result<Vec<String>, LabelError> {
        (**self).detect_labels(image_bytes)
    }
}

impl<D: LabelDetector + ?Sized> LabelDetector for Box<D> {
    fn detect_labels(&self, image_bytes: &[u8]) -> Result<Vec<String>, LabelError> {
        (**self).detect_labels(image_bytes)
    }
}

/// How requests are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// API key sent as the `key` query parameter.
    ApiKey(String),
    /// OAuth 2.0 access token sent as a bearer token.
    AccessToken(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey(..)"),
            Credential::AccessToken(_) => f.write_str("AccessToken(..)"),
        }
    }
}

/// Connection settings for [`CloudVisionClient`].
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Full URL of the `images:annotate` method.
    pub endpoint: String,
    /// Authentication for every request.
    pub credential: Credential,
    /// Project billed for requests made with user credentials.
    pub quota_project: Option<String>,
    /// Maximum labels returned per image.
    pub max_results: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl VisionConfig {
    /// Settings using `credential` and defaults for everything else.
    pub fn new(credential: Credential) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credential,
            quota_project: None,
            max_results: DEFAULT_MAX_RESULTS,
            timeout: Duration::from_secs(30),
        }
    }

    /// Build settings from the environment.
    ///
    /// The API key comes from `FRAMELABEL_VISION_API_KEY` or
    /// `GOOGLE_API_KEY`; failing both, `GOOGLE_OAUTH_ACCESS_TOKEN` is used
    /// as a bearer token. `GOOGLE_CLOUD_QUOTA_PROJECT` and
    /// `FRAMELABEL_VISION_ENDPOINT` are optional.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::MissingCredentials`] if none of the credential
    /// variables is set.
    pub fn from_env() -> Result<Self, LabelError> {
        let lookup = |name: &str| env::var(name).ok().filter(|value| !value.trim().is_empty());

        let credential = API_KEY_VARS
            .iter()
            .find_map(|&name| lookup(name))
            .map(Credential::ApiKey)
            .or_else(|| lookup(ACCESS_TOKEN_VAR).map(Credential::AccessToken))
            .ok_or(LabelError::MissingCredentials(
                "FRAMELABEL_VISION_API_KEY, GOOGLE_API_KEY or GOOGLE_OAUTH_ACCESS_TOKEN",
            ))?;

        let mut config = Self::new(credential);
        config.quota_project = lookup(QUOTA_PROJECT_VAR);
        if let Some(endpoint) = lookup(ENDPOINT_VAR) {
            config.endpoint = endpoint;
        }
        Ok(config)
    }

    /// Limit the number of labels per image. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Override the endpoint, e.g. for a regional or mock service.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    max_results: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    #[serde(default)]
    error: Option<ServiceStatus>,
}

#[derive(Debug, Deserialize)]
struct LabelAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ServiceStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ServiceStatus,
}

/// Serialize a single-image `LABEL_DETECTION` request body.
pub fn build_annotate_request(
    image_bytes: &[u8],
    max_results: u32,
) -> Result<serde_json::Value, LabelError> {
    let request = AnnotateRequest {
        requests: vec![ImageRequest {
            image: ImageContent {
                content: STANDARD.encode(image_bytes),
            },
            features: vec![Feature {
                kind: "LABEL_DETECTION",
                max_results,
            }],
        }],
    };
    Ok(serde_json::to_value(request)?)
}

/// Extract label descriptions from an `images:annotate` response body.
///
/// # Errors
///
/// - [`LabelError::InvalidResponse`] if the body is not valid JSON.
/// - [`LabelError::Detection`] if the service reported a per-image error.
pub fn parse_annotate_response(body: &str) -> Result<Vec<String>, LabelError> {
    let response: AnnotateResponse = serde_json::from_str(body)?;
    let Some(image) = response.responses.into_iter().next() else {
        return Ok(Vec::new());
    };

    if let Some(status) = image.error {
        return Err(LabelError::Detection(format!(
            "service error {}: {}",
            status.code, status.message
        )));
    }

    Ok(image
        .label_annotations
        .into_iter()
        .map(|annotation| annotation.description)
        .filter(|description| !description.is_empty())
        .collect())
}

/// Blocking client for the Cloud Vision `images:annotate` method.
#[derive(Debug, Clone)]
pub struct CloudVisionClient {
    http: Client,
    config: VisionConfig,
}

impl CloudVisionClient {
    /// Create a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Http`] if the HTTP client cannot be built.
    pub fn new(config: VisionConfig) -> Result<Self, LabelError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &VisionConfig {
        &self.config
    }
}

impl LabelDetector for CloudVisionClient {
    fn detect_labels(&self, image_bytes: &[u8]) -> Result<Vec<String>, LabelError> {
        let body = build_annotate_request(image_bytes, self.config.max_results)?;

        let mut request = self.http.post(&self.config.endpoint).json(&body);
        request = match &self.config.credential {
            Credential::ApiKey(key) => request.query(&[("key", key)]),
            Credential::AccessToken(token) => request.bearer_auth(token),
        };
        if let Some(project) = &self.config.quota_project {
            request = request.header("x-goog-user-project", project);
        }

        log::debug!("Requesting labels for {} byte image", image_bytes.len());
        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(LabelError::Detection(format!("HTTP {status}: {message}")));
        }

        parse_annotate_response(&text)
    }
}
