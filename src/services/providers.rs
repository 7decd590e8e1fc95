// Classifier Providers
// Classifier contract plus the HTTP adapter for remote model servers

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::models::{FeatureWeight, Prediction, RawAttributions};

const DEFAULT_TIMEOUT_SECS: u64 = 80;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Response decode error: {0}")]
    Decode(String),
    #[error("Explainer failed: {0}")]
    Explainer(String),
    #[error("Classifier '{0}' does not provide explanations")]
    ExplainUnsupported(String),
    #[error("Malformed classifier output: {0}")]
    Malformed(String),
    #[error("Classifier '{0}' is not loaded")]
    NotLoaded(String),
}

/// A text classifier the core consumes. Implementations own their model
/// lifecycle; `ensure_loaded` may be called any number of times and from
/// several tasks at once.
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    async fn ensure_loaded(&self) -> Result<(), ClassifierError> {
        Ok(())
    }

    async fn classify(&self, text: &str) -> Result<Prediction, ClassifierError>;

    async fn explain(&self, _text: &str) -> Result<RawAttributions, ClassifierError> {
        Err(ClassifierError::ExplainUnsupported(self.name().to_string()))
    }
}

// ============ Wire Shapes ============

/// Every response shape seen from explainer backends.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExplainerWire {
    Error { error: String },
    Lime { lime: Vec<FeatureWeight> },
    Tokens { tokens: Vec<String>, attributions: Vec<f64> },
    Features(Vec<FeatureWeight>),
}

impl ExplainerWire {
    /// Resolve a wire response into the tagged result the core works with.
    pub fn into_result(self) -> Result<RawAttributions, ClassifierError> {
        match self {
            Self::Error { error } => Err(ClassifierError::Explainer(error)),
            Self::Lime { lime } => Ok(RawAttributions::Features(lime)),
            Self::Features(features) => Ok(RawAttributions::Features(features)),
            Self::Tokens { tokens, attributions } => {
                if tokens.len() != attributions.len() {
                    return Err(ClassifierError::Malformed(format!(
                        "{} tokens but {} attributions",
                        tokens.len(),
                        attributions.len()
                    )));
                }
                Ok(RawAttributions::Tokens {
                    tokens,
                    scores: attributions,
                })
            }
        }
    }
}

/// Decode an explainer response body of any supported shape.
pub fn decode_explainer_response(body: &str) -> Result<RawAttributions, ClassifierError> {
    let wire: ExplainerWire =
        serde_json::from_str(body).map_err(|e| ClassifierError::Decode(e.to_string()))?;
    wire.into_result()
}

#[derive(Debug, Clone, Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

// ============ HTTP Classifier ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSpec {
    pub name: String,
    pub base_url: String,
}

/// Parse `name=url`; a bare URL uses its host as the name.
pub fn parse_classifier_spec(spec: &str) -> ClassifierSpec {
    let parts: Vec<&str> = spec.splitn(2, '=').collect();
    if parts.len() == 2 {
        ClassifierSpec {
            name: parts[0].trim().to_string(),
            base_url: parts[1].trim().trim_end_matches('/').to_string(),
        }
    } else {
        let url = spec.trim().trim_end_matches('/');
        let name = url
            .split("://")
            .last()
            .and_then(|rest| rest.split(['/', ':']).next())
            .unwrap_or(url)
            .to_string();
        ClassifierSpec {
            name,
            base_url: url.to_string(),
        }
    }
}

/// Classifier served by a remote model server:
/// `GET /health`, `POST /classify`, `POST /explain`.
pub struct HttpClassifier {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: Client,
    loaded: OnceCell<()>,
}

impl HttpClassifier {
    /// `api_keys` is the loaded config's key table; the environment wins over it.
    pub fn new(
        name: &str,
        base_url: &str,
        timeout_secs: Option<u64>,
        api_keys: &HashMap<String, String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)))
            .build()
            .unwrap_or_default();

        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: get_api_key(name, api_keys),
            client,
            loaded: OnceCell::new(),
        }
    }

    pub fn from_spec(
        spec: &ClassifierSpec,
        timeout_secs: Option<u64>,
        api_keys: &HashMap<String, String>,
    ) -> Self {
        Self::new(&spec.name, &spec.base_url, timeout_secs, api_keys)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_text(&self, path: &str, text: &str) -> Result<String, ClassifierError> {
        let mut request = self
            .client
            .post(self.endpoint(path))
            .header("Content-Type", "application/json")
            .json(&TextRequest { text });
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(
            "[PROVIDER] {} /{} status={} latency_ms={}",
            self.name,
            path,
            status.as_u16(),
            start.elapsed().as_millis()
        );

        if !status.is_success() {
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_loaded(&self) -> Result<(), ClassifierError> {
        self.loaded
            .get_or_try_init(|| async {
                let response = self.client.get(self.endpoint("health")).send().await?;
                let status = response.status();
                if !status.is_success() {
                    warn!("[PROVIDER] {} health check failed: {}", self.name, status);
                    return Err(ClassifierError::NotLoaded(self.name.clone()));
                }
                info!("[PROVIDER] {} ready at {}", self.name, self.base_url);
                Ok(())
            })
            .await
            .map(|_| ())
    }

    async fn classify(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let body = self.post_text("classify", text).await?;
        let prediction: Prediction =
            serde_json::from_str(&body).map_err(|e| ClassifierError::Decode(e.to_string()))?;
        Ok(prediction)
    }

    async fn explain(&self, text: &str) -> Result<RawAttributions, ClassifierError> {
        let body = self.post_text("explain", text).await?;
        decode_explainer_response(&body)
    }
}

/// Get classifier API key from environment, then from the given config key table
pub fn get_api_key(classifier: &str, api_keys: &HashMap<String, String>) -> Option<String> {
    let env_name = format!(
        "PROSEGUARD_{}_API_KEY",
        classifier
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect::<String>()
    );

    if let Ok(val) = env::var(&env_name) {
        let v = val.trim();
        if !v.is_empty() {
            return Some(v.to_string());
        }
    }

    api_keys
        .get(classifier)
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}
