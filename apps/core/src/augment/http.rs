use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};
use url::Url;
use validator::Validate;

use super::traits::{AugmentRequest, Augmenter};
use crate::config::AugmentConfig;
use crate::error::AppError;

/// Augmenter backed by an OpenAI-compatible chat-completions endpoint.
pub struct HttpAugmenter {
    client: Client,
    endpoint: Url,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl HttpAugmenter {
    /// Builds the client from a validated configuration.
    pub fn new(config: &AugmentConfig) -> Result<Self, AppError> {
        config.validate()?;

        let base = config
            .base_url
            .as_deref()
            .ok_or_else(|| AppError::Config("augmentation base URL is not set".to_string()))?;
        let endpoint = Url::parse(&format!("{}/chat/completions", base.trim_end_matches('/')))?;

        info!("Augmentation enabled via {} ({})", endpoint, config.model);

        Ok(Self {
            client: Client::new(),
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key.clone(),
        })
    }

    fn build_request(&self, payload: &serde_json::Value) -> Result<reqwest::RequestBuilder, AppError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let auth_value: HeaderValue = format!("Bearer {}", key)
                .parse()
                .map_err(|_| AppError::Config("API key is not a valid header value".to_string()))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        Ok(self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .json(payload))
    }
}

#[async_trait]
impl Augmenter for HttpAugmenter {
    async fn augment(&self, request: &AugmentRequest) -> Result<String, AppError> {
        debug!(session = %request.session_id, "Requesting augmented reply");

        let payload = json!({
            "model": self.model,
            "temperature": self.temperature,
            "user": request.session_id,
            "messages": [
                { "role": "system", "content": request.system_prompt() },
                { "role": "user", "content": request.message },
            ],
        });

        let res = self.build_request(&payload)?.send().await?;
        let status = res.status();

        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::Augment(format!(
                "Completion request failed with status {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = res.json().await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or("");

        if content.is_empty() {
            return Err(AppError::Augment(
                "Completion response carried no content".to_string(),
            ));
        }
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::intent::{Intent, IntentResult};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> AugmentConfig {
        AugmentConfig {
            base_url: Some(base_url),
            api_key: Some("secret".to_string()),
            ..Default::default()
        }
    }

    fn request() -> AugmentRequest {
        AugmentRequest {
            session_id: "session-1".to_string(),
            message: "Is kefir good for me?".to_string(),
            intent: IntentResult::rule_based(Intent::ProbioticInfo),
            composed: "composed".to_string(),
            user_profile: None,
            microbiome: None,
        }
    }

    #[tokio::test]
    async fn test_augment_success() {
        // 1. Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": " Kefir is great. " } }]
            })))
            .mount(&mock_server)
            .await;

        let augmenter = HttpAugmenter::new(&config(mock_server.uri())).unwrap();

        // 2. Act
        let result = augmenter.augment(&request()).await;

        // 3. Assert
        assert_eq!(result.unwrap(), "Kefir is great.");
    }

    #[tokio::test]
    async fn test_augment_server_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&mock_server)
            .await;

        let augmenter = HttpAugmenter::new(&config(mock_server.uri())).unwrap();
        let result = augmenter.augment(&request()).await;

        if let Err(AppError::Augment(err_msg)) = &result {
            assert!(err_msg.contains("status 500"));
            assert!(err_msg.contains("Internal Server Error"));
        } else {
            panic!("Expected AppError::Augment, got {:?}", result);
        }
    }

    #[tokio::test]
    async fn test_augment_empty_content_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&mock_server)
            .await;

        let augmenter = HttpAugmenter::new(&config(mock_server.uri())).unwrap();
        assert!(matches!(
            augmenter.augment(&request()).await,
            Err(AppError::Augment(_))
        ));
    }

    #[test]
    fn test_missing_base_url_is_config_error() {
        let result = HttpAugmenter::new(&AugmentConfig::default());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_out_of_range_temperature_is_rejected() {
        let config = AugmentConfig {
            base_url: Some("http://localhost:9".to_string()),
            temperature: 3.5,
            ..Default::default()
        };
        assert!(matches!(HttpAugmenter::new(&config), Err(AppError::Validation(_))));
    }
}
