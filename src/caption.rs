//! Remote captioning through imgflip's `caption_image` endpoint.
//!
//! An alternative to local rendering: the service draws the captions and
//! hosts the result. It needs account credentials, so it is only available
//! when both `IMGFLIP_USERNAME` and `IMGFLIP_PASSWORD` are configured.

use serde::{Deserialize, Serialize};

use crate::config::CaptionCredentials;
use crate::error::MemeError;

/// A hosted, captioned meme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionedImage {
    pub url: String,
    pub page_url: String,
}

#[derive(Debug, Deserialize)]
struct CaptionEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<CaptionData>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionData {
    url: String,
    #[serde(default)]
    page_url: String,
}

pub struct Captioner {
    client: reqwest::Client,
    url: String,
    credentials: Option<CaptionCredentials>,
}

impl Captioner {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        credentials: Option<CaptionCredentials>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            credentials,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Caption `template_id` remotely and return the hosted image.
    pub async fn caption(
        &self,
        template_id: &str,
        top: &str,
        bottom: &str,
    ) -> Result<CaptionedImage, MemeError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| MemeError::Config("Captioning credentials not configured".to_string()))?;
        if template_id.trim().is_empty() {
            return Err(MemeError::InvalidInput("templateId is required".to_string()));
        }

        let form = [
            ("template_id", template_id),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("text0", top),
            ("text1", bottom),
        ];
        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .map_err(|e| MemeError::Transport(format!("Caption request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(MemeError::Transport(format!(
                "Caption endpoint returned HTTP {}",
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| MemeError::Transport(format!("Failed to read caption response: {}", e)))?;

        let captioned = parse_caption_response(&body)?;
        tracing::info!(template_id, url = %captioned.url, "captioned remotely");
        Ok(captioned)
    }
}

/// Decode a `caption_image` response body.
pub fn parse_caption_response(body: &str) -> Result<CaptionedImage, MemeError> {
    let envelope: CaptionEnvelope = serde_json::from_str(body)
        .map_err(|e| MemeError::MalformedResponse(format!("Bad caption response: {}", e)))?;

    if !envelope.success {
        return Err(MemeError::Captioning(
            envelope
                .error_message
                .unwrap_or_else(|| "Captioning failed".to_string()),
        ));
    }
    let data = envelope
        .data
        .ok_or_else(|| MemeError::MalformedResponse("Caption response has no data".to_string()))?;
    Ok(CaptionedImage {
        url: data.url,
        page_url: data.page_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_success() {
        let body = r#"{"success": true, "data": {"url": "https://i.imgflip.com/abc.jpg", "page_url": "https://imgflip.com/i/abc"}}"#;
        assert_eq!(
            parse_caption_response(body).unwrap(),
            CaptionedImage {
                url: "https://i.imgflip.com/abc.jpg".to_string(),
                page_url: "https://imgflip.com/i/abc".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_failure_message() {
        let body = r#"{"success": false, "error_message": "Invalid username/password"}"#;
        match parse_caption_response(body) {
            Err(MemeError::Captioning(msg)) => assert_eq!(msg, "Invalid username/password"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_caption_response("<html>"),
            Err(MemeError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_without_credentials() {
        let captioner = Captioner::new(reqwest::Client::new(), "http://localhost", None);
        assert!(!captioner.is_enabled());
        assert!(matches!(
            captioner.caption("61579", "a", "b").await,
            Err(MemeError::Config(_))
        ));
    }
}
