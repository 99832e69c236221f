//! Remote template catalog fetch.
//!
//! The catalog endpoint returns the whole template list in one response.
//! The envelope follows imgflip's `get_memes`:
//!
//! ```text
//! { "success": true,
//!   "data": { "memes": [ { "id", "name", "url", "width", "height", "box_count" } ] } }
//! ```

use async_trait::async_trait;
use serde::Deserialize;

use super::Template;
use crate::error::MemeError;

/// Something that can produce the full template list.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Fetch every template. All-or-nothing: either the complete list or an error.
    async fn fetch(&self) -> Result<Vec<Template>, MemeError>;
}

/// Fetches templates over HTTP from an imgflip-compatible endpoint.
pub struct HttpTemplateSource {
    client: reqwest::Client,
    url: String,
}

impl HttpTemplateSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<EnvelopeData>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    memes: Vec<RemoteMeme>,
}

#[derive(Debug, Deserialize)]
struct RemoteMeme {
    id: String,
    name: String,
    url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    box_count: u32,
}

impl From<RemoteMeme> for Template {
    fn from(m: RemoteMeme) -> Self {
        Template {
            id: m.id,
            name: m.name,
            image_url: m.url,
            width: m.width,
            height: m.height,
            native_box_count: m.box_count,
        }
    }
}

/// Decode a catalog response body into templates.
pub fn parse_catalog(body: &str) -> Result<Vec<Template>, MemeError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| MemeError::Catalog(format!("Failed to parse catalog: {}", e)))?;

    if !envelope.success {
        return Err(MemeError::Catalog(format!(
            "Catalog endpoint reported failure: {}",
            envelope.error_message.as_deref().unwrap_or("no message")
        )));
    }

    let data = envelope
        .data
        .ok_or_else(|| MemeError::Catalog("Catalog response has no data".to_string()))?;

    Ok(data.memes.into_iter().map(Template::from).collect())
}

#[async_trait]
impl TemplateSource for HttpTemplateSource {
    async fn fetch(&self) -> Result<Vec<Template>, MemeError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| MemeError::Catalog(format!("Failed to fetch {}: {}", self.url, e)))?;
        if !response.status().is_success() {
            return Err(MemeError::Catalog(format!(
                "Failed to fetch {}: HTTP {}",
                self.url,
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| MemeError::Catalog(format!("Failed to read catalog body: {}", e)))?;

        parse_catalog(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog() {
        let body = r#"{"success":true,"data":{"memes":[
            {"id":"4087833","name":"Waiting Skeleton","url":"https://i.imgflip.com/2fm6x.jpg",
             "width":298,"height":403,"box_count":2,"captions":123}
        ]}}"#;
        let templates = parse_catalog(body).unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "Waiting Skeleton");
        assert_eq!(templates[0].image_url, "https://i.imgflip.com/2fm6x.jpg");
        assert_eq!(templates[0].native_box_count, 2);
    }

    #[test]
    fn test_parse_catalog_failure_flag() {
        let body = r#"{"success":false,"error_message":"rate limited"}"#;
        let err = parse_catalog(body).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_parse_catalog_garbage() {
        assert!(matches!(
            parse_catalog("<html>oops</html>"),
            Err(MemeError::Catalog(_))
        ));
    }
}
