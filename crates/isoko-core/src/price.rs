//! AI price suggestion
//!
//! Calls the remote generative-language endpoint with a product name
//! and description and extracts a numeric price from the free-text
//! reply. Malformed or missing numeric content is an error, never a
//! silent zero.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};
use crate::retry::RetryPolicy;

/// Request timeout in seconds
const REQUEST_TIMEOUT: u64 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Client for the remote price-suggestion call
pub struct PriceSuggester {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl PriceSuggester {
    /// Create a suggester against the given endpoint
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, retry: RetryPolicy) -> MarketResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            retry,
        })
    }

    /// Suggest a price for a product, in whole-market currency units
    pub async fn suggest(&self, name: &str, description: &str) -> MarketResult<f64> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(name, description),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "text/plain".to_string(),
            },
        };

        let response = self
            .retry
            .run(|| async {
                self.client
                    .post(&self.api_url)
                    .query(&[("key", self.api_key.as_str())])
                    .json(&request)
                    .send()
                    .await?
                    .error_for_status()
                    .map_err(MarketError::from)
            })
            .await?;

        let body: GenerateResponse = response.json().await?;
        parse_suggestion(body)
    }
}

fn build_prompt(name: &str, description: &str) -> String {
    format!(
        "Based on the following produce, suggest a realistic price in Rwandan Francs (RWF) as a single number.\n\
         Product: {}\n\
         Description: {}\n\
         Suggested Price (RWF):",
        name, description
    )
}

/// Pull the suggested price out of a response body
fn parse_suggestion(body: GenerateResponse) -> MarketResult<f64> {
    let text = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| MarketError::MalformedResponse {
            details: "no suggestion returned".to_string(),
        })?;

    extract_price(&text).ok_or(MarketError::MalformedResponse {
        details: format!("could not parse a price from '{}'", text.trim()),
    })
}

/// Extract a numeric price from free text
///
/// Strips everything but digits and decimal points, then parses.
fn extract_price(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok().filter(|p| p.is_finite() && *p >= 0.0)
}
