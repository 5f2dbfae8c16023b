/// Image classification
///
/// Asks a generative vision model to count cattle and rate the road. The
/// upload flow never waits on this service being healthy: any failure is
/// replaced by a locally generated fallback analysis.

use crate::{
    config::ClassifierConfig,
    metrics,
    reports::RoadCondition,
};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Instruction sent alongside every image
pub const ANALYSIS_PROMPT: &str = r#"Analyze this road image and provide:
1. Count the number of cattle (cows, buffaloes, etc.) visible in the image
2. Assess the road condition (Good/Moderate/Poor)
3. Provide a brief description of the hazard level

Please respond ONLY in this JSON format (no markdown, no code blocks):
{
  "cowCount": <number>,
  "roadCondition": "Good|Moderate|Poor",
  "description": "<brief description of cattle and road hazards>"
}"#;

/// Description attached to fallback results
pub const FALLBACK_DESCRIPTION: &str = "Cattle detected on road. Exercise caution and reduce speed.";

/// Classifier verdict for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub cow_count: u32,
    pub road_condition: RoadCondition,
    pub description: String,
}

/// Image classification service contract
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn analyze(&self, jpeg: &[u8]) -> anyhow::Result<AnalysisResult>;
}

/// Google Generative Language API client
pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClassifier {
    /// `None` when no API key is configured
    pub fn from_config(config: &ClassifierConfig) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone() else {
            warn!("Google Generative AI key not configured, uploads will use fallback analysis");
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building classification HTTP client")?;

        Ok(Some(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }))
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
impl ImageClassifier for GeminiClassifier {
    async fn analyze(&self, jpeg: &[u8]) -> anyhow::Result<AnalysisResult> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = json!({
            "contents": [{
                "parts": [
                    { "inline_data": { "mime_type": "image/jpeg", "data": STANDARD.encode(jpeg) } },
                    { "text": ANALYSIS_PROMPT }
                ]
            }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("classification request failed")?
            .error_for_status()
            .context("classification service returned an error status")?;

        let reply: GenerateResponse = response
            .json()
            .await
            .context("classification response was not JSON")?;

        let text: String = reply
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        debug!("Classifier replied with {} characters", text.len());
        parse_analysis(&text)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    cow_count: serde_json::Value,
    road_condition: String,
    #[serde(default)]
    description: String,
}

/// Pull the first `{ ... }` span out of model text and parse it
pub fn parse_analysis(text: &str) -> anyhow::Result<AnalysisResult> {
    let start = text.find('{').ok_or_else(|| anyhow!("no JSON object in reply"))?;
    let end = text.rfind('}').ok_or_else(|| anyhow!("no JSON object in reply"))?;
    if end < start {
        bail!("no JSON object in reply");
    }

    let raw: RawAnalysis =
        serde_json::from_str(&text[start..=end]).context("reply JSON did not match the schema")?;

    let cow_count = match &raw.cow_count {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .and_then(|n| u32::try_from(n).ok())
    .ok_or_else(|| anyhow!("invalid cowCount: {}", raw.cow_count))?;

    let road_condition = RoadCondition::from_str(&raw.road_condition)
        .map_err(|e| anyhow!(e.to_string()))?;

    Ok(AnalysisResult {
        cow_count,
        road_condition,
        description: raw.description,
    })
}

/// Pseudo-random result used whenever classification is unavailable
pub fn fallback_analysis() -> AnalysisResult {
    let mut rng = rand::thread_rng();
    AnalysisResult {
        cow_count: rng.gen_range(1..=10),
        road_condition: RoadCondition::ALL[rng.gen_range(0..RoadCondition::ALL.len())],
        description: FALLBACK_DESCRIPTION.to_string(),
    }
}

/// Classify with the service if one is configured, otherwise or on any
/// failure return the fallback. Never fails.
pub async fn classify_or_fallback(
    classifier: Option<&dyn ImageClassifier>,
    jpeg: &[u8],
) -> AnalysisResult {
    let Some(classifier) = classifier else {
        metrics::CLASSIFICATIONS_TOTAL
            .with_label_values(&["fallback"])
            .inc();
        return fallback_analysis();
    };

    match classifier.analyze(jpeg).await {
        Ok(result) => {
            metrics::CLASSIFICATIONS_TOTAL.with_label_values(&["ai"]).inc();
            result
        }
        Err(e) => {
            let err = crate::error::AlertError::ClassificationUnavailable(format!("{:#}", e));
            warn!("{}, using fallback analysis", err);
            metrics::CLASSIFICATIONS_TOTAL
                .with_label_values(&["fallback"])
                .inc();
            fallback_analysis()
        }
    }
}
