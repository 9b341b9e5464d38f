use crate::error::{Error, Result};
use crate::models::question::RawQuestion;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// What the generator is asked to derive questions from.
#[derive(Debug, Clone)]
pub enum GenerationSource {
    Text(String),
    Image { base64: String, mime: String },
    File { name: String, bytes: Vec<u8> },
}

/// Boundary to the generative model. Output is untrusted: it may contain
/// duplicates or malformed items and is validated by the import pipeline.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(
        &self,
        source: &GenerationSource,
        subject: &str,
        topic: &str,
        count: usize,
    ) -> Result<Vec<RawQuestion>>;
}

#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, client: Client) -> Self {
        Self { client, api_key }
    }

    fn system_prompt() -> &'static str {
        r#"You are an expert quiz author.
Generate multiple-choice questions from the provided material.
The output must be a valid JSON object containing a 'questions' array.

Rules:
1. Generate exactly the requested number of questions.
2. Each question has exactly 4 distinct options and one correct answer.
3. 'correct_answer' must repeat the correct option's full text verbatim.
4. Vary which option position holds the correct answer.
5. Avoid "All of the above" or "None of the above" options.
"#
    }

    fn user_content(source: &GenerationSource, subject: &str, topic: &str, count: usize) -> JsonValue {
        let request = serde_json::json!({
            "subject": subject,
            "topic": topic,
            "required_count": count,
            "schema_example": {
                "questions": [
                    {
                        "text": "Question text here...",
                        "options": ["Option 1", "Option 2", "Option 3", "Option 4"],
                        "correct_answer": "Option 2"
                    }
                ]
            }
        });

        match source {
            GenerationSource::Text(text) => serde_json::json!(format!(
                "{}\n\nSource material:\n{}",
                request, text
            )),
            GenerationSource::Image { base64, mime } => serde_json::json!([
                { "type": "text", "text": request.to_string() },
                {
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", mime, base64),
                        "detail": "high"
                    }
                }
            ]),
            GenerationSource::File { name, bytes } => {
                // Best effort text extraction; binary formats degrade to
                // whatever readable text they contain.
                let text = String::from_utf8_lossy(bytes);
                serde_json::json!(format!(
                    "{}\n\nSource file '{}':\n{}",
                    request, name, text
                ))
            }
        }
    }

    async fn chat_openai(&self, payload: JsonValue) -> Result<JsonValue> {
        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "Model API error {}: {}",
                status, text
            )));
        }

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| Error::Generation("Invalid model response format".to_string()))
    }
}

/// Lenient extraction of candidate questions from the model's JSON reply.
/// Items missing fields come through with empty values and are rejected by
/// the pipeline's validation step rather than crashing the parse.
pub fn parse_candidates(raw: &JsonValue) -> Vec<RawQuestion> {
    let arr = if let Some(arr) = raw.get("questions").and_then(|a| a.as_array()) {
        arr.clone()
    } else if let Some(arr) = raw.as_array() {
        arr.clone()
    } else {
        vec![]
    };

    arr.iter()
        .map(|val| RawQuestion {
            text: val
                .get("text")
                .or_else(|| val.get("question"))
                .and_then(|s| s.as_str())
                .unwrap_or_default()
                .to_string(),
            options: val
                .get("options")
                .and_then(|o| o.as_array())
                .map(|a| {
                    a.iter()
                        .filter_map(|x| x.as_str().map(|s| s.to_string()))
                        .collect()
                })
                .unwrap_or_default(),
            correct_answer: val
                .get("correct_answer")
                .and_then(|s| s.as_str())
                .unwrap_or_default()
                .to_string(),
        })
        .collect()
}

#[async_trait]
impl QuestionGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        source: &GenerationSource,
        subject: &str,
        topic: &str,
        count: usize,
    ) -> Result<Vec<RawQuestion>> {
        let payload = serde_json::json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": Self::system_prompt()},
                {"role": "user", "content": Self::user_content(source, subject, topic, count)}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.8
        });

        tracing::info!(subject, topic, count, "requesting question generation");
        let response = self.chat_openai(payload).await?;
        let candidates = parse_candidates(&response);
        tracing::info!(returned = candidates.len(), "generation response parsed");
        Ok(candidates)
    }
}
