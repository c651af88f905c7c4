//! OpenAI-compatible vision chat client.
//!
//! Sends the frame as an image data URI alongside the analysis instructions
//! and expects the model to answer with a single JSON object.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Classifier, ClassifierError};
use crate::models::{AnalysisOutcome, Direction, Frame};

const CLASSIFY_PROMPT: &str = "\
You analyze crowd distribution in a single camera frame. Count the number of \
people and identify where the largest group is located.

1. Count the total number of people visible in the frame.
2. Mentally divide the frame vertically into three sections: 'left' (the \
leftmost 40%), 'center' (the middle 20%), and 'right' (the rightmost 40%).
3. Count the people whose center of mass falls into each section.
4. The section containing the most people is the dominant position.
5. If people are spread roughly evenly across the sections, or you cannot \
confidently place the majority in one section, use 'everywhere'.

Base the position solely on where people are in the image, not on the \
direction they are facing.

Respond with exactly one JSON object of the form \
{\"personCount\": <integer>, \"direction\": \"left\"|\"center\"|\"right\"|\"everywhere\", \
\"confidence\": <number between 0 and 1>}.";

const DETECT_PROMPT: &str = "\
Count the number of people visible in the image. Respond with exactly one \
JSON object of the form {\"personCount\": <integer>}.";

const POSITION_PROMPT: &str = "\
People are present in this camera frame. Identify where the largest group is \
located. Mentally divide the frame vertically into three sections: 'left' \
(the leftmost 40%), 'center' (the middle 20%), and 'right' (the rightmost \
40%), count the people whose center of mass falls into each section, and \
pick the section with the most people. If people are spread roughly evenly, \
use 'everywhere'. Base the position solely on where people are, not where \
they are facing.

Respond with exactly one JSON object of the form \
{\"direction\": \"left\"|\"center\"|\"right\"|\"everywhere\", \
\"confidence\": <number between 0 and 1>}.";

/// Which request shape the classifier uses. Both shapes produce the same
/// outcome triple at the trait boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierFlow {
    /// One call returning count, direction, and confidence together.
    Combined,
    /// Count people first; classify position only when somebody is visible.
    DetectFirst,
}

pub struct VisionClassifier {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    flow: ClassifierFlow,
}

impl VisionClassifier {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        flow: ClassifierFlow,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClassifierError::Transport)?;

        Ok(Self {
            client,
            base_url,
            model,
            api_key,
            flow,
        })
    }

    /// One chat completion round: prompt plus the frame, JSON content back.
    async fn chat(&self, prompt: &str, frame: &Frame) -> Result<String, ClassifierError> {
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": frame.to_data_uri() } },
                ],
            }],
            "temperature": 0.0,
            "response_format": { "type": "json_object" },
        });

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(map_transport)?;

        let completion: ChatCompletion = response.json().await.map_err(map_transport)?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ClassifierError::Schema("completion carried no choices".into()))?;

        debug!("classifier content: {content}");
        Ok(content)
    }
}

#[async_trait]
impl Classifier for VisionClassifier {
    async fn classify(&self, frame: &Frame) -> Result<AnalysisOutcome, ClassifierError> {
        match self.flow {
            ClassifierFlow::Combined => {
                let content = self.chat(CLASSIFY_PROMPT, frame).await?;
                let verdict: RawVerdict = parse_content(&content)?;
                validate_verdict(verdict)
            }
            ClassifierFlow::DetectFirst => {
                let content = self.chat(DETECT_PROMPT, frame).await?;
                let headcount: RawHeadcount = parse_content(&content)?;
                let person_count = validate_count(headcount.person_count)?;
                if person_count == 0 {
                    return Ok(AnalysisOutcome::nobody());
                }

                let content = self.chat(POSITION_PROMPT, frame).await?;
                let position: RawPosition = parse_content(&content)?;
                Ok(AnalysisOutcome {
                    person_count,
                    direction: validate_direction(&position.direction)?,
                    confidence: validate_confidence(position.confidence)?,
                })
            }
        }
    }
}

fn map_transport(err: reqwest::Error) -> ClassifierError {
    if err.is_timeout() {
        ClassifierError::Timeout
    } else {
        ClassifierError::Transport(err)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerdict {
    person_count: i64,
    direction: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHeadcount {
    person_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPosition {
    direction: String,
    confidence: f64,
}

fn parse_content<T: DeserializeOwned>(content: &str) -> Result<T, ClassifierError> {
    serde_json::from_str(extract_json(content)).map_err(|err| {
        ClassifierError::Schema(format!("completion content is not the expected JSON: {err}"))
    })
}

/// Models occasionally wrap the object in a markdown code fence despite the
/// JSON response format.
fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn validate_verdict(raw: RawVerdict) -> Result<AnalysisOutcome, ClassifierError> {
    Ok(AnalysisOutcome {
        person_count: validate_count(raw.person_count)?,
        direction: validate_direction(&raw.direction)?,
        confidence: validate_confidence(raw.confidence)?,
    })
}

fn validate_count(count: i64) -> Result<u32, ClassifierError> {
    u32::try_from(count).map_err(|_| {
        ClassifierError::Schema(format!("person count {count} is not a non-negative integer"))
    })
}

fn validate_direction(label: &str) -> Result<Direction, ClassifierError> {
    Direction::parse(label)
        .ok_or_else(|| ClassifierError::Schema(format!("unrecognized direction '{label}'")))
}

fn validate_confidence(value: f64) -> Result<f64, ClassifierError> {
    if value.is_finite() {
        Ok(value.clamp(0.0, 1.0))
    } else {
        Err(ClassifierError::Schema(format!(
            "confidence {value} is not a finite number"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_code_fences() {
        assert_eq!(extract_json("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn valid_verdict_parses_and_validates() {
        let outcome = parse_content::<RawVerdict>(
            "{\"personCount\": 7, \"direction\": \"left\", \"confidence\": 0.82}",
        )
        .and_then(validate_verdict)
        .unwrap();

        assert_eq!(outcome.person_count, 7);
        assert_eq!(outcome.direction, Direction::Left);
        assert_eq!(outcome.confidence, 0.82);
    }

    #[test]
    fn negative_person_count_fails_validation() {
        let raw = RawVerdict {
            person_count: -2,
            direction: "left".into(),
            confidence: 0.5,
        };
        assert!(matches!(
            validate_verdict(raw),
            Err(ClassifierError::Schema(_))
        ));
    }

    #[test]
    fn unrecognized_direction_fails_validation() {
        let raw = RawVerdict {
            person_count: 3,
            direction: "behind".into(),
            confidence: 0.5,
        };
        assert!(matches!(
            validate_verdict(raw),
            Err(ClassifierError::Schema(_))
        ));
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        assert_eq!(validate_confidence(1.4).unwrap(), 1.0);
        assert_eq!(validate_confidence(-0.2).unwrap(), 0.0);
        assert_eq!(validate_confidence(0.5).unwrap(), 0.5);
        assert!(validate_confidence(f64::NAN).is_err());
    }

    #[test]
    fn non_json_content_is_a_schema_error() {
        let result = parse_content::<RawVerdict>("I see about five people on the left.");
        assert!(matches!(result, Err(ClassifierError::Schema(_))));
    }
}
