//! Request types shared by the completion backends

use serde::Serialize;

use crate::models::ChatMessage;

/// Model families that differ in the parameters they accept
///
/// Reasoning models (`gpt-5*`, `o1`, `o3`, `o4`) reject `temperature` and
/// take their token budget as `max_completion_tokens`. Everything else takes
/// `temperature` plus `max_tokens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Reasoning,
    Standard,
}

const REASONING_PREFIXES: &[&str] = &["o1", "o3", "o4"];

impl ModelFamily {
    /// Classify a model id
    pub fn of(model: &str) -> Self {
        let model = model.trim().to_lowercase();
        if model.starts_with("gpt-5") {
            return Self::Reasoning;
        }
        let is_o_series = REASONING_PREFIXES
            .iter()
            .any(|p| model == *p || model.starts_with(&format!("{}-", p)));
        if is_o_series {
            Self::Reasoning
        } else {
            Self::Standard
        }
    }

    /// Sampling parameters for this family
    pub fn params(&self, max_tokens: u32, temperature: f32) -> SamplingParams {
        match self {
            Self::Reasoning => SamplingParams::Reasoning {
                max_completion_tokens: max_tokens,
            },
            Self::Standard => SamplingParams::Standard {
                temperature,
                max_tokens,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Standard => "standard",
        }
    }
}

/// Family-specific request parameters, flattened into the request body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SamplingParams {
    Reasoning { max_completion_tokens: u32 },
    Standard { temperature: f32, max_tokens: u32 },
}

/// One chat completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub params: SamplingParams,
}

impl CompletionRequest {
    /// Build a request, picking the parameter shape from the model id
    pub fn new(model: &str, messages: Vec<ChatMessage>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            model: model.to_string(),
            messages,
            params: ModelFamily::of(model).params(max_tokens, temperature),
        }
    }

    /// Content of the system message, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == crate::models::Role::System)
            .map(|m| m.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_family_classification() {
        assert_eq!(ModelFamily::of("gpt-5.2"), ModelFamily::Reasoning);
        assert_eq!(ModelFamily::of("gpt-5-mini"), ModelFamily::Reasoning);
        assert_eq!(ModelFamily::of("o1"), ModelFamily::Reasoning);
        assert_eq!(ModelFamily::of("o3-mini"), ModelFamily::Reasoning);
        assert_eq!(ModelFamily::of("gpt-4o"), ModelFamily::Standard);
        assert_eq!(ModelFamily::of("gpt-4o-mini"), ModelFamily::Standard);
        assert_eq!(ModelFamily::of("o10-preview"), ModelFamily::Standard);
        assert_eq!(ModelFamily::of("llama3.2"), ModelFamily::Standard);
    }

    #[test]
    fn test_params_serialize_per_family() {
        let reasoning = serde_json::to_value(ModelFamily::Reasoning.params(1000, 0.7)).unwrap();
        assert_eq!(reasoning["max_completion_tokens"], 1000);
        assert!(reasoning.get("temperature").is_none());
        assert!(reasoning.get("max_tokens").is_none());

        let standard = serde_json::to_value(ModelFamily::Standard.params(800, 0.7)).unwrap();
        assert_eq!(standard["max_tokens"], 800);
        assert!((standard["temperature"].as_f64().unwrap() - 0.7).abs() < 0.001);
        assert!(standard.get("max_completion_tokens").is_none());
    }

    #[test]
    fn test_request_picks_params_from_model() {
        let request = CompletionRequest::new("gpt-4o", vec![ChatMessage::user("hi")], 1000, 0.7);
        assert!(matches!(request.params, SamplingParams::Standard { max_tokens: 1000, .. }));
        assert!(request.system_prompt().is_none());
    }
}
