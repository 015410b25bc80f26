use std::fmt;

use async_trait::async_trait;
use log::{debug, error, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GenerationConfig;

// ===== Request Types =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part
{   pub text: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content
{   pub role: String
  , pub parts: Vec<Part>
}

impl Content
{   pub fn text(role: &str, text: impl Into<String>) -> Self
    {   Content
        {   role: role.to_string()
          , parts: vec![Part { text: text.into() }]
        }
    }
}

/// Body of a `generateContent` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub system_instruction: Content
  , pub contents: Vec<Content>
  , pub generation_config: GenerationConfig
}

impl GenerateContentRequest
{   /// System instruction block plus a single user turn
    pub fn new(
      system_instruction: impl Into<String>
    , user_text: impl Into<String>
    , generation_config: GenerationConfig
    ) -> Self
    {   GenerateContentRequest
        {   system_instruction: Content::text("system", system_instruction)
          , contents: vec![Content::text("user", user_text)]
          , generation_config
        }
    }
}

// ===== Response Types =====
//
// Every field is optional: the upstream shape drifts and a missing or odd
// field must never turn a 200 into an error.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateContentResponse
{   pub candidates: Option<Vec<ResponseCandidate>>
  , pub prompt_feedback: Option<PromptFeedback>
  , pub usage_metadata: Option<Value>
  , pub response_id: Option<String>
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseCandidate
{   pub content: Option<ResponseContent>
  , pub finish_reason: Option<String>
  , pub safety_ratings: Option<Vec<SafetyRating>>
}

impl ResponseCandidate
{   /// First part whose text is non-blank, trimmed
    fn first_text(&self) -> Option<&str>
    {   self.content.as_ref()?
          .parts.as_deref()?
          .iter()
          .filter_map(|p| p.text.as_ref()?.as_str())
          .map(str::trim)
          .find(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResponseContent
{   pub parts: Option<Vec<ResponsePart>>
  , pub role: Option<String>
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResponsePart
{   pub text: Option<Value>
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptFeedback
{   pub block_reason: Option<String>
  , pub safety_ratings: Option<Vec<SafetyRating>>
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SafetyRating
{   pub category: Option<String>
  , pub probability: Option<Value>
  , pub probability_score: Option<Value>
}

impl SafetyRating
{   fn render(&self) -> String
    {   let category = self.category
          .as_deref()
          .filter(|c| !c.is_empty())
          .unwrap_or("unknown");
        let probability = self.probability
          .as_ref()
          .and_then(scalar_text)
          .or_else(|| self.probability_score.as_ref().and_then(scalar_text));
        match probability
        {   Some(p) => format!("{} ({})", category, p)
          , None => category.to_string()
        }
    }
}

fn scalar_text(value: &Value) -> Option<String>
{   match value
    {   Value::String(s) if !s.is_empty() => Some(s.clone())
      , Value::Number(n) => Some(n.to_string())
      , _ => None
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListModelsResponse
{   pub models: Option<Vec<ModelDescriptor>>
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelDescriptor
{   pub name: Option<String>
  , pub model: Option<String>
}

impl ListModelsResponse
{   pub fn names(&self) -> Vec<String>
    {   self.models
          .iter()
          .flatten()
          .filter_map(|m| {
            m.name.clone()
              .filter(|n| !n.is_empty())
              .or_else(|| m.model.clone())
          })
          .filter(|n| !n.is_empty())
          .collect()
    }
}

// ===== Normalized Result =====

/// What one successful HTTP call produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationResult
{   /// Trimmed text of the first non-blank part, or empty
    pub text: String
  , pub finish_reason: Option<String>
  , pub block_reason: Option<String>
  , /// `CATEGORY (PROBABILITY)` pairs, comma-joined
    pub safety_summary: Option<String>
  , pub raw: Value
}

impl InvocationResult
{   pub fn has_text(&self) -> bool
    {   !self.text.is_empty()
    }

    pub fn usage_metadata(&self) -> Option<&Value>
    {   self.raw.get("usageMetadata")
    }

    pub fn response_id(&self) -> Option<&str>
    {   self.raw.get("responseId").and_then(Value::as_str)
    }
}

/// Pull text and diagnostics out of a raw `generateContent` reply
///
/// The winner is the first candidate holding a non-blank text part. Without
/// a winner the text is empty and the finish reason comes from the first
/// candidate.
pub fn extract_result(raw: Value) -> InvocationResult
{   let parsed = GenerateContentResponse
    {   candidates: field(&raw, "candidates")
      , prompt_feedback: field(&raw, "promptFeedback")
      , usage_metadata: raw.get("usageMetadata").cloned()
      , response_id: field(&raw, "responseId")
    };

    let candidates = parsed.candidates.as_deref().unwrap_or(&[]);
    let winner = candidates
      .iter()
      .find_map(|c| c.first_text().map(|t| (c, t)));

    let text = winner
      .map(|(_, t)| t.to_string())
      .unwrap_or_default();

    let finish_reason = winner
      .map(|(c, _)| c)
      .or_else(|| candidates.first())
      .and_then(|c| c.finish_reason.clone());

    let feedback = parsed.prompt_feedback.as_ref();
    let block_reason = feedback.and_then(|f| f.block_reason.clone());

    let ratings = feedback
      .and_then(|f| f.safety_ratings.as_deref())
      .or_else(|| winner.and_then(|(c, _)| c.safety_ratings.as_deref()));
    let safety_summary = ratings
      .map(|rs| {
        rs.iter()
          .map(SafetyRating::render)
          .collect::<Vec<_>>()
          .join(", ")
      })
      .filter(|s| !s.is_empty());

    InvocationResult
    {   text
      , finish_reason
      , block_reason
      , safety_summary
      , raw
    }
}

/// One top-level field, read on its own so a drifted sibling cannot hide it
fn field<T>(raw: &Value, name: &str) -> Option<T>
where T: serde::de::DeserializeOwned
{   let value = raw.get(name)?.clone();
    serde_json::from_value(value)
      .map_err(|e| debug!("Unexpected {} shape: {}", name, e))
      .ok()
}

/// Message for a failed call: `error.message`, the JSON itself, or the raw body
pub fn error_message(body: &str) -> String
{   match serde_json::from_str::<Value>(body)
    {   Ok(json) => json
          .get("error")
          .and_then(|e| e.get("message"))
          .and_then(Value::as_str)
          .map(str::to_string)
          .unwrap_or_else(|| json.to_string())
      , Err(_) if body.trim().is_empty() => "Unknown error".to_string()
      , Err(_) => body.to_string()
    }
}

// ===== Gemini Client =====

/// Gemini REST client keyed by a single API key
#[derive(Clone)]
pub struct GeminiClient
{   api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl fmt::Debug for GeminiClient
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("GeminiClient")
          .field("api_base", &self.api_base)
          .finish_non_exhaustive()
    }
}

impl GeminiClient
{   pub fn new(
      api_key: impl Into<String>
    , api_base: impl Into<String>
    ) -> Self
    {   debug!("Creating GeminiClient");
        GeminiClient
        {   api_key: api_key.into()
          , api_base: api_base.into().trim_end_matches('/').to_string()
          , http_client: reqwest::Client::new()
        }
    }

    pub fn from_config(
      config: &crate::config::InsightConfig
    ) -> Result<Self, crate::error::Error>
    {   let key = config.require_api_key()?;
        Ok(GeminiClient::new(key, config.api_base.clone()))
    }
}

#[async_trait]
impl super::GenerativeApi for GeminiClient
{   async fn list_models(&self)
      -> Result<Vec<String>, crate::error::Error>
    {   debug!("Listing Gemini models");

        let response = self.http_client
          .get(format!("{}/models", self.api_base))
          .query(&[("key", self.api_key.as_str())])
          .send()
          .await
          .map_err(|e| {
            error!("Failed to fetch models: {}", e);
            crate::error::Error::from(e)
          })?;

        let status = response.status();
        trace!("ListModels response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_| "Unknown error".to_string());
            error!("ListModels failed: {} {}", status, error_text);
            return Err(crate::error::Error::UpstreamListing
            {   status: status.as_u16()
              , message: error_text
            });
        }

        let listing: ListModelsResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            crate::error::Error::Parse(e.to_string())
          })?;

        let names = listing.names();
        debug!("Retrieved {} models", names.len());
        Ok(names)
    }

    async fn generate(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<InvocationResult, crate::error::Error>
    {   debug!("Invoking {}", model);
        trace!("Gemini request for {}: {:?}", model, request);

        let response = self.http_client
          .post(format!("{}/{}:generateContent", self.api_base, model))
          .query(&[("key", self.api_key.as_str())])
          .json(request)
          .send()
          .await
          .map_err(crate::error::Error::from)?;

        let status = response.status();
        trace!("Gemini response status for {}: {}", model, status);

        if !status.is_success()
        {   let body = response.text().await.unwrap_or_default();
            return Err(crate::error::Error::UpstreamInvocation
            {   model: model.to_string()
              , message: error_message(&body)
            });
        }

        let raw: Value = response.json().await.map_err(|e| {
          crate::error::Error::Parse(format!("[{}] {}", model, e))
        })?;

        Ok(extract_result(raw))
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;

    #[test]
    fn error_message_prefers_nested_message()
    {   let body = r#"{"error":{"code":404,"message":"models/x is not found"}}"#;
        assert_eq!(error_message(body), "models/x is not found");
    }

    #[test]
    fn error_message_falls_back_to_json_then_text()
    {   assert_eq!(error_message(r#"{"status":"bad"}"#), r#"{"status":"bad"}"#);
        assert_eq!(error_message("gateway down"), "gateway down");
        assert_eq!(error_message(""), "Unknown error");
    }

    #[test]
    fn request_serializes_camel_case()
    {   let request = GenerateContentRequest::new(
          "sys"
        , "hello"
        , GenerationConfig::default()
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["role"], "system");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 200);
    }

    #[test]
    fn listing_names_use_name_then_model()
    {   let listing: ListModelsResponse = serde_json::from_value(json!({
          "models": [
            { "name": "models/gemini-2.5-flash" },
            { "model": "models/gemini-pro" },
            { "displayName": "nameless" }
          ]
        })).unwrap();
        assert_eq!(
          listing.names()
        , vec!["models/gemini-2.5-flash", "models/gemini-pro"]
        );
    }
}
