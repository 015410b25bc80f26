//! Inbound request, prompt construction and outcome types

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?")
    .expect("valid regex")
});

/// Model name reported for locally composed answers
pub const LOCAL_MODEL: &str = "local";

/// Inbound insight request: a free prompt and/or a sensor reading
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest
{   /// Free-form prompt, used verbatim when non-blank
    #[serde(default)]
    pub prompt: Option<Value>
  , /// Sensor reading in °C, as a number or numeric string
    #[serde(default)]
    pub temperature: Option<Value>
}

impl GenerationRequest
{   pub fn from_prompt(prompt: impl Into<String>) -> Self
    {   GenerationRequest
        {   prompt: Some(Value::String(prompt.into()))
          , temperature: None
        }
    }

    pub fn from_temperature(temperature: f64) -> Self
    {   GenerationRequest
        {   prompt: None
          , temperature: serde_json::Number::from_f64(temperature)
              .map(Value::Number)
        }
    }

    /// Trimmed prompt, if it is a non-empty string
    pub fn trimmed_prompt(&self) -> Option<&str>
    {   match &self.prompt
        {   Some(Value::String(s)) => {
              let trimmed = s.trim();
              (!trimmed.is_empty()).then_some(trimmed)
            }
          , _ => None
        }
    }

    /// The reading as a finite number, if one was supplied
    pub fn reading(&self) -> Option<f64>
    {   let value = match &self.temperature
        {   Some(Value::Number(n)) => n.as_f64()
          , Some(Value::String(s)) => leading_number(s)
          , _ => None
        };
        value.filter(|v| v.is_finite())
    }
}

/// Longest numeric prefix of a string: `"23.5°C"` reads as `23.5`
fn leading_number(text: &str) -> Option<f64>
{   LEADING_NUMBER
      .find(text.trim_start())
      .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Prompt text resolved from a request plus the reading (if any)
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrompt
{   pub text: String
  , pub reading: Option<f64>
}

/// Turn a request into the final prompt text
///
/// A non-blank prompt wins over the reading; the reading is still carried
/// along so the local fallback stays available.
pub fn build_prompt(
  request: &GenerationRequest
) -> Result<ResolvedPrompt, crate::error::Error>
{   let reading = request.reading();

    let text = match (request.trimmed_prompt(), reading)
    {   (Some(prompt), _) => prompt.to_string()
      , (None, Some(temp)) => reading_prompt(temp)
      , (None, None) => return Err(crate::error::Error::MissingInput)
    };

    Ok(ResolvedPrompt { text, reading })
}

/// Instructional prompt embedding a sensor reading
pub fn reading_prompt(temperature: f64) -> String
{   [ "Anda adalah TIMS AI, asisten yang memantau kondisi ruangan berbasis sensor suhu.".to_string()
    , format!("Data terbaru menunjukkan suhu ruangan {:.1}°C.", temperature)
    , "Tuliskan analisis ringkas dalam Bahasa Indonesia maksimal dua kalimat (<= 60 kata):".to_string()
    , "- jelaskan kondisi kenyamanan ruangan dan kategori suhunya (normal, hangat, panas, atau dingin),".to_string()
    , "- beri saran tindakan sederhana bila diperlukan,".to_string()
    , "- jika suhu berada di bawah 18°C atau di atas 30°C, sertakan peringatan singkat.".to_string()
    , "Jangan menyebut diri sebagai AI dan jangan menambahkan penutup yang tidak perlu.".to_string()
    ].join("\n")
}

/// System instruction sent with every generation request
pub fn system_instruction() -> String
{   [ "Anda adalah TIMS AI yang membantu penghuni memahami kondisi ruangan berbasis suhu."
    , "Selalu jawab dalam Bahasa Indonesia baku, maksimal dua kalimat (<= 60 kata)."
    , "Fokus pada kenyamanan, risiko singkat, dan tindakan praktis. Hindari pengantar atau penutup panjang."
    ].join(" ")
}

/// Result of one pass through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome
{   /// A remote model produced text
    Success
    {   text: String
      , model: String
      , used_alternate_model: bool
    }
  , /// Text composed locally from the reading
    LocalFallback
    {   text: String
    }
  , /// Nothing usable; carries a diagnostic
    Error
    {   message: String
      , available_models: Option<Vec<String>>
    }
}

impl Outcome
{   pub fn text(&self) -> Option<&str>
    {   match self
        {   Outcome::Success { text, .. }
          | Outcome::LocalFallback { text } => Some(text)
          , Outcome::Error { .. } => None
        }
    }
}

/// Successful JSON reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightResponse
{   pub response: String
  , pub fallback: bool
  , pub model: String
  , pub used_alternate_model: bool
}

/// Error JSON reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse
{   pub error: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_models: Option<Vec<String>>
}

impl ErrorResponse
{   pub fn new(error: impl Into<String>) -> Self
    {   ErrorResponse
        {   error: error.into()
          , available_models: None
        }
    }
}

/// Wire shape of any reply the endpoint produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyBody
{   Insight(InsightResponse)
  , Error(ErrorResponse)
}

impl From<Outcome> for ReplyBody
{   fn from(outcome: Outcome) -> Self
    {   match outcome
        {   Outcome::Success { text, model, used_alternate_model } => {
              ReplyBody::Insight(InsightResponse
              {   response: text
                , fallback: false
                , model
                , used_alternate_model
              })
            }
          , Outcome::LocalFallback { text } => {
              ReplyBody::Insight(InsightResponse
              {   response: text
                , fallback: true
                , model: LOCAL_MODEL.to_string()
                , used_alternate_model: false
              })
            }
          , Outcome::Error { message, available_models } => {
              ReplyBody::Error(ErrorResponse
              {   error: message
                , available_models
              })
            }
        }
    }
}
