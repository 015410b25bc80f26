//! Configuration for the insight service and its upstream calls

use std::fmt;
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Generation parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig
{   /// Sampling temperature (creativity weight)
    pub temperature: f32
  , /// Maximum tokens the model may generate
    pub max_output_tokens: u32
}

impl Default for GenerationConfig
{   fn default() -> Self
    {   GenerationConfig
        {   temperature: 0.7
          , max_output_tokens: 200
        }
    }
}

/// Failover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig
{   /// Extra models tried after a listing call on the free-prompt path
    pub max_discovered_attempts: usize
}

impl Default for FailoverConfig
{   fn default() -> Self
    {   FailoverConfig
        {   max_discovered_attempts: 3
        }
    }
}

/// Service configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig
{   /// Gemini API key, passed as the `key` query parameter
    pub api_key: Option<String>
  , /// Raw configured model name, validated later
    pub model: Option<String>
  , /// API base URL
    pub api_base: String
  , /// Address the HTTP server binds to
    pub bind: String
  , /// Per-attempt upstream timeout in seconds
    pub request_timeout_secs: u64
  , /// How long a resolved model stays cached
    pub model_cache_ttl_secs: u64
  , pub generation: GenerationConfig
  , pub failover: FailoverConfig
}

impl Default for InsightConfig
{   fn default() -> Self
    {   InsightConfig
        {   api_key: None
          , model: None
          , api_base: DEFAULT_API_BASE.to_string()
          , bind: DEFAULT_BIND.to_string()
          , request_timeout_secs: 30
          , model_cache_ttl_secs: 60 * 60
          , generation: GenerationConfig::default()
          , failover: FailoverConfig::default()
        }
    }
}

// The key never shows up in logs.
impl fmt::Debug for InsightConfig
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("InsightConfig")
          .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
          .field("model", &self.model)
          .field("api_base", &self.api_base)
          .field("bind", &self.bind)
          .field("request_timeout_secs", &self.request_timeout_secs)
          .field("model_cache_ttl_secs", &self.model_cache_ttl_secs)
          .field("generation", &self.generation)
          .field("failover", &self.failover)
          .finish()
    }
}

impl InsightConfig
{   /// Load from `TIMS_CONFIG` (if set) and overlay the environment
    pub fn load() -> Result<Self, crate::error::Error>
    {   let base = match std::env::var("TIMS_CONFIG")
        {   Ok(path) if !path.trim().is_empty() => {
              Self::from_file(Path::new(path.trim()))?
            }
          , _ => InsightConfig::default()
        };
        Ok(base.with_env(|name| std::env::var(name).ok()))
    }

    /// Read a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, crate::error::Error>
    {   debug!("Loading config from {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|e| {
          crate::error::Error::Configuration(
            format!("Failed to read {}: {}", path.display(), e)
          )
        })?;
        serde_json::from_str(&raw).map_err(|e| {
          crate::error::Error::Configuration(
            format!("Invalid config {}: {}", path.display(), e)
          )
        })
    }

    /// Overlay variables looked up through `var` onto this config
    pub fn with_env<F>(mut self, var: F) -> Self
    where F: Fn(&str) -> Option<String>
    {   let non_blank = |name: &str| {
          var(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        };

        if let Some(key) = non_blank("GEMINI_API_KEY")
          .or_else(|| non_blank("gemini_api_key"))
        {   self.api_key = Some(key);
        }
        if let Some(model) = non_blank("GEMINI_MODEL")
        {   self.model = Some(model);
        }
        if let Some(base) = non_blank("GEMINI_API_BASE")
        {   self.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(bind) = non_blank("TIMS_BIND")
        {   self.bind = bind;
        }
        if let Some(secs) = non_blank("TIMS_REQUEST_TIMEOUT_SECS")
        {   match secs.parse()
            {   Ok(v) => self.request_timeout_secs = v
              , Err(_) => warn!(
                  "Ignoring TIMS_REQUEST_TIMEOUT_SECS={:?}", secs
                )
            }
        }
        if let Some(secs) = non_blank("TIMS_MODEL_CACHE_TTL_SECS")
        {   match secs.parse()
            {   Ok(v) => self.model_cache_ttl_secs = v
              , Err(_) => warn!(
                  "Ignoring TIMS_MODEL_CACHE_TTL_SECS={:?}", secs
                )
            }
        }
        self
    }

    /// The credential, or a configuration error when absent
    pub fn require_api_key(&self) -> Result<&str, crate::error::Error>
    {   self.api_key
          .as_deref()
          .filter(|k| !k.trim().is_empty())
          .ok_or_else(|| {
            crate::error::Error::Configuration(
              "API key not configured".to_string()
            )
          })
    }

    pub fn request_timeout(&self) -> Duration
    {   Duration::from_secs(self.request_timeout_secs)
    }

    pub fn model_cache_ttl(&self) -> Duration
    {   Duration::from_secs(self.model_cache_ttl_secs)
    }
}
