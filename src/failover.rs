//! Candidate ordering for model fallbacks

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

/// Model tried after the configured one, and the default when none is valid
pub const FALLBACK_MODEL: &str = "models/gemini-2.5-flash";

const MODELS_PREFIX: &str = "models/";

static CONFIGURED_MODEL: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)^(?:models/)?gemini-[\w.-]+$").expect("valid regex")
});

pub fn with_models_prefix(name: &str) -> String
{   if name.starts_with(MODELS_PREFIX)
    {   name.to_string()
    } else
    {   format!("{}{}", MODELS_PREFIX, name)
    }
}

/// Validate a configured model name
///
/// Returns the `models/`-prefixed name, or `None` when the name does not
/// look like a gemini model.
pub fn normalize_configured_model(raw: &str) -> Option<String>
{   let trimmed = raw.trim();
    if CONFIGURED_MODEL.is_match(trimmed)
    {   Some(with_models_prefix(trimmed))
    } else
    {   None
    }
}

/// Configured model if valid, else the fallback model
pub fn configured_or_default(raw: &str) -> String
{   normalize_configured_model(raw).unwrap_or_else(|| {
      warn!(
        "Ignoring malformed model name {:?}, using {}"
      , raw, FALLBACK_MODEL
      );
      FALLBACK_MODEL.to_string()
    })
}

/// Ordered models to try; order is the only ranking signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList
{   pub models: Vec<String>
}

impl CandidateList
{   /// `[first, FALLBACK_MODEL]`, collapsed when they are the same
    pub fn primary(first: String) -> Self
    {   let models = if first == FALLBACK_MODEL
        {   vec![first]
        } else
        {   vec![first, FALLBACK_MODEL.to_string()]
        };
        debug!("Primary candidates: {:?}", models);
        CandidateList { models }
    }

    /// Up to `cap` listed gemini models not yet tried
    pub fn discovered(
      listed: &[String]
    , tried: &[String]
    , cap: usize
    ) -> Self
    {   let models: Vec<String> = listed
          .iter()
          .filter(|n| n.starts_with("models/gemini-"))
          .filter(|n| !tried.contains(n))
          .take(cap)
          .cloned()
          .collect();
        debug!("Discovered candidates: {:?}", models);
        CandidateList { models }
    }

    pub fn first(&self) -> Option<&str>
    {   self.models.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool
    {   self.models.is_empty()
    }

    pub fn len(&self) -> usize
    {   self.models.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str>
    {   self.models.iter().map(String::as_str)
    }
}
