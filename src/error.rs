use thiserror::Error;

/// Custom error type for insight operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error
{   /// Neither a prompt nor a numeric reading was supplied
    #[error("Temperature or prompt required.")]
    MissingInput
  , /// Process configuration is unusable (e.g. no API key)
    #[error("{0}")]
    Configuration(String)
  , /// Model listing endpoint answered with a non-success status
    #[error("ListModels failed: {status} {message}")]
    UpstreamListing
    {   status: u16
      , message: String
    }
  , /// Generation endpoint answered with a non-success status
    #[error("[{model}] {message}")]
    UpstreamInvocation
    {   model: String
      , message: String
    }
  , /// Listing succeeded but nothing matched the selection rule
    #[error("No usable Gemini model found. ListModels returned {0}")]
    NoUsableModel(String)
  , /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String)
  , /// Failed to parse an upstream response
    #[error("Parse error: {0}")]
    Parse(String)
  , /// Upstream call exceeded the per-attempt timeout
    #[error("Request timed out")]
    Timeout
  , /// Caller went away while the upstream call was in flight
    #[error("Request cancelled")]
    Cancelled
  , /// Generic error
    #[error("{0}")]
    Other(String)
}

impl Error
{   /// Transport-level failures are recovered by trying the next candidate.
    pub fn is_transport(&self) -> bool
    {   matches!(
          self
        , Error::UpstreamListing { .. }
          | Error::UpstreamInvocation { .. }
          | Error::NoUsableModel(_)
          | Error::Http(_)
          | Error::Parse(_)
          | Error::Timeout
          | Error::Cancelled
        )
    }
}

impl From<reqwest::Error> for Error
{   fn from(e: reqwest::Error) -> Self
    {   if e.is_timeout()
        {   Error::Timeout
        } else if e.is_decode()
        {   Error::Parse(e.to_string())
        } else
        {   Error::Http(e.to_string())
        }
    }
}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
