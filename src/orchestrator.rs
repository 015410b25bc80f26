//! Response resolution: remote models in priority order, then local text

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::{GenerationConfig, InsightConfig};
use crate::error::Error;
use crate::failover::{CandidateList, FALLBACK_MODEL};
use crate::providers::{GenerateContentRequest, GenerativeApi, InvocationResult};
use crate::request::{GenerationRequest, Outcome};
use crate::resolver::ModelResolver;

const NO_RESPONSE: &str = "No response from AI";

/// What the attempts so far have left behind
#[derive(Debug, Default)]
struct AttemptTrail
{   /// Last attempt that answered but produced no text
    last_result: Option<(String, InvocationResult)>
  , last_error: Option<Error>
  , tried: Vec<String>
}

impl AttemptTrail
{   fn last_finish_reason(&self) -> Option<&str>
    {   self.last_result
          .as_ref()
          .and_then(|(_, r)| r.finish_reason.as_deref())
    }

    /// Diagnostic for the caller when nothing produced text
    fn message(&self) -> String
    {   match &self.last_result
        {   Some((_, attempt)) => {
              let segments: Vec<String> = [
                attempt.block_reason
                  .as_ref()
                  .map(|r| format!("blocked ({})", r))
              , attempt.finish_reason
                  .as_ref()
                  .map(|r| format!("finishReason: {}", r))
              , attempt.safety_summary
                  .as_ref()
                  .map(|s| format!("safety: {}", s))
              ]
              .into_iter()
              .flatten()
              .collect();

              if segments.is_empty()
              {   NO_RESPONSE.to_string()
              } else
              {   format!(
                    "No text returned by Gemini: {}"
                  , segments.join("; ")
                  )
              }
            }
          , None => self.last_error
              .as_ref()
              .map(Error::to_string)
              .unwrap_or_else(|| NO_RESPONSE.to_string())
        }
    }
}

/// Drives the attempt pipeline for one request at a time
pub struct ResponseOrchestrator
{   api: Arc<dyn GenerativeApi>
  , resolver: Arc<ModelResolver>
  , configured_model: Option<String>
  , generation: GenerationConfig
  , attempt_timeout: Duration
  , max_discovered_attempts: usize
}

impl ResponseOrchestrator
{   pub fn new(
      api: Arc<dyn GenerativeApi>
    , resolver: Arc<ModelResolver>
    , config: &InsightConfig
    ) -> Self
    {   ResponseOrchestrator
        {   api
          , resolver
          , configured_model: config.model
              .as_ref()
              .map(|m| m.trim().to_string())
              .filter(|m| !m.is_empty())
          , generation: config.generation
          , attempt_timeout: config.request_timeout()
          , max_discovered_attempts: config.failover.max_discovered_attempts
        }
    }

    /// Resolve one request into an outcome
    ///
    /// Only `MissingInput` is returned as an error; every upstream failure is
    /// folded into the outcome.
    pub async fn handle(
      &self
    , request: &GenerationRequest
    , cancel: &CancellationToken
    ) -> Result<Outcome, Error>
    {   let prompt = crate::request::build_prompt(request)?;
        debug!(
          "Handling insight request (reading: {:?}, prompt chars: {})"
        , prompt.reading
        , prompt.text.chars().count()
        );

        let body = GenerateContentRequest::new(
          crate::request::system_instruction()
        , prompt.text
        , self.generation
        );

        let mut trail = AttemptTrail::default();
        let primary = CandidateList::primary(
          self.first_candidate(&mut trail, cancel).await
        );
        let first = primary.first().unwrap_or(FALLBACK_MODEL).to_string();

        if let Some((model, text)) = self
          .try_candidates(&primary, &body, cancel, &mut trail)
          .await
        {   if model != first
            {   info!("Fallback model {} produced the response", model);
            }
            let used_alternate_model = model != first;
            return Ok(Outcome::Success { text, model, used_alternate_model });
        }

        if let Some(reading) = prompt.reading
        {   warn!(
              "No text after trying {:?}, using local fallback: {}"
            , trail.tried
            , trail.message()
            );
            return Ok(Outcome::LocalFallback
            {   text: crate::fallback::compose(
                  reading
                , trail.last_finish_reason()
                )
            });
        }

        error!(
          "No usable response and no reading provided: {}"
        , trail.message()
        );
        Ok(self.retry_discovered(&body, cancel, &mut trail).await)
    }

    /// Configured model, or the resolver's pick when none is configured
    async fn first_candidate(
      &self
    , trail: &mut AttemptTrail
    , cancel: &CancellationToken
    ) -> String
    {   if let Some(raw) = &self.configured_model
        {   return crate::failover::configured_or_default(raw);
        }

        let resolved = self
          .guarded(cancel, self.resolver.resolve(self.api.as_ref()))
          .await;
        match resolved
        {   Ok(model) => model
          , Err(e) => {
              warn!(
                "Model resolution failed, using {}: {}"
              , FALLBACK_MODEL, e
              );
              trail.last_error = Some(e);
              FALLBACK_MODEL.to_string()
            }
        }
    }

    /// Invoke each candidate in order; first non-empty text wins
    async fn try_candidates(
      &self
    , candidates: &CandidateList
    , body: &GenerateContentRequest
    , cancel: &CancellationToken
    , trail: &mut AttemptTrail
    ) -> Option<(String, String)>
    {   for model in candidates.iter()
        {   trail.tried.push(model.to_string());
            match self.guarded(cancel, self.api.generate(model, body)).await
            {   Ok(result) if result.has_text() => {
                  return Some((model.to_string(), result.text));
                }
              , Ok(result) => {
                  warn!(
                    "Gemini model {} returned no text: finishReason={:?} \
                     blockReason={:?} safety={:?} usage={:?} responseId={:?}"
                  , model
                  , result.finish_reason
                  , result.block_reason
                  , result.safety_summary
                  , result.usage_metadata()
                  , result.response_id()
                  );
                  trail.last_result = Some((model.to_string(), result));
                }
              , Err(e) => {
                  if e.is_transport()
                  {   warn!("Gemini call failed for model {}: {}", model, e);
                  } else
                  {   error!("Gemini call failed for model {}: {}", model, e);
                  }
                  trail.last_error = Some(e);
                }
            }
        }
        None
    }

    /// Free-prompt path: list models and try a few not yet attempted
    async fn retry_discovered(
      &self
    , body: &GenerateContentRequest
    , cancel: &CancellationToken
    , trail: &mut AttemptTrail
    ) -> Outcome
    {   let listed = match self
          .guarded(cancel, self.api.list_models())
          .await
        {   Ok(names) => names
          , Err(e) => {
              warn!("ListModels call failed: {}", e);
              return Outcome::Error
              {   message: trail.message()
                , available_models: None
              };
            }
        };

        let discovered = CandidateList::discovered(
          &listed
        , &trail.tried
        , self.max_discovered_attempts
        );

        if discovered.is_empty()
        {   debug!("ListModels offered nothing new to try");
        } else if let Some((model, text)) = self
          .try_candidates(&discovered, body, cancel, trail)
          .await
        {   info!("ListModels retry succeeded with {}", model);
            return Outcome::Success
            {   text
              , model
              , used_alternate_model: true
            };
        }

        Outcome::Error
        {   message: trail.message()
          , available_models: Some(listed)
        }
    }

    /// Bound an upstream call by the attempt timeout and the caller's token
    async fn guarded<T, F>(
      &self
    , cancel: &CancellationToken
    , call: F
    ) -> Result<T, Error>
    where F: std::future::Future<Output = Result<T, Error>>
    {   if cancel.is_cancelled()
        {   return Err(Error::Cancelled);
        }
        tokio::select!
        {   _ = cancel.cancelled() => Err(Error::Cancelled)
          , outcome = tokio::time::timeout(self.attempt_timeout, call) => {
              outcome.unwrap_or(Err(Error::Timeout))
            }
        }
    }
}
