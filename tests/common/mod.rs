#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use tims_insight::config::InsightConfig;
use tims_insight::error::Error;
use tims_insight::providers::{
  extract_result, GenerateContentRequest, GenerativeApi, InvocationResult,
};
use tims_insight::resolver::{ManualClock, ModelCache, ModelResolver};
use tims_insight::ResponseOrchestrator;

pub const CONFIGURED: &str = "models/gemini-2.0-pro";

/// A candidate holding one text part
pub fn text_reply(text: &str) -> Value
{   json!({
      "candidates": [{
        "content": { "role": "model", "parts": [{ "text": text }] },
        "finishReason": "STOP"
      }],
      "responseId": "resp-1"
    })
}

/// A candidate with no parts at all
pub fn empty_reply(finish_reason: &str) -> Value
{   json!({
      "candidates": [{
        "content": { "role": "model", "parts": [] },
        "finishReason": finish_reason
      }]
    })
}

/// No candidates, prompt blocked
pub fn blocked_reply(block_reason: &str) -> Value
{   json!({
      "promptFeedback": {
        "blockReason": block_reason,
        "safetyRatings": [{
          "category": "HARM_CATEGORY_DANGEROUS_CONTENT",
          "probability": "HIGH"
        }]
      }
    })
}

/// In-memory upstream with canned replies per model
#[derive(Default)]
pub struct ScriptedApi
{   replies: Mutex<HashMap<String, Result<Value, Error>>>
  , hanging: Mutex<HashSet<String>>
  , listing: Mutex<Option<Result<Vec<String>, Error>>>
  , generate_calls: Mutex<Vec<String>>
  , requests: Mutex<Vec<GenerateContentRequest>>
  , list_calls: AtomicUsize
}

impl ScriptedApi
{   pub fn new() -> Self
    {   ScriptedApi::default()
    }

    pub fn reply(self, model: &str, raw: Value) -> Self
    {   self.replies.lock().insert(model.to_string(), Ok(raw));
        self
    }

    pub fn fail(self, model: &str, message: &str) -> Self
    {   self.replies.lock().insert(
          model.to_string()
        , Err(Error::UpstreamInvocation
          {   model: model.to_string()
            , message: message.to_string()
          })
        );
        self
    }

    pub fn hang(self, model: &str) -> Self
    {   self.hanging.lock().insert(model.to_string());
        self
    }

    pub fn listing(self, names: &[&str]) -> Self
    {   *self.listing.lock()
          = Some(Ok(names.iter().map(|n| n.to_string()).collect()));
        self
    }

    pub fn listing_error(self, status: u16) -> Self
    {   *self.listing.lock() = Some(Err(Error::UpstreamListing
        {   status
          , message: "listing unavailable".to_string()
        }));
        self
    }

    pub fn generated(&self) -> Vec<String>
    {   self.generate_calls.lock().clone()
    }

    pub fn requests(&self) -> Vec<GenerateContentRequest>
    {   self.requests.lock().clone()
    }

    pub fn listed(&self) -> usize
    {   self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeApi for ScriptedApi
{   async fn list_models(&self)
      -> Result<Vec<String>, Error>
    {   self.list_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.listing.lock().clone();
        scripted.unwrap_or_else(|| {
          Err(Error::UpstreamListing
          {   status: 404
            , message: "no listing scripted".to_string()
          })
        })
    }

    async fn generate(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<InvocationResult, Error>
    {   self.generate_calls.lock().push(model.to_string());
        self.requests.lock().push(request.clone());

        let hangs = self.hanging.lock().contains(model);
        if hangs
        {   std::future::pending::<()>().await;
        }

        let scripted = self.replies.lock().get(model).cloned();
        match scripted
        {   Some(Ok(raw)) => Ok(extract_result(raw))
          , Some(Err(e)) => Err(e)
          , None => Err(Error::UpstreamInvocation
            {   model: model.to_string()
              , message: "model not found".to_string()
            })
        }
    }
}

pub fn config(model: Option<&str>) -> InsightConfig
{   InsightConfig
    {   api_key: Some("test-key".to_string())
      , model: model.map(str::to_string)
      , request_timeout_secs: 5
      , ..InsightConfig::default()
    }
}

pub fn resolver() -> Arc<ModelResolver>
{   Arc::new(ModelResolver::new(
      Arc::new(ModelCache::new())
    , Arc::new(ManualClock::default())
    , std::time::Duration::from_secs(3600)
    ))
}

pub fn orchestrator_with(
  api: Arc<ScriptedApi>
, config: &InsightConfig
) -> ResponseOrchestrator
{   ResponseOrchestrator::new(api, resolver(), config)
}

pub fn orchestrator(
  api: Arc<ScriptedApi>
, model: Option<&str>
) -> ResponseOrchestrator
{   orchestrator_with(api, &config(model))
}
