//! Model resolution against the listing endpoint, with a TTL cache

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use log::{debug, info};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

use crate::providers::GenerativeApi;

static PREFERRED: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)gemini-2\.5.*flash").expect("valid regex")
});
static ANY_FLASH: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)gemini.*flash").expect("valid regex")
});
static FAMILY: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)gemini-").expect("valid regex")
});

/// Source of wall-clock time
pub trait Clock: Send + Sync
{   fn now(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock
{   fn now(&self) -> SystemTime
    {   SystemTime::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock
{   now: Mutex<SystemTime>
}

impl ManualClock
{   pub fn new(start: SystemTime) -> Self
    {   ManualClock { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration)
    {   let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock
{   fn default() -> Self
    {   ManualClock::new(SystemTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock
{   fn now(&self) -> SystemTime
    {   *self.now.lock()
    }
}

/// Last resolved model and when it stops being valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel
{   pub model_id: String
  , pub expires_at: SystemTime
}

/// Process-wide slot for the resolved model
#[derive(Debug, Default)]
pub struct ModelCache
{   slot: Mutex<Option<ResolvedModel>>
}

impl ModelCache
{   pub fn new() -> Self
    {   ModelCache::default()
    }

    /// Cached id if it has not expired at `now`
    pub fn get(&self, now: SystemTime) -> Option<String>
    {   self.slot
          .lock()
          .as_ref()
          .filter(|entry| now < entry.expires_at)
          .map(|entry| entry.model_id.clone())
    }

    pub fn put(&self, model_id: String, expires_at: SystemTime)
    {   *self.slot.lock() = Some(ResolvedModel { model_id, expires_at });
    }

    pub fn snapshot(&self) -> Option<ResolvedModel>
    {   self.slot.lock().clone()
    }
}

/// Pick a model name: 2.5 flash, then any flash, then any gemini
pub fn pick_candidate_model(names: &[String]) -> Option<&str>
{   [&*PREFERRED, &*ANY_FLASH, &*FAMILY]
      .into_iter()
      .find_map(|re| names.iter().find(|n| re.is_match(n)))
      .map(String::as_str)
}

/// Resolves a usable model id and caches it for `ttl`
pub struct ModelResolver
{   cache: Arc<ModelCache>
  , clock: Arc<dyn Clock>
  , ttl: Duration
}

impl ModelResolver
{   pub fn new(
      cache: Arc<ModelCache>
    , clock: Arc<dyn Clock>
    , ttl: Duration
    ) -> Self
    {   ModelResolver { cache, clock, ttl }
    }

    pub fn cache(&self) -> &Arc<ModelCache>
    {   &self.cache
    }

    /// Cached model if still valid, else list and pick
    ///
    /// Concurrent misses may both list and both write; the written values
    /// are equivalent.
    pub async fn resolve(
      &self
    , api: &dyn GenerativeApi
    ) -> Result<String, crate::error::Error>
    {   if let Some(model) = self.cache.get(self.clock.now())
        {   debug!("Using cached model {}", model);
            return Ok(model);
        }

        let names = api.list_models().await?;
        let chosen = pick_candidate_model(&names)
          .map(crate::failover::with_models_prefix)
          .ok_or_else(|| {
            crate::error::Error::NoUsableModel(
              serde_json::to_string(&names)
                .unwrap_or_else(|_| format!("{:?}", names))
            )
          })?;

        info!("Resolved model {} from {} listed", chosen, names.len());
        self.cache.put(chosen.clone(), self.clock.now() + self.ttl);
        Ok(chosen)
    }
}
