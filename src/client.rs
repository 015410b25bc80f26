use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::orchestrator::ResponseOrchestrator;
use crate::providers::{GeminiClient, GenerativeApi};
use crate::resolver::{ModelCache, ModelResolver, SystemClock};
use crate::InsightFoot;

/// Public API for the insight backend - owns the task
pub struct InsightBackend
{   hand: crate::InsightHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl InsightBackend
{   /// Create and spawn a backend around an orchestrator
    /// Returns immediately - spawns background task
    pub fn new(orchestrator: Arc<ResponseOrchestrator>) -> Self
    {   debug!("Creating InsightBackend with task ownership");

        let (handle_request_tx, handle_request_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::InsightHand
        {   handle_request_tx
          , kill_process_tx
        };

        let foot = crate::InsightFoot
        {   handle_request_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, orchestrator).await
        });

        InsightBackend
        {   hand
          , _task_handle
        }
    }

    /// Production wiring: Gemini client plus a one-process model cache
    pub fn from_config(
      config: &crate::config::InsightConfig
    ) -> Result<Self, crate::error::Error>
    {   let api: Arc<dyn GenerativeApi>
          = Arc::new(GeminiClient::from_config(config)?);
        let resolver = Arc::new(ModelResolver::new(
          Arc::new(ModelCache::new())
        , Arc::new(SystemClock)
        , config.model_cache_ttl()
        ));
        let orchestrator = Arc::new(
          ResponseOrchestrator::new(api, resolver, config)
        );
        Ok(InsightBackend::new(orchestrator))
    }

    /// Queue a request - returns almost immediately
    pub async fn handle(
      &self
    , request: crate::GenerationRequest
    , cancel: CancellationToken
    ) -> Result<
        mpsc::UnboundedReceiver<crate::HandleReply>,
        crate::error::Error
      >
    {   debug!("handle queuing insight request");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::HandleRequestArgs
        {   request
          , cancel
          , reply: reply_tx
        };

        self.hand.handle_request_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Queue a request and wait for its outcome
    pub async fn handle_and_wait(
      &self
    , request: crate::GenerationRequest
    , cancel: CancellationToken
    ) -> crate::HandleReply
    {   let mut reply_rx = self.handle(request, cancel).await?;
        reply_rx.recv().await.unwrap_or_else(|| {
          error!("Backend dropped the reply");
          Err(crate::error::Error::Other(
            "Backend disconnected".to_string()
          ))
        })
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down InsightBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(crate::error::Error::Timeout)
        }
    }
}

/// Main backend event loop
///
/// Each request runs on its own task so a slow upstream never holds up the
/// next request; the loop itself only routes.
async fn run_backend_loop(
  foot: crate::InsightFoot
, orchestrator: Arc<ResponseOrchestrator>
)
{   debug!("Starting InsightBackend event loop");
    let InsightFoot
    {   mut handle_request_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = handle_request_rx.recv() => {
          debug!("Received HandleRequest");
          let orchestrator = orchestrator.clone();
          tokio::spawn(async move {
            let result = orchestrator
              .handle(&cmd.request, &cmd.cancel)
              .await;
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("InsightBackend shutting down");
          break;
        }
      , else => {
          debug!("Command channels closed");
          break;
        }
      }
    }
}
