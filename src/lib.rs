pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod failover;
pub mod fallback;
pub mod resolver;
pub mod orchestrator;
pub mod client;
pub mod server;

pub use client::InsightBackend;
pub use config::InsightConfig;
pub use error::Error;
pub use orchestrator::ResponseOrchestrator;
pub use request::{GenerationRequest, Outcome};

/*

tims-insight turns a room temperature reading (or a free prompt) into a
short explanation. Gemini models are tried in priority order; when none
answers with text and a reading is known, the answer is composed locally.

tims-insight/
├── src/
│   ├── lib.rs           # Backend command types and re-exports
│   ├── error.rs         # Error taxonomy
│   ├── config.rs        # Env / JSON configuration
│   ├── request.rs       # Inbound request, prompts, outcomes
│   ├── providers/
│   │   ├── mod.rs       # GenerativeApi trait
│   │   └── gemini.rs    # Wire types, extraction, REST client
│   ├── resolver.rs      # Model listing + TTL cache
│   ├── failover.rs      # Candidate ordering
│   ├── fallback.rs      # Local text composer
│   ├── orchestrator.rs  # The attempt pipeline
│   ├── client.rs        # Backend task owning request execution
│   ├── server.rs        # axum router for POST /api/chat
│   └── main.rs          # Daemon entrypoint
└── tests/

*/

/// INSIGHT BACKEND INTERFACE:

// ===== HandleRequest =====

pub type HandleReply = Result<Outcome, crate::error::Error>;
pub type HandleReplySender
  = tokio::sync::mpsc::UnboundedSender<HandleReply>;

pub struct HandleRequestArgs
{   pub request: GenerationRequest
  , /// Cancelled when the caller stops waiting
    pub cancel: tokio_util::sync::CancellationToken
  , pub reply: HandleReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== InsightHand (sender side) =====

pub struct InsightHand
{   pub handle_request_tx
      : tokio::sync::mpsc::UnboundedSender<HandleRequestArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== InsightFoot (receiver side) =====

pub struct InsightFoot
{   pub handle_request_rx
      : tokio::sync::mpsc::UnboundedReceiver<HandleRequestArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}
