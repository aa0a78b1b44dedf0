//! The view client: one service object owning transport, correlator and state.
//!
//! Architecture:
//! ```text
//! host ↔ Transport → Correlator ─dispatch→ StateStore → projection watchers
//!              ↑          ↑
//!              └── issue ─┴── Actions (UI code)
//! ```
//! Everything runs on the client's own loop turn, so the pending table and
//! both states are only ever touched from one place.

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    actions::{Actions, QueuedAction},
    config::ClientConfig,
    correlator::{Correlator, ResponseHandle},
    error::{Result, RpcError},
    protocol::ViewRequest,
    store::{Projection, StateStore},
    transport::Transport,
};

/// Why the client loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown token was cancelled.
    Shutdown,
    /// The host closed the channel.
    ChannelClosed,
}

impl StopReason {
    /// A requested shutdown is a clean exit; losing the host is an error.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Shutdown => Ok(()),
            Self::ChannelClosed => Err(RpcError::ChannelClosed.into()),
        }
    }
}

pub struct ViewClient {
    transport: Transport,
    correlator: Correlator<StateStore>,
    store: StateStore,
    actions_tx: mpsc::UnboundedSender<QueuedAction>,
    actions_rx: mpsc::UnboundedReceiver<QueuedAction>,
    shutdown: CancellationToken,
}

impl ViewClient {
    /// Create the client with both state handlers registered.
    pub fn new(transport: Transport) -> Self {
        let mut correlator = Correlator::new(transport.namespace(), transport.outbox());
        StateStore::register_handlers(&mut correlator);
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();

        Self {
            transport,
            correlator,
            store: StateStore::new(),
            actions_tx,
            actions_rx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Connect to the host socket named in `config`.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let transport = Transport::connect_unix(config.namespace.clone(), &config.socket_path).await?;
        Ok(Self::new(transport))
    }

    /// Watch the projected event list.
    pub fn subscribe(&self) -> watch::Receiver<Projection> {
        self.store.subscribe()
    }

    /// Facade for UI code.
    pub fn actions(&self) -> Actions {
        Actions::new(self.actions_tx.clone())
    }

    /// Token that tears the client down when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Issue a request directly from the loop's owner.
    pub fn request(&mut self, request: &ViewRequest) -> ResponseHandle {
        self.correlator.issue_request(request)
    }

    /// Pull both states from the host.
    pub fn request_state_update(&mut self) -> (ResponseHandle, ResponseHandle) {
        (
            self.request(&ViewRequest::InteractionState),
            self.request(&ViewRequest::DocumentState),
        )
    }

    fn issue_queued(&mut self, queued: QueuedAction) {
        self.correlator
            .issue_request_with(&queued.request, queued.continuation);
    }

    /// Run until shutdown or until the host closes the channel.
    ///
    /// Pulls both states first, then serves pushes and queued actions. On exit
    /// the client is torn down: see [`ViewClient::teardown`].
    pub async fn run(mut self) -> StopReason {
        let _initial = self.request_state_update();
        let shutdown = self.shutdown.clone();

        let reason = loop {
            tokio::select! {
                () = shutdown.cancelled() => break StopReason::Shutdown,
                inbound = self.transport.recv() => {
                    let Some(envelope) = inbound else {
                        break StopReason::ChannelClosed;
                    };
                    self.correlator.dispatch(&mut self.store, envelope);
                }
                Some(queued) = self.actions_rx.recv() => {
                    self.issue_queued(queued);
                }
                Some(()) = self.correlator.flush_deferred() => {}
            }
        };

        tracing::info!("View client stopping: {reason:?}");
        self.teardown();
        reason
    }

    /// Deregister from the channel and abandon every pending request.
    ///
    /// Waiting handles resolve to [`RpcError::Abandoned`]; the host is not notified.
    pub fn teardown(mut self) {
        self.transport.close();
        self.correlator.abandon_all();
        self.actions_rx.close();
        while let Ok(queued) = self.actions_rx.try_recv() {
            tracing::debug!("{}: {}", RpcError::Abandoned, queued.request.kind());
        }
    }
}
