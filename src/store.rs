//! Holds the current interaction and document state and the projection derived
//! from them.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    correlator::{Correlator, Reply},
    error::RpcError,
    projection::{project, ProjectedEvent},
    protocol::{DOCUMENT_STATE, INTERACTION_STATE, LEGACY_DOCUMENT_STATE, LEGACY_INTERACTION_STATE},
    state::{DocumentState, InteractionState},
};

/// A full projection snapshot. Each recompute publishes a new one.
pub type Projection = Arc<Vec<ProjectedEvent>>;

/// Current state snapshots plus the projection derived from them.
pub struct StateStore {
    interaction: Arc<InteractionState>,
    document: Arc<DocumentState>,
    projection: watch::Sender<Projection>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (projection, _) = watch::channel(Projection::default());
        Self {
            interaction: Arc::default(),
            document: Arc::default(),
            projection,
        }
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn document(&self) -> &DocumentState {
        &self.document
    }

    /// Latest projection.
    pub fn events(&self) -> Projection {
        self.projection.borrow().clone()
    }

    /// Watch the projection; the receiver sees every recompute.
    pub fn subscribe(&self) -> watch::Receiver<Projection> {
        self.projection.subscribe()
    }

    /// Replace the interaction state and recompute against the installed document.
    pub fn apply_interaction_push(&mut self, state: InteractionState) {
        self.interaction = Arc::new(state);
        self.recompute();
    }

    /// Replace the document state and recompute against the installed interaction state.
    pub fn apply_document_push(&mut self, state: DocumentState) {
        self.document = Arc::new(state);
        self.recompute();
    }

    fn recompute(&self) {
        let events = project(self.document.transformed_tree.as_ref(), &self.interaction);
        tracing::debug!("Projected {} event(s)", events.len());
        self.projection.send_replace(Arc::new(events));
    }

    /// Register push handlers for both state kinds, under current and legacy names.
    pub fn register_handlers(correlator: &mut Correlator<Self>) {
        for kind in [INTERACTION_STATE, LEGACY_INTERACTION_STATE] {
            correlator.on(kind, |store: &mut Self, params| {
                if let Some(state) = decode_push::<InteractionState>(INTERACTION_STATE, params) {
                    store.apply_interaction_push(state);
                }
                Reply::empty()
            });
        }
        for kind in [DOCUMENT_STATE, LEGACY_DOCUMENT_STATE] {
            correlator.on(kind, |store: &mut Self, params| {
                if let Some(state) = decode_push::<DocumentState>(DOCUMENT_STATE, params) {
                    store.apply_document_push(state);
                }
                Reply::empty()
            });
        }
    }
}

/// Decode a pushed state. A push without params installs the empty state.
///
/// Only payloads that are not objects are rejected; bad field values fall back
/// to defaults inside the state types.
fn decode_push<T: DeserializeOwned + Default>(kind: &str, params: Option<Value>) -> Option<T> {
    let Some(params) = params else {
        return Some(T::default());
    };
    match serde_json::from_value(params) {
        Ok(state) => Some(state),
        Err(e) => {
            let error = RpcError::MalformedPayload {
                kind: kind.to_string(),
                reason: e.to_string(),
            };
            tracing::warn!("{error}, keeping previous state");
            None
        }
    }
}
