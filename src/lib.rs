//! Calendar view client for markwhen.
//!
//! The view talks to its host over a namespaced request/response protocol and
//! keeps a flat list of calendar events projected from the host's document tree.

pub mod actions;
pub mod client;
pub mod config;
pub mod console;
pub mod correlator;
pub mod error;
pub mod path;
pub mod projection;
pub mod protocol;
pub mod state;
pub mod store;
pub mod transport;

pub use actions::Actions;
pub use client::{StopReason, ViewClient};
pub use config::ClientConfig;
pub use correlator::{Correlator, Dispatch, Reply, ResponseHandle};
pub use error::{Error, Result, RpcError};
pub use path::{equivalent, Path, PathKind};
pub use projection::{project, ProjectedEvent};
pub use protocol::{Envelope, Granularity, NewEventParams, ViewRequest};
pub use state::{ColorMap, DateRangeIso, DocumentNode, DocumentState, EventNode, InteractionState, Rgb};
pub use store::{Projection, StateStore};
pub use transport::{Outbox, Transport};
