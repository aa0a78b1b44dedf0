//! Typed outbound requests for UI code.

use tokio::sync::{mpsc, oneshot};

use crate::{
    correlator::ResponseHandle,
    path::Path,
    projection::ProjectedEvent,
    protocol::{Envelope, Granularity, NewEventParams, ViewRequest},
    state::DateRangeIso,
};

/// A request queued for the client loop, with the continuation to resolve.
#[derive(Debug)]
pub struct QueuedAction {
    pub request: ViewRequest,
    pub continuation: oneshot::Sender<Envelope>,
}

/// Cloneable handle for issuing view requests from any task.
///
/// Every call returns at once; the request goes out on the client's next turn.
#[derive(Debug, Clone)]
pub struct Actions {
    tx: mpsc::UnboundedSender<QueuedAction>,
}

impl Actions {
    pub const fn new(tx: mpsc::UnboundedSender<QueuedAction>) -> Self {
        Self { tx }
    }

    /// Queue any view request.
    pub fn request(&self, request: ViewRequest) -> ResponseHandle {
        let (continuation, rx) = oneshot::channel();
        let kind = request.kind();
        if self.tx.send(QueuedAction { request, continuation }).is_err() {
            tracing::debug!("Client stopped, {kind} request abandoned");
        }
        // The id is assigned by the client loop when the request is issued.
        ResponseHandle::new(String::new(), rx)
    }

    pub fn set_hovering_path(&self, path: Option<Path>) -> ResponseHandle {
        self.request(ViewRequest::SetHoveringPath(path))
    }

    pub fn set_detail_path(&self, path: Option<Path>) -> ResponseHandle {
        self.request(ViewRequest::SetDetailPath(path))
    }

    /// Ask the host to reveal the node in the originating document.
    pub fn show_in_editor(&self, path: Option<Path>) -> ResponseHandle {
        self.request(ViewRequest::ShowInEditor(path))
    }

    /// Ask the host to create an event covering `range`.
    pub fn new_event(
        &self,
        range: DateRangeIso,
        granularity: Option<Granularity>,
        immediate: bool,
    ) -> ResponseHandle {
        self.request(ViewRequest::NewEvent(NewEventParams {
            date_range_iso: range,
            granularity,
            immediate,
        }))
    }

    /// Pointer entered a rendered event.
    ///
    /// The event id is parsed back into its path; an id that does not parse
    /// hovers nothing.
    pub fn hover(&self, event: &ProjectedEvent) -> ResponseHandle {
        self.set_hovering_path(event.path())
    }

    /// Pointer left the rendered events.
    pub fn leave(&self) -> ResponseHandle {
        self.set_hovering_path(None)
    }

    /// A rendered event was clicked: show its detail, then reveal it in the editor.
    pub fn open(&self, event: &ProjectedEvent) -> (ResponseHandle, ResponseHandle) {
        self.open_path(event.path())
    }

    /// Detail then reveal for a path, in that order.
    pub fn open_path(&self, path: Option<Path>) -> (ResponseHandle, ResponseHandle) {
        (self.set_detail_path(path.clone()), self.show_in_editor(path))
    }

    /// A date range was selected on the calendar. The host decides granularity
    /// and asks before creating anything.
    pub fn select(&self, range: DateRangeIso) -> ResponseHandle {
        self.new_event(range, None, false)
    }

    /// Pull both states; the host answers each pull with a push.
    pub fn request_state_update(&self) -> (ResponseHandle, ResponseHandle) {
        (
            self.request(ViewRequest::InteractionState),
            self.request(ViewRequest::DocumentState),
        )
    }
}
