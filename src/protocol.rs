//! Wire types shared by the view and its host.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{path::Path, state::DateRangeIso};

/// Push of the full interaction state (host to view), or a pull of it.
pub const INTERACTION_STATE: &str = "interactionState";
/// Push of the full document state (host to view), or a pull of it.
pub const DOCUMENT_STATE: &str = "documentState";
/// Older hosts push interaction state under this name.
pub const LEGACY_INTERACTION_STATE: &str = "appState";
/// Older hosts push document state under this name.
pub const LEGACY_DOCUMENT_STATE: &str = "markwhenState";

pub const SET_HOVERING_PATH: &str = "setHoveringPath";
pub const SET_DETAIL_PATH: &str = "setDetailPath";
pub const SHOW_IN_EDITOR: &str = "showInEditor";
pub const NEW_EVENT: &str = "newEvent";

/// A single message on the channel, request or response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Namespace-prefixed correlation id. Missing ids decode as empty.
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub request: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub response: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(flag: &bool) -> bool {
    !*flag
}

impl Envelope {
    pub fn request(kind: &str, id: String, params: Option<Value>) -> Self {
        Self {
            kind: kind.to_string(),
            id,
            request: true,
            response: false,
            params,
        }
    }

    pub fn response(kind: &str, id: String, params: Option<Value>) -> Self {
        Self {
            kind: kind.to_string(),
            id,
            request: false,
            response: true,
            params,
        }
    }
}

/// Time granularity hint attached to a new event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Instant,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| format!("unknown granularity {s:?}"))
    }
}

/// Parameters of a `newEvent` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEventParams {
    pub date_range_iso: DateRangeIso,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    /// Apply without further confirmation on the host side.
    pub immediate: bool,
}

/// Requests the view sends to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewRequest {
    /// Pull the current interaction state; the host answers with a push.
    InteractionState,
    /// Pull the current document state; the host answers with a push.
    DocumentState,
    SetHoveringPath(Option<Path>),
    SetDetailPath(Option<Path>),
    ShowInEditor(Option<Path>),
    NewEvent(NewEventParams),
}

impl ViewRequest {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InteractionState => INTERACTION_STATE,
            Self::DocumentState => DOCUMENT_STATE,
            Self::SetHoveringPath(_) => SET_HOVERING_PATH,
            Self::SetDetailPath(_) => SET_DETAIL_PATH,
            Self::ShowInEditor(_) => SHOW_IN_EDITOR,
            Self::NewEvent(_) => NEW_EVENT,
        }
    }

    pub fn params(&self) -> Result<Option<Value>, serde_json::Error> {
        match self {
            Self::InteractionState | Self::DocumentState => Ok(None),
            Self::SetHoveringPath(path) | Self::SetDetailPath(path) | Self::ShowInEditor(path) => {
                path.as_ref().map(serde_json::to_value).transpose()
            }
            Self::NewEvent(params) => serde_json::to_value(params).map(Some),
        }
    }
}
