//! State pushed by the host: interaction state and document state.
//!
//! Both are replaced wholesale on every push. Nothing here is mutated in place.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::path::Path;

/// Source key used when a node carries no source identifier.
pub const DEFAULT_SOURCE: &str = "default";

/// An RGB color triple. Decodes from `"31, 32, 35"` or `[31, 32, 35]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "[u8; 3]")]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Triple([u8; 3]),
    Text(String),
}

impl TryFrom<ColorRepr> for Rgb {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Triple([r, g, b]) => Ok(Self(r, g, b)),
            ColorRepr::Text(text) => text.parse(),
        }
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(Rgb(r, g, b): Rgb) -> Self {
        [r, g, b]
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let channels = s
            .split(',')
            .map(|c| c.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid color {s:?}: {e}"))?;
        match channels.as_slice() {
            [r, g, b] => Ok(Self(*r, *g, *b)),
            _ => Err(format!("invalid color {s:?}: expected three channels")),
        }
    }
}

impl Rgb {
    /// Color used for events without a resolvable tag color.
    pub const FALLBACK: Self = Self(31, 32, 35);

    pub fn rgb(self) -> String {
        format!("rgb({},{},{})", self.0, self.1, self.2)
    }

    pub fn rgba(self, alpha: f32) -> String {
        format!("rgba({},{},{},{alpha})", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.0, self.1, self.2)
    }
}

/// Tag colors per source document: `source -> tag -> color`.
///
/// Entries that do not decode as colors are skipped, so their tags fall back
/// to the default color instead of failing the whole push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColorMap(pub HashMap<String, HashMap<String, Rgb>>);

impl<'de> Deserialize<'de> for ColorMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<HashMap<String, Value>> = Option::deserialize(deserializer)?;
        let mut map = Self::default();
        for (source, tags) in raw.unwrap_or_default() {
            let Value::Object(tags) = tags else {
                tracing::debug!("Skipping color entry for {source:?}: not an object");
                continue;
            };
            for (tag, color) in tags {
                match serde_json::from_value::<Rgb>(color) {
                    Ok(color) => map.insert(&source, &tag, color),
                    Err(e) => {
                        tracing::debug!("Skipping color for {source}/{tag}: {e}");
                    }
                }
            }
        }
        Ok(map)
    }
}

impl ColorMap {
    pub fn lookup(&self, source: Option<&str>, tag: &str) -> Option<Rgb> {
        self.0
            .get(source.unwrap_or(DEFAULT_SOURCE))
            .and_then(|tags| tags.get(tag))
            .copied()
    }

    pub fn insert(&mut self, source: &str, tag: &str, color: Rgb) {
        self.0
            .entry(source.to_string())
            .or_default()
            .insert(tag.to_string(), color);
    }
}

/// Decode a field, falling back to its default when the value does not fit.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::debug!("Ignoring undecodable field: {e}");
        T::default()
    }))
}

/// View-side interaction state, owned by the host.
///
/// Fields decode independently: one bad value resets that field only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionState {
    #[serde(alias = "isDark", deserialize_with = "lenient")]
    pub dark_theme_enabled: bool,
    #[serde(deserialize_with = "lenient")]
    pub hovering_path: Option<Path>,
    #[serde(deserialize_with = "lenient")]
    pub detail_path: Option<Path>,
    pub color_map: ColorMap,
}

/// Explicit start and end instants of an event, ISO-8601 text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeIso {
    pub from_date_time_iso: String,
    pub to_date_time_iso: String,
}

impl DateRangeIso {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_date_time_iso: from.into(),
            to_date_time_iso: to.into(),
        }
    }
}

/// Leaf node carrying a dated entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNode {
    pub date_range_iso: DateRangeIso,
    #[serde(default, alias = "eventDescription")]
    pub label: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Source document, when several documents are merged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_text: Option<String>,
}

/// Interior node. Exists only to address its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNode {
    #[serde(default)]
    pub children: Vec<DocumentNode>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Node of the transformed document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentNode {
    Group(GroupNode),
    Event(EventNode),
}

impl DocumentNode {
    pub fn group(children: Vec<Self>) -> Self {
        Self::Group(GroupNode {
            children,
            tags: Vec::new(),
        })
    }

    pub const fn as_event(&self) -> Option<&EventNode> {
        match self {
            Self::Event(event) => Some(event),
            Self::Group(_) => None,
        }
    }

    pub fn children(&self) -> &[Self] {
        match self {
            Self::Group(group) => &group.children,
            Self::Event(_) => &[],
        }
    }
}

/// Document state, owned by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentState {
    #[serde(deserialize_with = "lenient")]
    pub raw_text: Option<String>,
    /// Per-page parse results. Opaque here; the parser lives in the host.
    #[serde(alias = "parsed", deserialize_with = "lenient")]
    pub parsed_timelines: Vec<Value>,
    /// Root of the current page after transforms (filters, sorting).
    #[serde(alias = "transformed", deserialize_with = "lenient")]
    pub transformed_tree: Option<DocumentNode>,
}
