//! Flattening of the document tree into calendar-ready events.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::{
    path::{equivalent, Path},
    state::{DateRangeIso, DocumentNode, EventNode, InteractionState, Rgb},
};

const RESTING_ALPHA: f32 = 0.8;
const HIGHLIGHT_ALPHA: f32 = 0.95;

/// One renderable calendar entry, derived from a leaf event node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedEvent {
    /// Serialized path of the source node.
    pub id: String,
    #[serde(rename = "start")]
    pub start_iso: String,
    #[serde(rename = "end")]
    pub end_iso: String,
    pub title: String,
    pub background_color: String,
    pub border_color: String,
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_text: Option<String>,
}

impl ProjectedEvent {
    /// Parse the id back into the path of the source node.
    pub fn path(&self) -> Option<Path> {
        Path::parse(&self.id).ok()
    }
}

/// Depth-first pre-order walk emitting one event per leaf.
///
/// An absent tree projects to an empty list.
pub fn project(tree: Option<&DocumentNode>, interaction: &InteractionState) -> Vec<ProjectedEvent> {
    let mut events = Vec::new();
    if let Some(root) = tree {
        let mut indices = Vec::new();
        visit(root, &mut indices, interaction, &mut events);
    }
    events
}

fn visit(
    node: &DocumentNode,
    indices: &mut Vec<usize>,
    interaction: &InteractionState,
    out: &mut Vec<ProjectedEvent>,
) {
    match node {
        DocumentNode::Event(event) => {
            out.push(project_event(event, Path::new(indices.clone()), interaction));
        }
        DocumentNode::Group(group) => {
            for (index, child) in group.children.iter().enumerate() {
                indices.push(index);
                visit(child, indices, interaction, out);
                indices.pop();
            }
        }
    }
}

fn project_event(event: &EventNode, path: Path, interaction: &InteractionState) -> ProjectedEvent {
    let color = event_color(event, interaction);
    let highlighted = equivalent(interaction.hovering_path.as_ref(), Some(&path))
        || equivalent(interaction.detail_path.as_ref(), Some(&path));

    let (background_color, border_color) = if highlighted {
        let contrast = if interaction.dark_theme_enabled {
            "white"
        } else {
            "black"
        };
        (color.rgba(HIGHLIGHT_ALPHA), contrast.to_string())
    } else {
        (color.rgba(RESTING_ALPHA), color.rgb())
    };

    ProjectedEvent {
        id: path.serialize(),
        start_iso: event.date_range_iso.from_date_time_iso.clone(),
        end_iso: event.date_range_iso.to_date_time_iso.clone(),
        title: event.label.trim().to_string(),
        background_color,
        border_color,
        all_day: is_all_day(&event.date_range_iso),
        date_text: event.date_text.clone(),
    }
}

/// Color of the event's first tag within its source, or the fallback.
fn event_color(event: &EventNode, interaction: &InteractionState) -> Rgb {
    event
        .tags
        .first()
        .and_then(|tag| interaction.color_map.lookup(event.source.as_deref(), tag))
        .unwrap_or(Rgb::FALLBACK)
}

/// A range is all-day when it spans at least 24 elapsed hours.
///
/// Elapsed time is measured between absolute instants, so a range crossing a
/// DST transition is judged by real duration, not wall-clock difference.
/// Unparsable bounds are never all-day.
pub fn is_all_day(range: &DateRangeIso) -> bool {
    match (
        parse_instant(&range.from_date_time_iso),
        parse_instant(&range.to_date_time_iso),
    ) {
        (Some(from), Some(to)) => to.signed_duration_since(from) >= TimeDelta::days(1),
        _ => false,
    }
}

/// RFC 3339, then offset-less date-time (read as UTC), then bare date.
fn parse_instant(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant);
    }
    let utc = FixedOffset::east_opt(0)?;
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().with_timezone(&utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().with_timezone(&utc))
}
