//! Line commands for driving the action facade from a terminal.

use std::fmt;

use crate::{
    actions::Actions,
    correlator::ResponseHandle,
    path::Path,
    protocol::Granularity,
    state::DateRangeIso,
};

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Hover(Option<Path>),
    Detail(Option<Path>),
    Show(Option<Path>),
    /// Detail then show, as a click on the event would.
    Open(Option<Path>),
    NewEvent {
        range: DateRangeIso,
        granularity: Option<Granularity>,
        immediate: bool,
    },
    Refresh,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCommandError(String);

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseCommandError {}

pub const USAGE: &str = "commands: hover <path>|none, detail <path>|none, show <path>|none, open <path>, \
                         new <from> <to> [granularity] [--immediate], refresh, quit";

fn optional_path(arg: Option<&str>) -> Result<Option<Path>, ParseCommandError> {
    match arg {
        None | Some("none") => Ok(None),
        Some(text) => Path::parse(text)
            .map(Some)
            .map_err(|e| ParseCommandError(e.to_string())),
    }
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, ParseCommandError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(ParseCommandError("empty command".to_string()));
        };
        let rest: Vec<&str> = words.collect();

        match verb {
            "hover" => optional_path(rest.first().copied()).map(Self::Hover),
            "detail" => optional_path(rest.first().copied()).map(Self::Detail),
            "show" => optional_path(rest.first().copied()).map(Self::Show),
            "open" => optional_path(rest.first().copied()).map(Self::Open),
            "new" => Self::parse_new_event(&rest),
            "refresh" => Ok(Self::Refresh),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ParseCommandError(format!("unknown command {other:?}; {USAGE}"))),
        }
    }

    fn parse_new_event(args: &[&str]) -> Result<Self, ParseCommandError> {
        let immediate = args.contains(&"--immediate");
        let positional: Vec<&str> = args.iter().copied().filter(|a| *a != "--immediate").collect();
        let [from, to, rest @ ..] = positional.as_slice() else {
            return Err(ParseCommandError("new needs <from> and <to>".to_string()));
        };
        let granularity = match rest {
            [] => None,
            [g] => Some(g.parse().map_err(ParseCommandError)?),
            _ => return Err(ParseCommandError("too many arguments to new".to_string())),
        };
        Ok(Self::NewEvent {
            range: DateRangeIso::new(*from, *to),
            granularity,
            immediate,
        })
    }

    /// Issue the command through the facade. `Quit` issues nothing.
    pub fn issue(self, actions: &Actions) -> Vec<ResponseHandle> {
        match self {
            Self::Hover(path) => vec![actions.set_hovering_path(path)],
            Self::Detail(path) => vec![actions.set_detail_path(path)],
            Self::Show(path) => vec![actions.show_in_editor(path)],
            Self::Open(path) => {
                let (detail, show) = actions.open_path(path);
                vec![detail, show]
            }
            Self::NewEvent {
                range,
                granularity,
                immediate,
            } => vec![actions.new_event(range, granularity, immediate)],
            Self::Refresh => {
                let (interaction, document) = actions.request_state_update();
                vec![interaction, document]
            }
            Self::Quit => Vec::new(),
        }
    }
}
