//! Addressing of nodes in the document tree by child index.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// Which logical view the indices of a path are relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathKind {
    /// The whole document, all pages.
    Whole,
    /// The current page.
    Page,
    /// The current page with active filters applied.
    PageFiltered,
}

/// Child-index address of a node, optionally tagged with its view context.
///
/// On the wire a path is either a bare index array (`[1,0]`) or an object
/// `{"type": "page", "path": [1,0]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PathRepr", into = "PathRepr")]
pub struct Path {
    pub kind: Option<PathKind>,
    pub indices: Vec<usize>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PathRepr {
    Bare(Vec<usize>),
    Tagged {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<PathKind>,
        path: Vec<usize>,
    },
}

impl From<PathRepr> for Path {
    fn from(repr: PathRepr) -> Self {
        match repr {
            PathRepr::Bare(indices) => Self {
                kind: None,
                indices,
            },
            PathRepr::Tagged { kind, path } => Self {
                kind,
                indices: path,
            },
        }
    }
}

impl From<Path> for PathRepr {
    fn from(path: Path) -> Self {
        match path.kind {
            None => Self::Bare(path.indices),
            kind @ Some(_) => Self::Tagged {
                kind,
                path: path.indices,
            },
        }
    }
}

impl Path {
    pub const fn new(indices: Vec<usize>) -> Self {
        Self {
            kind: None,
            indices,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: PathKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Comma-joined indices. The kind tag is not part of the text form.
    pub fn serialize(&self) -> String {
        self.indices
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse comma-joined indices into an untagged path.
    ///
    /// The empty string is the root path.
    pub fn parse(text: &str) -> Result<Self, RpcError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }
        text.split(',')
            .map(|segment| segment.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
            .map_err(|_| RpcError::InvalidPath(text.to_string()))
    }

    /// Same indices, and same kind whenever both paths carry one.
    pub fn same_node(&self, other: &Self) -> bool {
        let kinds_agree = match (self.kind, other.kind) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        kinds_agree && self.indices == other.indices
    }
}

/// Whether two optional paths address the same node. Absent paths never match.
pub fn equivalent(a: Option<&Path>, b: Option<&Path>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same_node(b),
        _ => false,
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for Path {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Self::new(indices)
    }
}
