//! Slash-separated node paths.
//!
//! Paths are chains of node ids starting at the course, e.g.
//! `CS101/2024/g1`. The client prefixes them with a `./` marker; that
//! marker is accepted and stripped everywhere.

use std::fmt;

/// Marker the client puts in front of paths.
pub const CURRENT_DIR: &str = "./";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TreePath {
    segments: Vec<String>,
    /// Whether the raw input carried the `./` marker.
    relative: bool,
}

impl TreePath {
    /// Parse a raw path. Empty segments (doubled or trailing slashes) are dropped.
    pub fn parse(raw: &str) -> Self {
        let (relative, rest) = match raw.strip_prefix(CURRENT_DIR) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let segments = rest
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments, relative }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            relative: false,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments below a tree whose root has id `root_id`.
    ///
    /// A client path `./CS101/2024` names the root explicitly after the
    /// marker; that leading root segment is skipped.
    pub fn relative_to(&self, root_id: &str) -> &[String] {
        match self.segments.first() {
            Some(first) if self.relative && first == root_id => &self.segments[1..],
            _ => &self.segments,
        }
    }

    /// Last segment, i.e. the name of the addressed node.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The path of the parent, `None` at the root.
    pub fn parent(&self) -> Option<TreePath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
            relative: self.relative,
        })
    }

    /// Split into the stored `path` column value and the node name.
    ///
    /// `CS101/2024/g1` becomes `(Some("CS101/2024"), "g1")`; a single
    /// segment has no parent path.
    pub fn split_last(&self) -> Option<(Option<String>, &str)> {
        let (name, parent) = self.segments.split_last()?;
        let parent = if parent.is_empty() {
            None
        } else {
            Some(parent.join("/"))
        };
        Some((parent, name.as_str()))
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl From<&str> for TreePath {
    fn from(raw: &str) -> Self {
        TreePath::parse(raw)
    }
}
