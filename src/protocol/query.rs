//! Song filter expressions used by `find`/`search`/`count`/`list` and by
//! sticker cleanup to test whether a sticker's `(type, uri)` key still
//! matches a live song.

use camino::Utf8PathBuf;

use crate::protocol::Tag;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `(TAG == 'VALUE')`; the special tag `any` checks every tag type.
    TagEqual { tag: Tag, needle: String },
    TagNotEqual { tag: Tag, needle: String },
    TagContains { tag: Tag, needle: String },
    TagStartsWith { tag: Tag, needle: String },
    /// `(file == 'VALUE')`: the full song URI, relative to the music root.
    PathEqual(Utf8PathBuf),
    /// `(base 'VALUE')`: restricts the search to one directory.
    ParentPathEquals(Utf8PathBuf),
    ModifiedSince { time: jiff::Timestamp },
    AddedSince { time: jiff::Timestamp },
    /// `(prio >= N)`: compares the priority of queued songs.
    QueuePriorityAtLeast(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Filter(Filter),
    NegatedFilter(Filter),
    And(Vec<QueryNode>),
}

/// One or more filters combined with implicit AND, the shape every
/// `find`/`search` handler eventually builds and every `Database`
/// implementation evaluates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub root: Option<QueryNode>,
}

impl Query {
    pub fn empty() -> Self {
        Self { root: None }
    }

    pub fn single(filter: Filter) -> Self {
        Self { root: Some(QueryNode::Filter(filter)) }
    }

    pub fn and(nodes: Vec<QueryNode>) -> Self {
        Self { root: Some(QueryNode::And(nodes)) }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

/// Builds the `(type == 'TYPE') AND (file == 'URI')`-equivalent query used
/// to test sticker liveness. `type` here is folded into the URI match since
/// the core treats sticker "type" as an opaque namespace the `Database`
/// doesn't index; callers that need type-aware matching wrap this.
pub fn song_filter_for_sticker(uri: &Utf8PathBuf) -> Query {
    Query::single(Filter::PathEqual(uri.clone()))
}
