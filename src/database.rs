//! The music-file database is out of scope: the core only consumes this
//! trait object for lookup/visit/stats/update, reduced to the capability
//! surface the command-dispatch layer actually calls, since indexing and
//! tag extraction are explicitly excluded here.

use camino::Utf8PathBuf;

use crate::protocol::query::Query;

#[derive(Debug, Clone, Default)]
pub struct DatabaseStats {
    pub song_count: u64,
    pub artist_count: u64,
    pub album_count: u64,
    pub total_duration_seconds: u64,
    pub db_playtime_seconds: u64,
    pub last_update: Option<jiff::Timestamp>,
}

#[derive(Debug, Clone)]
pub struct SongInfo {
    pub uri: Utf8PathBuf,
    pub duration_seconds: Option<f64>,
    pub tags: Vec<(crate::protocol::Tag, String)>,
}

/// Capability trait object the core holds an `Option<Arc<dyn Database>>`
/// of. Update/rescan return immediately; progress is reported later via
/// `IdleKind::Update`, which the caller (the `update`/`rescan` handlers)
/// is responsible for emitting once the implementation's own job completes.
pub trait Database: Send + Sync {
    fn stats(&self) -> DatabaseStats;

    /// Returns true if at least one song matches `query`.
    fn matches_any(&self, query: &Query) -> bool;

    /// All songs matching `query`, in implementation-defined order.
    fn find(&self, query: &Query) -> Vec<SongInfo>;

    fn lookup(&self, uri: &Utf8PathBuf) -> Option<SongInfo>;

    /// Schedules an update of `path` (or the whole tree if `None`). Returns
    /// the job id surfaced to the client as `updating_db`, or an error if a
    /// job with the given path is already queued.
    fn schedule_update(&self, path: Option<&Utf8PathBuf>, rescan: bool) -> Result<u32, String>;
}

/// In-memory stand-in satisfying the trait for tests and for a
/// development deployment without a real indexer wired in.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    songs: std::sync::Mutex<Vec<SongInfo>>,
    next_job: std::sync::atomic::AtomicU32,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, song: SongInfo) {
        self.songs.lock().unwrap().push(song);
    }

    fn matches(song: &SongInfo, query: &Query) -> bool {
        match &query.root {
            None => true,
            Some(node) => Self::matches_node(song, node),
        }
    }

    fn matches_node(song: &SongInfo, node: &crate::protocol::query::QueryNode) -> bool {
        use crate::protocol::query::{Filter, QueryNode};
        match node {
            QueryNode::Filter(f) => Self::matches_filter(song, f),
            QueryNode::NegatedFilter(f) => !Self::matches_filter(song, f),
            QueryNode::And(nodes) => nodes.iter().all(|n| Self::matches_node(song, n)),
        }
    }

    fn matches_filter(song: &SongInfo, filter: &crate::protocol::query::Filter) -> bool {
        use crate::protocol::query::Filter;
        match filter {
            Filter::PathEqual(uri) => &song.uri == uri,
            Filter::ParentPathEquals(dir) => song.uri.as_str().starts_with(dir.as_str()),
            Filter::TagEqual { tag, needle } => {
                song.tags.iter().any(|(t, v)| t == tag && v == needle)
            }
            Filter::TagNotEqual { tag, needle } => {
                !song.tags.iter().any(|(t, v)| t == tag && v == needle)
            }
            Filter::TagContains { tag, needle } => {
                song.tags.iter().any(|(t, v)| t == tag && v.contains(needle.as_str()))
            }
            Filter::TagStartsWith { tag, needle } => {
                song.tags.iter().any(|(t, v)| t == tag && v.starts_with(needle.as_str()))
            }
            Filter::ModifiedSince { .. } | Filter::AddedSince { .. } => true,
            Filter::QueuePriorityAtLeast(_) => false,
        }
    }
}

impl Database for InMemoryDatabase {
    fn stats(&self) -> DatabaseStats {
        let songs = self.songs.lock().unwrap();
        DatabaseStats {
            song_count: songs.len() as u64,
            artist_count: 0,
            album_count: 0,
            total_duration_seconds: songs
                .iter()
                .filter_map(|s| s.duration_seconds)
                .sum::<f64>() as u64,
            db_playtime_seconds: 0,
            last_update: None,
        }
    }

    fn matches_any(&self, query: &Query) -> bool {
        self.songs.lock().unwrap().iter().any(|s| Self::matches(s, query))
    }

    fn find(&self, query: &Query) -> Vec<SongInfo> {
        self.songs
            .lock()
            .unwrap()
            .iter()
            .filter(|s| Self::matches(s, query))
            .cloned()
            .collect()
    }

    fn lookup(&self, uri: &Utf8PathBuf) -> Option<SongInfo> {
        self.songs.lock().unwrap().iter().find(|s| &s.uri == uri).cloned()
    }

    fn schedule_update(&self, _path: Option<&Utf8PathBuf>, _rescan: bool) -> Result<u32, String> {
        Ok(self.next_job.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Tag;
    use crate::protocol::query::{Filter, Query};

    fn song(uri: &str, artist: &str) -> SongInfo {
        SongInfo {
            uri: Utf8PathBuf::from(uri),
            duration_seconds: Some(180.0),
            tags: vec![(Tag::Artist, artist.to_string())],
        }
    }

    #[test]
    fn find_matches_tag_filter() {
        let db = InMemoryDatabase::new();
        db.insert(song("a.flac", "Boards of Canada"));
        db.insert(song("b.flac", "Aphex Twin"));
        let query = Query::single(Filter::TagEqual { tag: Tag::Artist, needle: "Aphex Twin".into() });
        let results = db.find(&query);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uri, Utf8PathBuf::from("b.flac"));
    }

    #[test]
    fn matches_any_for_path_equal_is_sticker_liveness_check() {
        let db = InMemoryDatabase::new();
        db.insert(song("a.flac", "x"));
        let query = crate::protocol::query::song_filter_for_sticker(&Utf8PathBuf::from("a.flac"));
        assert!(db.matches_any(&query));
        let query = crate::protocol::query::song_filter_for_sticker(&Utf8PathBuf::from("gone.flac"));
        assert!(!db.matches_any(&query));
    }
}
