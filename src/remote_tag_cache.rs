//! Opportunistic URI→tag-set cache for remote streams whose metadata only
//! becomes known once the player actually starts decoding them (radio
//! streams, in particular). Shared across partitions since a URI learned in
//! one partition is just as valid in another.

use std::collections::VecDeque;
use std::sync::Mutex;

use camino::Utf8PathBuf;

use crate::protocol::Tag;

struct Entry {
    uri: Utf8PathBuf,
    tags: Vec<(Tag, String)>,
}

pub struct RemoteTagCache {
    max_entries: usize,
    entries: Mutex<VecDeque<Entry>>,
}

impl RemoteTagCache {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries, entries: Mutex::new(VecDeque::new()) }
    }

    pub fn lookup(&self, uri: &Utf8PathBuf) -> Option<Vec<(Tag, String)>> {
        self.entries.lock().unwrap().iter().find(|e| &e.uri == uri).map(|e| e.tags.clone())
    }

    /// Records (or replaces) the tags observed for `uri`. Bounded FIFO
    /// eviction: once full, the oldest entry is dropped to make room.
    pub fn record(&self, uri: Utf8PathBuf, tags: Vec<(Tag, String)>) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| e.uri != uri);
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(Entry { uri, tags });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_looks_up_tags() {
        let cache = RemoteTagCache::new(2);
        let uri = Utf8PathBuf::from("http://stream.example/radio");
        cache.record(uri.clone(), vec![(Tag::Title, "Now Playing".into())]);
        assert_eq!(cache.lookup(&uri), Some(vec![(Tag::Title, "Now Playing".into())]));
    }

    #[test]
    fn bounded_eviction_drops_oldest() {
        let cache = RemoteTagCache::new(1);
        cache.record(Utf8PathBuf::from("a"), vec![]);
        cache.record(Utf8PathBuf::from("b"), vec![]);
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup(&Utf8PathBuf::from("a")).is_none());
        assert!(cache.lookup(&Utf8PathBuf::from("b")).is_some());
    }
}
