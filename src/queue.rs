//! The queue (current playlist): an ordered sequence with a monotonic
//! version counter and stable per-entry ids, backed entirely in memory since
//! the on-disk database/index is out of scope here.

use camino::Utf8PathBuf;
use rand::seq::SliceRandom;

use crate::error::AckError;
use crate::protocol::request::{PosOrRange, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueId(pub u32);

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: QueueId,
    pub uri: Utf8PathBuf,
    pub tag: Option<String>,
    pub priority: u8,
    pub range: Option<(f32, Option<f32>)>,
    pub last_played_generation: u64,
    /// Bumped every time this entry is the target of a mutation, so
    /// `plchanges` can report it.
    pub last_modified_version: u32,
}

#[derive(Debug, Default)]
pub struct Queue {
    entries: Vec<QueueEntry>,
    next_id: u32,
    /// Monotonically increasing; strictly increases on any mutation.
    version: u32,
    pub max_length: usize,
}

impl Queue {
    pub fn new(max_length: usize) -> Self {
        Self { entries: Vec::new(), next_id: 1, version: 1, max_length }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    pub fn by_position(&self, pos: u32) -> Option<&QueueEntry> {
        self.entries.get(pos as usize)
    }

    pub fn by_id(&self, id: QueueId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn set_tag_id(&mut self, id: QueueId, tag: Option<String>) -> Result<(), AckError> {
        let version = self.version + 1;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| AckError::no_exist(format!("No such song id: {}", id.0)))?;
        entry.tag = tag;
        entry.last_modified_version = version;
        self.bump_version();
        Ok(())
    }

    pub fn position_of(&self, id: QueueId) -> Option<u32> {
        self.entries.iter().position(|e| e.id == id).map(|p| p as u32)
    }

    pub fn append_uri(&mut self, uri: Utf8PathBuf) -> Result<QueueId, AckError> {
        self.insert_at(uri, self.entries.len() as u32)
    }

    pub fn insert_at(&mut self, uri: Utf8PathBuf, position: u32) -> Result<QueueId, AckError> {
        if self.entries.len() >= self.max_length {
            return Err(AckError::new(
                crate::error::AckCode::PlaylistMax,
                "playlist is too long",
            ));
        }
        let position = (position as usize).min(self.entries.len());
        let id = QueueId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            position,
            QueueEntry {
                id,
                uri,
                tag: None,
                priority: 0,
                range: None,
                last_played_generation: 0,
                last_modified_version: self.version + 1,
            },
        );
        self.bump_version();
        Ok(id)
    }

    /// Removes the entry with the given id. Advancing playback when this
    /// was the currently playing entry is the caller's (`Partition`'s)
    /// responsibility.
    pub fn delete_id(&mut self, id: QueueId) -> Result<(), AckError> {
        let pos = self
            .position_of(id)
            .ok_or_else(|| AckError::no_exist(format!("No such song id: {}", id.0)))?;
        self.entries.remove(pos as usize);
        self.bump_version();
        Ok(())
    }

    pub fn delete_position(&mut self, pos: u32) -> Result<(), AckError> {
        if pos as usize >= self.entries.len() {
            return Err(AckError::arg(format!("Bad song index: {pos}")));
        }
        self.entries.remove(pos as usize);
        self.bump_version();
        Ok(())
    }

    pub fn delete_range(&mut self, range: Range) -> Result<(), AckError> {
        let (start, end) = range.resolve(self.entries.len() as u32)?;
        if start > end || end as usize > self.entries.len() {
            return Err(AckError::arg(format!("Bad range: {start}:{end}")));
        }
        self.entries.drain(start as usize..end as usize);
        self.bump_version();
        Ok(())
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.bump_version();
        }
    }

    /// Moves a contiguous slice to `dest`, preserving the relative order
    /// both inside the moved slice and among the untouched entries.
    pub fn move_range(&mut self, range: Range, dest: u32) -> Result<(), AckError> {
        let (start, end) = range.resolve(self.entries.len() as u32)?;
        if start >= end || end as usize > self.entries.len() {
            return Err(AckError::arg(format!("Bad range: {start}:{end}")));
        }
        let dest = dest as usize;
        if dest >= start as usize && dest < end as usize {
            return Err(AckError::arg("Range overlaps destination"));
        }
        let moved: Vec<_> = self.entries.drain(start as usize..end as usize).collect();
        // `dest` was computed against the pre-drain indexing; shift it left
        // if it was past the removed slice.
        let dest = if dest > end as usize { dest - moved.len() } else { dest };
        let dest = dest.min(self.entries.len());
        for (offset, entry) in moved.into_iter().enumerate() {
            self.entries.insert(dest + offset, entry);
        }
        self.bump_version();
        Ok(())
    }

    pub fn swap_ids(&mut self, a: QueueId, b: QueueId) -> Result<(), AckError> {
        let pa = self.position_of(a).ok_or_else(|| AckError::no_exist("No such song id"))?;
        let pb = self.position_of(b).ok_or_else(|| AckError::no_exist("No such song id"))?;
        self.swap_positions(pa, pb)
    }

    pub fn swap_positions(&mut self, a: u32, b: u32) -> Result<(), AckError> {
        let len = self.entries.len();
        if a as usize >= len || b as usize >= len {
            return Err(AckError::arg("Bad song index"));
        }
        self.entries.swap(a as usize, b as usize);
        self.bump_version();
        Ok(())
    }

    /// Fisher-Yates shuffle over `range` (or the whole queue).
    pub fn shuffle(&mut self, range: Option<Range>) -> Result<(), AckError> {
        let (start, end) = match range {
            Some(r) => r.resolve(self.entries.len() as u32)?,
            None => (0, self.entries.len() as u32),
        };
        if start > end || end as usize > self.entries.len() {
            return Err(AckError::arg(format!("Bad range: {start}:{end}")));
        }
        self.entries[start as usize..end as usize].shuffle(&mut rand::rng());
        if end > start {
            self.bump_version();
        }
        Ok(())
    }

    pub fn set_priority_id(&mut self, id: QueueId, priority: u8) -> Result<(), AckError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| AckError::no_exist("No such song id"))?;
        entry.priority = priority;
        entry.last_modified_version = self.version + 1;
        self.bump_version();
        Ok(())
    }

    pub fn set_priority_range(&mut self, range: Range, priority: u8) -> Result<(), AckError> {
        let (start, end) = range.resolve(self.entries.len() as u32)?;
        if end as usize > self.entries.len() {
            return Err(AckError::arg(format!("Bad range: {start}:{end}")));
        }
        let version = self.version + 1;
        for entry in &mut self.entries[start as usize..end as usize] {
            entry.priority = priority;
            entry.last_modified_version = version;
        }
        if end > start {
            self.bump_version();
        }
        Ok(())
    }

    /// Sets an intra-track play window; `None` clears it back to "full
    /// song".
    pub fn set_range_id(
        &mut self,
        id: QueueId,
        window: Option<(f32, Option<f32>)>,
    ) -> Result<(), AckError> {
        let version = self.version + 1;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| AckError::no_exist("No such song id"))?;
        entry.range = window;
        entry.last_modified_version = version;
        self.bump_version();
        Ok(())
    }

    /// Entries whose version is newer than `since`, in positional order,
    /// optionally windowed to a sub-range of the *result list* (not queue
    /// positions).
    pub fn changes_since(
        &self,
        since: u32,
        window: Option<Range>,
    ) -> Result<Vec<(u32, &QueueEntry)>, AckError> {
        let all: Vec<_> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.last_modified_version > since)
            .map(|(pos, e)| (pos as u32, e))
            .collect();
        match window {
            None => Ok(all),
            Some(range) => {
                let (start, end) = range.resolve(all.len() as u32)?;
                Ok(all
                    .into_iter()
                    .skip(start as usize)
                    .take((end - start) as usize)
                    .collect())
            }
        }
    }

    pub fn resolve_pos_or_range(&self, selector: Option<PosOrRange>) -> Result<Range, AckError> {
        match selector {
            None => Ok(Range::full()),
            Some(PosOrRange::Position(pos)) => Ok(Range::single(pos)),
            Some(PosOrRange::Range(range)) => Ok(range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(s)
    }

    #[test]
    fn positions_are_always_a_permutation_after_mutation() {
        let mut queue = Queue::new(1000);
        for i in 0..5 {
            queue.append_uri(uri(&format!("song{i}"))).unwrap();
        }
        queue.move_range(Range::single_index(1), 3).unwrap();
        let positions: Vec<_> = (0..queue.len() as u32).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn version_strictly_increases_on_mutation() {
        let mut queue = Queue::new(1000);
        let v0 = queue.version();
        queue.append_uri(uri("a")).unwrap();
        assert!(queue.version() > v0);
    }

    #[test]
    fn ids_are_stable_across_moves() {
        let mut queue = Queue::new(1000);
        let id0 = queue.append_uri(uri("a")).unwrap();
        let id1 = queue.append_uri(uri("b")).unwrap();
        queue.swap_ids(id0, id1).unwrap();
        assert_eq!(queue.by_id(id0).unwrap().uri, uri("a"));
        assert_eq!(queue.position_of(id0), Some(1));
    }

    #[test]
    fn plchanges_returns_only_newer_entries() {
        let mut queue = Queue::new(1000);
        queue.append_uri(uri("a")).unwrap();
        let v1 = queue.version();
        queue.append_uri(uri("b")).unwrap();
        let changes = queue.changes_since(v1, None).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].1.uri, uri("b"));
    }

    #[test]
    fn playlist_max_is_enforced() {
        let mut queue = Queue::new(1);
        queue.append_uri(uri("a")).unwrap();
        let err = queue.append_uri(uri("b")).unwrap_err();
        assert_eq!(err.code, crate::error::AckCode::PlaylistMax);
    }
}
