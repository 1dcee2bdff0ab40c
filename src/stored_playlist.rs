//! Named, persistent queues a client can `load`/`save` against the live
//! queue. The on-disk playlist directory layout is out of scope here; this
//! keeps playlists in memory, which satisfies the command surface without
//! taking a position on storage format.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;

use crate::error::{AckCode, AckError};

#[derive(Debug, Default)]
pub struct StoredPlaylists {
    playlists: BTreeMap<String, Vec<Utf8PathBuf>>,
}

impl StoredPlaylists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.playlists.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&[Utf8PathBuf], AckError> {
        self.playlists
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| AckError::new(AckCode::PlaylistLoad, format!("No such playlist: {name}")))
    }

    pub fn save(&mut self, name: String, entries: Vec<Utf8PathBuf>) {
        self.playlists.insert(name, entries);
    }

    pub fn rm(&mut self, name: &str) -> Result<(), AckError> {
        self.playlists
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AckError::new(AckCode::PlaylistLoad, format!("No such playlist: {name}")))
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), AckError> {
        if self.playlists.contains_key(to) {
            return Err(AckError::new(AckCode::Exist, "Playlist already exists"));
        }
        let entries = self.rm_entries(from)?;
        self.playlists.insert(to.to_string(), entries);
        Ok(())
    }

    fn rm_entries(&mut self, name: &str) -> Result<Vec<Utf8PathBuf>, AckError> {
        self.playlists
            .remove(name)
            .ok_or_else(|| AckError::new(AckCode::PlaylistLoad, format!("No such playlist: {name}")))
    }

    pub fn add(&mut self, name: &str, uri: Utf8PathBuf) {
        self.playlists.entry(name.to_string()).or_default().push(uri);
    }

    pub fn clear(&mut self, name: &str) {
        self.playlists.entry(name.to_string()).or_default().clear();
    }

    pub fn delete_position(&mut self, name: &str, position: u32) -> Result<(), AckError> {
        let entries = self
            .playlists
            .get_mut(name)
            .ok_or_else(|| AckError::new(AckCode::PlaylistLoad, format!("No such playlist: {name}")))?;
        if position as usize >= entries.len() {
            return Err(AckError::arg(format!("Bad position: {position}")));
        }
        entries.remove(position as usize);
        Ok(())
    }

    pub fn move_entry(&mut self, name: &str, from: u32, to: u32) -> Result<(), AckError> {
        let entries = self
            .playlists
            .get_mut(name)
            .ok_or_else(|| AckError::new(AckCode::PlaylistLoad, format!("No such playlist: {name}")))?;
        if from as usize >= entries.len() || to as usize >= entries.len() {
            return Err(AckError::arg("Bad position"));
        }
        let entry = entries.remove(from as usize);
        entries.insert(to as usize, entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let mut store = StoredPlaylists::new();
        store.save("favorites".into(), vec![Utf8PathBuf::from("a.flac")]);
        assert_eq!(store.get("favorites").unwrap(), &[Utf8PathBuf::from("a.flac")]);
    }

    #[test]
    fn rename_rejects_existing_target() {
        let mut store = StoredPlaylists::new();
        store.save("a".into(), vec![]);
        store.save("b".into(), vec![]);
        assert!(store.rename("a", "b").is_err());
    }

    #[test]
    fn rm_missing_playlist_is_an_error() {
        let mut store = StoredPlaylists::new();
        assert!(store.rm("nope").is_err());
    }
}
