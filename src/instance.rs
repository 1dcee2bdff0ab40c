//! Process-global root: the partitions list, the instance-wide idle
//! broadcast, and the optional cross-partition subsystems (input cache,
//! sticker store, remote tag cache, database).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use camino::Utf8PathBuf;

use crate::client::session::ClientSession;
use crate::database::Database;
use crate::error::AckError;
use crate::idle::{IdleKind, IdleMask, MaskMonitor};
use crate::input_cache::InputCache;
use crate::partition::Partition;
use crate::player_control::PlayerControl;
use crate::remote_tag_cache::RemoteTagCache;
use crate::sticker::{CancelToken, StickerStore};

pub const DEFAULT_PARTITION: &str = "default";

pub struct Instance {
    pub partitions: Vec<Partition>,
    pub client_list_cap: usize,
    pub client_count: usize,
    pub input_cache: Option<Arc<InputCache>>,
    pub sticker_db_path: Option<Utf8PathBuf>,
    pub remote_tag_cache: Option<RemoteTagCache>,
    pub database: Option<Arc<dyn Database>>,
    pub idle: Arc<MaskMonitor>,
    pub inject_handle: Option<crate::event_loop::InjectHandle>,
    pub stored_playlists: crate::stored_playlist::StoredPlaylists,
    /// Mount points: a tree-relative path mapped to an opaque storage URI.
    /// The storage backends themselves are out of scope; this is just the
    /// bookkeeping `mount`/`unmount`/`listmounts` need.
    pub mounts: Vec<(Utf8PathBuf, String)>,
    /// Configured passwords and the permission bits each one grants, in the
    /// order `password` should try them.
    pub passwords: Vec<(String, crate::permission::Permission)>,
    /// Every connected client, keyed by [`ClientSession::id`]. The driver
    /// registers a session here when it accepts the connection and removes
    /// it on disconnect; `sendmessage` is the only handler that reaches
    /// through it to mutate a session other than the one it was called for.
    sessions: HashMap<u64, Weak<Mutex<ClientSession>>>,
    sticker_cleanup_running: Option<CancelToken>,
    sticker_cleanup_requested_again: bool,
    /// Set once by [`Instance::bind_self_handle`] after the caller wraps
    /// this instance in an `Arc<Mutex<_>>`, so a sticker-cleanup completion
    /// posted from a worker thread through `InjectHandle` can reach back in
    /// without the closure borrowing `self` directly.
    self_handle: Option<Weak<Mutex<Instance>>>,
}

impl Instance {
    pub fn new(
        default_player: Arc<dyn PlayerControl>,
        max_queue_length: usize,
        client_list_cap: usize,
    ) -> Self {
        Self {
            partitions: vec![Partition::new(DEFAULT_PARTITION, default_player, max_queue_length)],
            client_list_cap,
            client_count: 0,
            input_cache: None,
            sticker_db_path: None,
            remote_tag_cache: None,
            database: None,
            idle: MaskMonitor::new(),
            inject_handle: None,
            stored_playlists: crate::stored_playlist::StoredPlaylists::new(),
            mounts: Vec::new(),
            passwords: Vec::new(),
            sessions: HashMap::new(),
            sticker_cleanup_running: None,
            sticker_cleanup_requested_again: false,
            self_handle: None,
        }
    }

    /// Lets a sticker-cleanup completion posted from its worker thread find
    /// its way back into this instance without the closure capturing `self`.
    pub fn bind_self_handle(handle: &Arc<Mutex<Instance>>) {
        handle.lock().unwrap().self_handle = Some(Arc::downgrade(handle));
    }

    pub fn emit_idle(&self, kind: IdleKind) {
        self.idle.or_mask(IdleMask::from(kind));
    }

    pub fn partition(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }

    pub fn partition_mut(&mut self, name: &str) -> Option<&mut Partition> {
        self.partitions.iter_mut().find(|p| p.name == name)
    }

    pub fn register_session(&mut self, handle: &Arc<Mutex<ClientSession>>) {
        let id = handle.lock().unwrap().id;
        self.sessions.insert(id, Arc::downgrade(handle));
    }

    pub fn unregister_session(&mut self, id: u64) {
        self.sessions.remove(&id);
    }

    /// Every still-alive session other than `exclude`, for broadcast-style
    /// lookups (`sendmessage`).
    pub fn other_sessions(&self, exclude: u64) -> impl Iterator<Item = Arc<Mutex<ClientSession>>> + '_ {
        self.sessions
            .iter()
            .filter(move |&(&id, _)| id != exclude)
            .filter_map(|(_, weak)| weak.upgrade())
    }

    pub fn new_partition(
        &mut self,
        name: impl Into<String>,
        player_control: Arc<dyn PlayerControl>,
        max_queue_length: usize,
    ) -> Result<(), AckError> {
        let name = name.into();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(AckError::arg("Invalid partition name"));
        }
        if self.partitions.iter().any(|p| p.name == name) {
            return Err(AckError::new(crate::error::AckCode::Exist, "Partition already exists"));
        }
        self.partitions.push(Partition::new(name, player_control, max_queue_length));
        self.emit_idle(IdleKind::Partition);
        Ok(())
    }

    pub fn delete_partition(&mut self, name: &str) -> Result<(), AckError> {
        if name == DEFAULT_PARTITION {
            return Err(AckError::arg("Cannot delete the default partition"));
        }
        let index = self
            .partitions
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| AckError::no_exist("No such partition"))?;
        if !self.partitions[index].is_empty_and_deletable() {
            return Err(AckError::new(
                crate::error::AckCode::Unknown,
                "partition still has clients or enabled outputs attached",
            ));
        }
        self.partitions.remove(index);
        self.emit_idle(IdleKind::Partition);
        Ok(())
    }

    /// Invalidates cached stats and notifies every partition that the
    /// database changed; if a sticker store is attached, kicks off a
    /// cleanup pass.
    pub fn on_database_modified(&mut self) {
        self.emit_idle(IdleKind::Database);
        for partition in &mut self.partitions {
            partition.emit_idle(IdleKind::Playlist);
        }
        self.request_sticker_cleanup();
    }

    /// Best-effort deletion of a removed song's sticker entry, plus a
    /// playlist re-sync nudge for any partition that might reference it.
    pub fn on_database_song_removed(&mut self, uri: &Utf8PathBuf) {
        if let Some(path) = self.sticker_db_path.clone()
            && let Ok(store) = StickerStore::open(path.as_std_path())
        {
            let _ = store.delete("song", uri.as_str(), None);
        }
        for partition in &mut self.partitions {
            partition.emit_idle(IdleKind::Playlist);
        }
    }

    fn request_sticker_cleanup(&mut self) {
        if self.sticker_cleanup_running.is_some() {
            self.sticker_cleanup_requested_again = true;
            return;
        }
        let (Some(path), Some(database)) = (self.sticker_db_path.clone(), self.database.clone()) else {
            return;
        };
        let Ok(store) = StickerStore::open(path.as_std_path()) else {
            return;
        };
        let idle = Arc::clone(&self.idle);
        let inject = match &self.inject_handle {
            Some(handle) => handle.clone(),
            None => return,
        };
        let self_handle = self.self_handle.clone();
        self.sticker_cleanup_running = Some(crate::sticker::spawn(
            store,
            database,
            idle,
            inject,
            move |_outcome| {
                if let Some(instance) = self_handle.and_then(|w| w.upgrade())
                    && let Ok(mut instance) = instance.lock()
                {
                    instance.on_sticker_cleanup_done();
                }
            },
        ));
    }

    /// Called from the Inject the cleanup worker posts on completion, even
    /// if that run was cancelled: the running slot must clear either way or
    /// a cancelled run would wedge out every future cleanup request.
    pub fn on_sticker_cleanup_done(&mut self) {
        self.sticker_cleanup_running = None;
        if self.sticker_cleanup_requested_again {
            self.sticker_cleanup_requested_again = false;
            self.request_sticker_cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player_control::NullPlayerControl;

    fn instance() -> Instance {
        Instance::new(Arc::new(NullPlayerControl::new()), 1000, 32)
    }

    #[test]
    fn default_partition_always_present() {
        let instance = instance();
        assert_eq!(instance.partitions.len(), 1);
        assert_eq!(instance.partitions[0].name, DEFAULT_PARTITION);
    }

    #[test]
    fn cannot_delete_default_partition() {
        let mut instance = instance();
        let err = instance.delete_partition(DEFAULT_PARTITION).unwrap_err();
        assert_eq!(err.code, crate::error::AckCode::Arg);
    }

    #[test]
    fn new_partition_rejects_duplicate_names() {
        let mut instance = instance();
        instance
            .new_partition("studio", Arc::new(NullPlayerControl::new()), 1000)
            .unwrap();
        let err = instance
            .new_partition("studio", Arc::new(NullPlayerControl::new()), 1000)
            .unwrap_err();
        assert_eq!(err.code, crate::error::AckCode::Exist);
    }
}
