//! An independent playback universe: one queue, one player handle, its own
//! outputs and attached clients, its own pair of idle monitors.

use std::sync::Arc;

use crate::idle::{IdleKind, IdleMask, MaskMonitor};
use crate::player_control::{PlayState, PlayerControl};
use crate::queue::Queue;

pub type ClientId = u64;

#[derive(Debug, Clone)]
pub struct AudioOutput {
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingleMode {
    #[default]
    Off,
    On,
    Oneshot,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackOptions {
    pub repeat: bool,
    pub random: bool,
    pub single: SingleMode,
    pub consume: bool,
    pub crossfade_seconds: f32,
    pub mixramp_db: f32,
    pub mixramp_delay: f32,
    pub replay_gain_mode: ReplayGainMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayGainMode {
    #[default]
    Off,
    Track,
    Album,
    Auto,
}

impl ReplayGainMode {
    pub fn wire_name(self) -> &'static str {
        match self {
            ReplayGainMode::Off => "off",
            ReplayGainMode::Track => "track",
            ReplayGainMode::Album => "album",
            ReplayGainMode::Auto => "auto",
        }
    }
}

pub struct Partition {
    pub name: String,
    pub queue: Queue,
    pub player_control: Arc<dyn PlayerControl>,
    pub outputs: Vec<AudioOutput>,
    pub clients: Vec<ClientId>,
    pub idle_local: Arc<MaskMonitor>,
    pub global_events: Arc<MaskMonitor>,
    pub options: PlaybackOptions,
    /// The queue position of the entry the player is presently on, kept in
    /// sync with the engine's own notion via `sync_with_player`.
    current_position: Option<u32>,
}

impl Partition {
    pub fn new(name: impl Into<String>, player_control: Arc<dyn PlayerControl>, max_queue_length: usize) -> Self {
        Self {
            name: name.into(),
            queue: Queue::new(max_queue_length),
            player_control,
            outputs: Vec::new(),
            clients: Vec::new(),
            idle_local: MaskMonitor::new(),
            global_events: MaskMonitor::new(),
            options: PlaybackOptions::default(),
            current_position: None,
        }
    }

    pub fn emit_idle(&self, kind: IdleKind) {
        self.idle_local.or_mask(IdleMask::from(kind));
    }

    pub fn is_empty_and_deletable(&self) -> bool {
        self.clients.is_empty() && self.outputs.iter().all(|o| !o.enabled)
    }

    pub fn play_position(&mut self, position: u32) -> Result<(), crate::error::AckError> {
        let entry = self
            .queue
            .by_position(position)
            .ok_or_else(|| crate::error::AckError::arg(format!("Bad song index: {position}")))?;
        self.player_control
            .play(entry.id.0, &entry.uri)
            .map_err(crate::error::AckError::system)?;
        self.current_position = Some(position);
        self.emit_idle(IdleKind::Player);
        Ok(())
    }

    pub fn play_id(&mut self, id: crate::queue::QueueId) -> Result<(), crate::error::AckError> {
        let position = self
            .queue
            .position_of(id)
            .ok_or_else(|| crate::error::AckError::no_exist(format!("No such song id: {}", id.0)))?;
        self.play_position(position)
    }

    /// Plays the current entry if there is one, otherwise the first.
    pub fn play_resume(&mut self) -> Result<(), crate::error::AckError> {
        let position = self.current_position.unwrap_or(0);
        self.play_position(position)
    }

    pub fn pause(&mut self, pause: bool) {
        self.player_control.pause(pause);
        self.emit_idle(IdleKind::Player);
    }

    pub fn stop(&mut self) {
        self.player_control.stop();
        self.current_position = None;
        self.emit_idle(IdleKind::Player);
    }

    pub fn seek_seconds(&mut self, seconds: f64) -> Result<(), crate::error::AckError> {
        self.player_control.seek(seconds).map_err(crate::error::AckError::system)?;
        self.emit_idle(IdleKind::Player);
        Ok(())
    }

    /// Advances to the next queue position, honoring `consume`/`single`/
    /// `repeat` the way the engine's transport rules require.
    pub fn next(&mut self) -> Result<(), crate::error::AckError> {
        let current = self.current_position.ok_or_else(|| crate::error::AckError::system("Not playing"))?;
        if self.options.consume {
            self.queue.delete_position(current).ok();
            if self.queue.by_position(current).is_some() {
                self.play_position(current)
            } else if self.options.repeat && !self.queue.is_empty() {
                self.play_position(0)
            } else {
                self.stop();
                Ok(())
            }
        } else {
            let next = current + 1;
            if self.queue.by_position(next).is_some() {
                self.play_position(next)
            } else if self.options.repeat && !self.queue.is_empty() {
                self.play_position(0)
            } else {
                self.stop();
                Ok(())
            }
        }
    }

    pub fn previous(&mut self) -> Result<(), crate::error::AckError> {
        let current = self.current_position.ok_or_else(|| crate::error::AckError::system("Not playing"))?;
        if current == 0 {
            return self.play_position(0);
        }
        self.play_position(current - 1)
    }

    pub fn set_repeat(&mut self, value: bool) {
        self.options.repeat = value;
        self.emit_idle(IdleKind::Options);
    }

    pub fn set_random(&mut self, value: bool) {
        self.options.random = value;
        self.emit_idle(IdleKind::Options);
    }

    pub fn set_consume(&mut self, value: bool) {
        self.options.consume = value;
        self.emit_idle(IdleKind::Options);
    }

    pub fn set_single(&mut self, value: SingleMode) {
        self.options.single = value;
        self.emit_idle(IdleKind::Options);
    }

    pub fn set_crossfade(&mut self, seconds: f32) {
        self.options.crossfade_seconds = seconds.max(0.0);
        self.emit_idle(IdleKind::Options);
    }

    pub fn set_volume(&mut self, volume: u8) -> Result<(), crate::error::AckError> {
        self.player_control.set_volume(volume).map_err(crate::error::AckError::system)?;
        self.emit_idle(IdleKind::Mixer);
        Ok(())
    }

    /// Reconciles queue position with the engine's own report after any
    /// player event; called from `PlayerControl::on_player_sync`.
    pub fn sync_with_player(&mut self) {
        let status = self.player_control.status();
        if status.state == PlayState::Stop {
            self.current_position = None;
        }
        self.emit_idle(IdleKind::Player);
    }

    pub fn current_position(&self) -> Option<u32> {
        self.current_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player_control::NullPlayerControl;
    use camino::Utf8PathBuf;

    fn partition() -> Partition {
        Partition::new("default", Arc::new(NullPlayerControl::new()), 1000)
    }

    #[test]
    fn play_position_sets_current_and_emits_player_idle() {
        let mut p = partition();
        p.queue.append_uri(Utf8PathBuf::from("a")).unwrap();
        p.play_position(0).unwrap();
        assert_eq!(p.current_position(), Some(0));
        let mask = p.idle_local.take();
        assert!(mask.contains(IdleKind::Player.into()));
    }

    #[test]
    fn next_without_consume_advances_one_position() {
        let mut p = partition();
        p.queue.append_uri(Utf8PathBuf::from("a")).unwrap();
        p.queue.append_uri(Utf8PathBuf::from("b")).unwrap();
        p.play_position(0).unwrap();
        p.next().unwrap();
        assert_eq!(p.current_position(), Some(1));
    }

    #[test]
    fn next_past_end_without_repeat_stops() {
        let mut p = partition();
        p.queue.append_uri(Utf8PathBuf::from("a")).unwrap();
        p.play_position(0).unwrap();
        p.next().unwrap();
        assert_eq!(p.current_position(), None);
    }

    #[test]
    fn next_with_consume_removes_the_played_entry() {
        let mut p = partition();
        p.queue.append_uri(Utf8PathBuf::from("a")).unwrap();
        p.queue.append_uri(Utf8PathBuf::from("b")).unwrap();
        p.set_consume(true);
        p.play_position(0).unwrap();
        p.next().unwrap();
        assert_eq!(p.queue.len(), 1);
        assert_eq!(p.current_position(), Some(0));
    }
}
