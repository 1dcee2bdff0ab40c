//! Playback engine handle. The engine itself (decoders, output plugins,
//! ring buffers) is out of scope; the core only needs the small surface a
//! `Partition` calls to drive transport state and the three callbacks the
//! engine uses to report back.

use std::sync::Arc;

use camino::Utf8PathBuf;

use crate::idle::MaskMonitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Stop,
    Play,
    Pause,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerStatus {
    pub state: PlayState,
    pub current_song: Option<u32>,
    pub elapsed_seconds: f64,
    pub duration_seconds: Option<f64>,
    pub bitrate_kbps: Option<u32>,
    pub audio_format: Option<String>,
    pub volume: Option<u8>,
    pub error: Option<String>,
}

/// The capability surface a `Partition` drives. A production engine would
/// own decoder and output-plugin threads behind this; for the in-repo tests
/// a simple in-memory stand-in satisfies it.
pub trait PlayerControl: Send + Sync {
    fn status(&self) -> PlayerStatus;
    fn play(&self, song_id: u32, uri: &Utf8PathBuf) -> Result<(), String>;
    fn pause(&self, pause: bool);
    fn stop(&self);
    fn seek(&self, seconds: f64) -> Result<(), String>;
    fn set_volume(&self, volume: u8) -> Result<(), String>;

    /// Called back by the engine (from its own thread) on any state change.
    /// The default forwards into the partition's `global_events` monitor,
    /// which is the only cross-thread contract the core imposes.
    fn on_player_sync(&self, events: &Arc<MaskMonitor>) {
        events.or_mask(crate::idle::IdleKind::Player.into());
    }
}

/// Minimal engine used by tests and as a development stand-in: tracks state
/// transitions but performs no real audio I/O.
#[derive(Debug, Default)]
pub struct NullPlayerControl {
    status: std::sync::Mutex<PlayerStatus>,
}

impl NullPlayerControl {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayerControl for NullPlayerControl {
    fn status(&self) -> PlayerStatus {
        self.status.lock().unwrap().clone()
    }

    fn play(&self, song_id: u32, _uri: &Utf8PathBuf) -> Result<(), String> {
        let mut status = self.status.lock().unwrap();
        status.state = PlayState::Play;
        status.current_song = Some(song_id);
        status.elapsed_seconds = 0.0;
        Ok(())
    }

    fn pause(&self, pause: bool) {
        let mut status = self.status.lock().unwrap();
        if status.state != PlayState::Stop {
            status.state = if pause { PlayState::Pause } else { PlayState::Play };
        }
    }

    fn stop(&self) {
        let mut status = self.status.lock().unwrap();
        status.state = PlayState::Stop;
        status.current_song = None;
    }

    fn seek(&self, seconds: f64) -> Result<(), String> {
        let mut status = self.status.lock().unwrap();
        if status.state == PlayState::Stop {
            return Err("Not playing".into());
        }
        status.elapsed_seconds = seconds;
        Ok(())
    }

    fn set_volume(&self, volume: u8) -> Result<(), String> {
        if volume > 100 {
            return Err("Invalid volume value".into());
        }
        self.status.lock().unwrap().volume = Some(volume);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_then_stop_clears_current_song() {
        let player = NullPlayerControl::new();
        player.play(7, &Utf8PathBuf::from("a.flac")).unwrap();
        assert_eq!(player.status().current_song, Some(7));
        player.stop();
        assert_eq!(player.status().current_song, None);
        assert_eq!(player.status().state, PlayState::Stop);
    }

    #[test]
    fn set_volume_rejects_out_of_range() {
        let player = NullPlayerControl::new();
        assert!(player.set_volume(101).is_err());
        assert!(player.set_volume(50).is_ok());
    }
}
