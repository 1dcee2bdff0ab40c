//! Idle/event bus: coalesced change-kind bitmask with task-safe `or_mask`.
//! The whole daemon is single-threaded async (one `tokio` task per
//! partition's command handling), so "any thread may post" becomes "any
//! task may post" here; the monitor still uses an atomic so a background
//! worker (sticker cleanup, prefetch) posted from a spawned task can OR bits
//! in without taking a lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleKind {
    Database,
    StoredPlaylist,
    Playlist,
    Player,
    Mixer,
    Output,
    Options,
    Sticker,
    Update,
    Subscription,
    Message,
    Neighbor,
    Mount,
    Partition,
}

impl IdleKind {
    pub const COUNT: u32 = 14;

    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            IdleKind::Database => "database",
            IdleKind::StoredPlaylist => "stored_playlist",
            IdleKind::Playlist => "playlist",
            IdleKind::Player => "player",
            IdleKind::Mixer => "mixer",
            IdleKind::Output => "output",
            IdleKind::Options => "options",
            IdleKind::Sticker => "sticker",
            IdleKind::Update => "update",
            IdleKind::Subscription => "subscription",
            IdleKind::Message => "message",
            IdleKind::Neighbor => "neighbor",
            IdleKind::Mount => "mount",
            IdleKind::Partition => "partition",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        IdleKind::iter().find(|k| k.wire_name() == name)
    }
}

/// Bitmask of [`IdleKind`] values. Plain newtype, all arithmetic is bit
/// arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdleMask(u32);

impl IdleMask {
    pub const EMPTY: IdleMask = IdleMask(0);

    pub fn all() -> IdleMask {
        IdleKind::iter().fold(IdleMask::EMPTY, |m, k| m | k.into())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: IdleMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn remove(&mut self, other: IdleMask) {
        self.0 &= !other.0;
    }

    pub fn intersection(self, other: IdleMask) -> IdleMask {
        IdleMask(self.0 & other.0)
    }

    pub fn kinds(self) -> impl Iterator<Item = IdleKind> {
        IdleKind::iter().filter(move |k| self.0 & k.bit() != 0)
    }
}

impl From<IdleKind> for IdleMask {
    fn from(k: IdleKind) -> Self {
        IdleMask(k.bit())
    }
}

impl std::ops::BitOr for IdleMask {
    type Output = IdleMask;
    fn bitor(self, rhs: Self) -> Self::Output {
        IdleMask(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for IdleMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Coalesces `or_mask` calls from any task and wakes exactly one dispatch per
/// non-empty accumulation; no bit posted is ever lost, even across awaits.
///
/// Rather than scheduling a one-shot callback the first time the mask goes
/// non-zero, the dispatch side simply `await`s a drained, non-empty
/// snapshot — idiomatic for `tokio`. Every `or_mask` call is guaranteed to be
/// covered by the *next* `recv` that returns after it happened, because
/// `or_mask` always OR's before notifying, and `recv` always
/// drains-then-checks after waking.
#[derive(Debug)]
pub struct MaskMonitor {
    mask: AtomicU32,
    notify: Notify,
}

impl MaskMonitor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { mask: AtomicU32::new(0), notify: Notify::new() })
    }

    /// Safe from any task. Returns the mask that was accumulated before this
    /// call (so callers can tell whether they were the one to transition
    /// zero -> non-zero, though no current caller needs that).
    pub fn or_mask(&self, bits: IdleMask) {
        if bits.is_empty() {
            return;
        }
        self.mask.fetch_or(mask_to_u32(bits), Ordering::AcqRel);
        self.notify.notify_waiters();
    }

    /// Waits until the mask is non-empty, then atomically reads-and-clears it
    /// and returns the snapshot. Coalesces: any number of `or_mask` calls
    /// between two `recv` calls produce exactly one snapshot that is their OR.
    pub async fn recv(&self) -> IdleMask {
        loop {
            let notified = self.notify.notified();
            let snapshot = self.mask.swap(0, Ordering::AcqRel);
            if snapshot != 0 {
                return u32_to_mask(snapshot);
            }
            notified.await;
        }
    }

    /// Non-blocking peek-and-clear, used when a client re-enters `idle` and
    /// might already have pending bits from before it started waiting.
    pub fn take(&self) -> IdleMask {
        u32_to_mask(self.mask.swap(0, Ordering::AcqRel))
    }
}

fn mask_to_u32(mask: IdleMask) -> u32 {
    // IdleMask's single field is private to this module; reach through the
    // public bit iterator instead of exposing internals crate-wide.
    mask.kinds().fold(0, |acc, k| acc | k.bit())
}

fn u32_to_mask(bits: u32) -> IdleMask {
    IdleKind::iter().filter(|k| bits & k.bit() != 0).fold(IdleMask::EMPTY, |m, k| m | k.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn coalesces_concurrent_or_masks() {
        let monitor = MaskMonitor::new();
        monitor.or_mask(IdleKind::Playlist.into());
        monitor.or_mask(IdleKind::Player.into());
        let snapshot = monitor.recv().await;
        assert!(snapshot.contains(IdleKind::Playlist.into()));
        assert!(snapshot.contains(IdleKind::Player.into()));
        assert!(!snapshot.contains(IdleKind::Mixer.into()));
    }

    #[tokio::test]
    async fn no_bit_is_lost_across_await_points() {
        let monitor = MaskMonitor::new();
        let waiter = tokio::spawn({
            let monitor = Arc::clone(&monitor);
            async move { monitor.recv().await }
        });
        tokio::task::yield_now().await;
        monitor.or_mask(IdleKind::Update.into());
        let snapshot = waiter.await.unwrap();
        assert!(snapshot.contains(IdleKind::Update.into()));
    }

    #[test]
    fn wire_names_round_trip() {
        for kind in IdleKind::iter() {
            assert_eq!(IdleKind::from_wire_name(kind.wire_name()), Some(kind));
        }
    }
}
