//! Stored-playlist commands: `load`/`save` bridge to the active queue,
//! the rest manipulate a named playlist directly.

use camino::Utf8PathBuf;

use crate::command::{ok_result, CommandResult, Context};
use crate::error::AckError;
use crate::idle::IdleKind;
use crate::protocol::request;

pub fn listplaylists(ctx: &mut Context) -> CommandResult {
    let names: Vec<String> = ctx.instance.stored_playlists.names().map(str::to_string).collect();
    ok_result(move |response| {
        for name in names {
            response.pair("playlist", name.as_str());
        }
    })
}

pub fn listplaylist(ctx: &mut Context) -> CommandResult {
    let name = match ctx.arg(0) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    match ctx.instance.stored_playlists.get(name) {
        Ok(entries) => {
            let entries = entries.to_vec();
            ok_result(move |response| {
                for uri in &entries {
                    response.pair("file", uri.as_str());
                }
            })
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn listplaylistinfo(ctx: &mut Context) -> CommandResult {
    let name = match ctx.arg(0) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    let database = ctx.instance.database.clone();
    let entries = match ctx.instance.stored_playlists.get(name) {
        Ok(entries) => entries.to_vec(),
        Err(err) => return CommandResult::Error(err),
    };
    ok_result(move |response| {
        for uri in &entries {
            response.pair("file", uri.as_str());
            if let Some(song) = database.as_ref().and_then(|db| db.lookup(uri)) {
                for (tag, value) in &song.tags {
                    response.pair(&tag.to_string(), value);
                }
                if let Some(duration) = song.duration_seconds {
                    response.pair("duration", duration);
                }
            }
        }
    })
}

/// `load NAME [RANGE]`: appends the stored playlist's entries (or a window
/// of them) onto the active queue.
pub fn load(ctx: &mut Context) -> CommandResult {
    let name = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let range = match ctx.args.get(1) {
        Some(raw) => match crate::protocol::request::Range::parse(raw) {
            Ok(r) => Some(r),
            Err(err) => return CommandResult::Error(err),
        },
        None => None,
    };
    let entries = match ctx.instance.stored_playlists.get(&name) {
        Ok(entries) => entries.to_vec(),
        Err(err) => return CommandResult::Error(err),
    };
    let (start, end) = match range {
        Some(r) => match r.resolve(entries.len() as u32) {
            Ok(bounds) => bounds,
            Err(err) => return CommandResult::Error(err),
        },
        None => (0, entries.len() as u32),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    for uri in &entries[start as usize..end as usize] {
        if let Err(err) = partition.queue.append_uri(uri.clone()) {
            return CommandResult::Error(err);
        }
    }
    partition.emit_idle(IdleKind::Playlist);
    ok_result(|_| {})
}

/// `save NAME [MODE]`: snapshots the active queue into a stored playlist.
/// `MODE` (`create`/`append`/`replace`) is accepted but the core only ever
/// has one playlist per name, so `append` and `replace` behave the same.
pub fn save(ctx: &mut Context) -> CommandResult {
    let name = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let entries: Vec<Utf8PathBuf> = partition.queue.iter().map(|e| e.uri.clone()).collect();
    ctx.instance.stored_playlists.save(name, entries);
    ctx.instance.emit_idle(IdleKind::StoredPlaylist);
    ok_result(|_| {})
}

pub fn rm(ctx: &mut Context) -> CommandResult {
    let name = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    match ctx.instance.stored_playlists.rm(&name) {
        Ok(()) => {
            ctx.instance.emit_idle(IdleKind::StoredPlaylist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn rename(ctx: &mut Context) -> CommandResult {
    let from = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let to = match ctx.arg(1) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    match ctx.instance.stored_playlists.rename(&from, &to) {
        Ok(()) => {
            ctx.instance.emit_idle(IdleKind::StoredPlaylist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn playlistadd(ctx: &mut Context) -> CommandResult {
    let name = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let uri = match ctx.arg(1) {
        Ok(u) => Utf8PathBuf::from(u),
        Err(err) => return CommandResult::Error(err),
    };
    ctx.instance.stored_playlists.add(&name, uri);
    ctx.instance.emit_idle(IdleKind::StoredPlaylist);
    ok_result(|_| {})
}

pub fn playlistclear(ctx: &mut Context) -> CommandResult {
    let name = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    ctx.instance.stored_playlists.clear(&name);
    ctx.instance.emit_idle(IdleKind::StoredPlaylist);
    ok_result(|_| {})
}

pub fn playlistdelete(ctx: &mut Context) -> CommandResult {
    let name = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let position = match ctx.arg(1).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    match ctx.instance.stored_playlists.delete_position(&name, position) {
        Ok(()) => {
            ctx.instance.emit_idle(IdleKind::StoredPlaylist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn playlistmove(ctx: &mut Context) -> CommandResult {
    let name = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let from = match ctx.arg(1).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    let to = match ctx.arg(2).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    match ctx.instance.stored_playlists.move_entry(&name, from, to) {
        Ok(()) => {
            ctx.instance.emit_idle(IdleKind::StoredPlaylist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}
