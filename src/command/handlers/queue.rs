//! `add`/`move`/`delete` and friends: everything that reads or mutates the
//! active partition's queue.

use std::sync::Arc;

use camino::Utf8PathBuf;

use crate::command::{ok_result, CommandResult, Context};
use crate::database::Database;
use crate::error::AckError;
use crate::protocol::request::{self, PosOrRange, Position, Range};
use crate::protocol::response::Response;
use crate::queue::{QueueEntry, QueueId};

fn render_entry(database: &Option<Arc<dyn Database>>, response: &mut Response, position: u32, entry: &QueueEntry) {
    response.pair("file", entry.uri.as_str());
    response.pair("Pos", position);
    response.pair("Id", entry.id.0);
    if entry.priority > 0 {
        response.pair("Prio", entry.priority);
    }
    if let Some(song) = database.as_ref().and_then(|db| db.lookup(&entry.uri)) {
        for (tag, value) in &song.tags {
            response.pair(&tag.to_string(), value);
        }
        if let Some(duration) = song.duration_seconds {
            response.pair("duration", duration);
        }
    }
}

fn current_position(ctx: &Context) -> Option<u32> {
    ctx.instance.partition(&ctx.session.partition_name).and_then(|p| p.current_position())
}

pub fn add(ctx: &mut Context) -> CommandResult {
    let uri = Utf8PathBuf::from(ctx.args.first().map(String::as_str).unwrap_or(""));
    let position = match ctx.args.get(1) {
        Some(raw) => match Position::parse(raw).and_then(|p| p.resolve(current_position(ctx))) {
            Ok(p) => Some(p),
            Err(err) => return CommandResult::Error(err),
        },
        None => None,
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let result = match position {
        Some(pos) => partition.queue.insert_at(uri, pos).map(|_| ()),
        None => partition.queue.append_uri(uri).map(|_| ()),
    };
    match result {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn addid(ctx: &mut Context) -> CommandResult {
    let uri = Utf8PathBuf::from(ctx.args.first().map(String::as_str).unwrap_or(""));
    let position = match ctx.args.get(1) {
        Some(raw) => match Position::parse(raw).and_then(|p| p.resolve(current_position(ctx))) {
            Ok(p) => Some(p),
            Err(err) => return CommandResult::Error(err),
        },
        None => None,
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let result = match position {
        Some(pos) => partition.queue.insert_at(uri, pos),
        None => partition.queue.append_uri(uri),
    };
    match result {
        Ok(id) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(move |r| r.pair("Id", id.0))
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn clear(ctx: &mut Context) -> CommandResult {
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    partition.stop();
    partition.queue.clear();
    partition.emit_idle(crate::idle::IdleKind::Playlist);
    ok_result(|_| {})
}

/// `delete {POS|START:END}`: unlike `move`'s destination argument, the
/// position here is absolute-only — `-N` is a negative-number argument
/// error, not "N before the current song".
pub fn delete(ctx: &mut Context) -> CommandResult {
    let range = match ctx.arg(0).and_then(Range::parse) {
        Ok(r) => r,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.queue.delete_range(range) {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn deleteid(ctx: &mut Context) -> CommandResult {
    let id = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => QueueId(n),
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.queue.delete_id(id) {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn move_cmd(ctx: &mut Context) -> CommandResult {
    let selector = match ctx.arg(0).and_then(PosOrRange::parse) {
        Ok(s) => s,
        Err(err) => return CommandResult::Error(err),
    };
    let dest = match ctx.arg(1).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    let current = current_position(ctx);
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let range = match selector {
        PosOrRange::Range(r) => r,
        PosOrRange::Position(p) => match p.resolve(current) {
            Ok(n) => Range::single_index(n),
            Err(err) => return CommandResult::Error(err),
        },
    };
    match partition.queue.move_range(range, dest) {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn moveid(ctx: &mut Context) -> CommandResult {
    let id = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => QueueId(n),
        Err(err) => return CommandResult::Error(err),
    };
    let dest = match ctx.arg(1).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let Some(pos) = partition.queue.position_of(id) else {
        return CommandResult::Error(AckError::no_exist(format!("No such song id: {}", id.0)));
    };
    match partition.queue.move_range(Range::single_index(pos), dest) {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn swap(ctx: &mut Context) -> CommandResult {
    let a = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    let b = match ctx.arg(1).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.queue.swap_positions(a, b) {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn swapid(ctx: &mut Context) -> CommandResult {
    let a = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => QueueId(n),
        Err(err) => return CommandResult::Error(err),
    };
    let b = match ctx.arg(1).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => QueueId(n),
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.queue.swap_ids(a, b) {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn shuffle(ctx: &mut Context) -> CommandResult {
    let range = match ctx.args.first() {
        Some(raw) => match Range::parse(raw) {
            Ok(r) => Some(r),
            Err(err) => return CommandResult::Error(err),
        },
        None => None,
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.queue.shuffle(range) {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn prio(ctx: &mut Context) -> CommandResult {
    let priority = match ctx.arg(0).and_then(|s| request::parse_uint(s, Some(255))) {
        Ok(n) => n as u8,
        Err(err) => return CommandResult::Error(err),
    };
    let range = match ctx.arg(1).and_then(Range::parse) {
        Ok(r) => r,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.queue.set_priority_range(range, priority) {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn prioid(ctx: &mut Context) -> CommandResult {
    let priority = match ctx.arg(0).and_then(|s| request::parse_uint(s, Some(255))) {
        Ok(n) => n as u8,
        Err(err) => return CommandResult::Error(err),
    };
    let ids: Result<Vec<QueueId>, AckError> =
        ctx.args[1..].iter().map(|s| request::parse_uint(s, None).map(QueueId)).collect();
    let ids = match ids {
        Ok(ids) => ids,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    for id in ids {
        if let Err(err) = partition.queue.set_priority_id(id, priority) {
            return CommandResult::Error(err);
        }
    }
    partition.emit_idle(crate::idle::IdleKind::Playlist);
    ok_result(|_| {})
}

pub fn rangeid(ctx: &mut Context) -> CommandResult {
    let id = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => QueueId(n),
        Err(err) => return CommandResult::Error(err),
    };
    let window = match ctx.arg(1) {
        Ok("") => None,
        Ok(raw) => {
            let Some((start, end)) = raw.split_once(':') else {
                return CommandResult::Error(AckError::arg("Bad range"));
            };
            let start = match request::parse_song_time(start) {
                Ok(v) => v,
                Err(err) => return CommandResult::Error(err),
            };
            let end = if end.is_empty() {
                None
            } else {
                match request::parse_song_time(end) {
                    Ok(v) => Some(v),
                    Err(err) => return CommandResult::Error(err),
                }
            };
            Some((start, end))
        }
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.queue.set_range_id(id, window) {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn addtagid(ctx: &mut Context) -> CommandResult {
    let id = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => QueueId(n),
        Err(err) => return CommandResult::Error(err),
    };
    let tag = match ctx.arg(1) {
        Ok(t) => t.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let value = match ctx.arg(2) {
        Ok(v) => v.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.queue.set_tag_id(id, Some(format!("{tag}={value}"))) {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn cleartagid(ctx: &mut Context) -> CommandResult {
    let id = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => QueueId(n),
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.queue.set_tag_id(id, None) {
        Ok(()) => {
            partition.emit_idle(crate::idle::IdleKind::Playlist);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn playlist(ctx: &mut Context) -> CommandResult {
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let mut response = Response::new();
    for entry in partition.queue.iter() {
        response.pair("file", entry.uri.as_str());
    }
    CommandResult::Ok(response)
}

pub fn playlistinfo(ctx: &mut Context) -> CommandResult {
    let selector = match ctx.args.first() {
        Some(raw) => match PosOrRange::parse(raw) {
            Ok(s) => Some(s),
            Err(err) => return CommandResult::Error(err),
        },
        None => None,
    };
    let current = current_position(ctx);
    let database = ctx.instance.database.clone();
    let Some(partition) = ctx.instance.partition(&ctx.session.partition_name) else {
        return CommandResult::Error(AckError::system("session's partition no longer exists"));
    };
    let range = match selector {
        None => Range::full(),
        Some(PosOrRange::Range(r)) => r,
        Some(PosOrRange::Position(p)) => match p.resolve(current) {
            Ok(n) => Range::single_index(n),
            Err(err) => return CommandResult::Error(err),
        },
    };
    let (start, end) = match range.resolve(partition.queue.len() as u32) {
        Ok(r) => r,
        Err(err) => return CommandResult::Error(err),
    };
    let mut response = Response::new();
    for (pos, entry) in partition.queue.iter().enumerate().skip(start as usize).take((end - start) as usize) {
        render_entry(&database, &mut response, pos as u32, entry);
    }
    CommandResult::Ok(response)
}

pub fn playlistid(ctx: &mut Context) -> CommandResult {
    let id = match ctx.args.first() {
        Some(raw) => match request::parse_uint(raw, None) {
            Ok(n) => Some(QueueId(n)),
            Err(err) => return CommandResult::Error(err),
        },
        None => None,
    };
    let database = ctx.instance.database.clone();
    let Some(partition) = ctx.instance.partition(&ctx.session.partition_name) else {
        return CommandResult::Error(AckError::system("session's partition no longer exists"));
    };
    let mut response = Response::new();
    match id {
        Some(id) => {
            let Some(pos) = partition.queue.position_of(id) else {
                return CommandResult::Error(AckError::no_exist(format!("No such song id: {}", id.0)));
            };
            let entry = partition.queue.by_id(id).unwrap();
            render_entry(&database, &mut response, pos, entry);
        }
        None => {
            for (pos, entry) in partition.queue.iter().enumerate() {
                render_entry(&database, &mut response, pos as u32, entry);
            }
        }
    }
    CommandResult::Ok(response)
}

pub fn playlistfind(ctx: &mut Context) -> CommandResult {
    search_queue(ctx, |haystack, needle| haystack == needle)
}

pub fn playlistsearch(ctx: &mut Context) -> CommandResult {
    search_queue(ctx, |haystack, needle| haystack.to_lowercase().contains(&needle.to_lowercase()))
}

fn search_queue(ctx: &mut Context, matches: impl Fn(&str, &str) -> bool) -> CommandResult {
    if ctx.args.len() < 2 {
        return CommandResult::Error(AckError::arg("too few arguments"));
    }
    let needle = ctx.args[1].clone();
    let database = ctx.instance.database.clone();
    let Some(partition) = ctx.instance.partition(&ctx.session.partition_name) else {
        return CommandResult::Error(AckError::system("session's partition no longer exists"));
    };
    let mut response = Response::new();
    for (pos, entry) in partition.queue.iter().enumerate() {
        if matches(entry.uri.as_str(), &needle) {
            render_entry(&database, &mut response, pos as u32, entry);
        }
    }
    CommandResult::Ok(response)
}

pub fn plchanges(ctx: &mut Context) -> CommandResult {
    changes(ctx, false)
}

pub fn plchangesposid(ctx: &mut Context) -> CommandResult {
    changes(ctx, true)
}

fn changes(ctx: &mut Context, posid_only: bool) -> CommandResult {
    let since = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    let window = match ctx.args.get(1) {
        Some(raw) => match Range::parse(raw) {
            Ok(r) => Some(r),
            Err(err) => return CommandResult::Error(err),
        },
        None => None,
    };
    let database = ctx.instance.database.clone();
    let Some(partition) = ctx.instance.partition(&ctx.session.partition_name) else {
        return CommandResult::Error(AckError::system("session's partition no longer exists"));
    };
    let changed = match partition.queue.changes_since(since, window) {
        Ok(v) => v,
        Err(err) => return CommandResult::Error(err),
    };
    let mut response = Response::new();
    for (pos, entry) in changed {
        if posid_only {
            response.pair("cpos", pos);
            response.pair("Id", entry.id.0);
        } else {
            render_entry(&database, &mut response, pos, entry);
        }
    }
    CommandResult::Ok(response)
}
