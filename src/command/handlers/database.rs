//! The music database surface: search/browse queries, the mount table, and
//! the two binary-chunked lookups (`albumart`/`readpicture`) that lean on
//! the prefetch cache.

use camino::Utf8PathBuf;

use crate::command::{ok_result, CommandResult, Context};
use crate::database::SongInfo;
use crate::error::AckError;
use crate::idle::IdleKind;
use crate::protocol::query::{Filter, Query, QueryNode};
use crate::protocol::request;
use crate::protocol::response::Response;
use crate::protocol::Tag;

fn parse_tag(name: &str) -> Result<Tag, AckError> {
    use std::str::FromStr;
    Tag::from_str(name).map_err(|_| AckError::arg(format!("Unknown tag type: {name}")))
}

/// Builds a `Query` from the flat `TAG VALUE [TAG VALUE ...]` argument form
/// `find`/`search`/`count` share, ANDing every pair together.
fn query_from_pairs(args: &[String], contains: bool) -> Result<Query, AckError> {
    if args.len() % 2 != 0 {
        return Err(AckError::arg("incorrect arguments"));
    }
    let mut nodes = Vec::new();
    for pair in args.chunks(2) {
        let [tag_name, needle] = pair else { unreachable!() };
        if tag_name.eq_ignore_ascii_case("file") || tag_name.eq_ignore_ascii_case("filename") {
            nodes.push(QueryNode::Filter(Filter::PathEqual(Utf8PathBuf::from(needle.as_str()))));
            continue;
        }
        if tag_name.eq_ignore_ascii_case("base") {
            nodes.push(QueryNode::Filter(Filter::ParentPathEquals(Utf8PathBuf::from(needle.as_str()))));
            continue;
        }
        let tag = parse_tag(tag_name)?;
        let filter = if contains {
            Filter::TagContains { tag, needle: needle.clone() }
        } else {
            Filter::TagEqual { tag, needle: needle.clone() }
        };
        nodes.push(QueryNode::Filter(filter));
    }
    Ok(if nodes.len() == 1 {
        Query { root: Some(nodes.into_iter().next().unwrap()) }
    } else {
        Query::and(nodes)
    })
}

fn render_song(response: &mut Response, song: &SongInfo) {
    response.pair("file", song.uri.as_str());
    if let Some(duration) = song.duration_seconds {
        response.pair("duration", duration);
    }
    for (tag, value) in &song.tags {
        response.pair(&tag.to_string(), value);
    }
}

fn require_database(ctx: &Context) -> Result<std::sync::Arc<dyn crate::database::Database>, AckError> {
    ctx.instance.database.clone().ok_or_else(|| AckError::no_exist("No database"))
}

pub fn find(ctx: &mut Context) -> CommandResult {
    let query = match query_from_pairs(ctx.args, false) {
        Ok(q) => q,
        Err(err) => return CommandResult::Error(err),
    };
    let database = match require_database(ctx) {
        Ok(db) => db,
        Err(err) => return CommandResult::Error(err),
    };
    ok_result(|response| {
        for song in database.find(&query) {
            render_song(response, &song);
        }
    })
}

pub fn search(ctx: &mut Context) -> CommandResult {
    let query = match query_from_pairs(ctx.args, true) {
        Ok(q) => q,
        Err(err) => return CommandResult::Error(err),
    };
    let database = match require_database(ctx) {
        Ok(db) => db,
        Err(err) => return CommandResult::Error(err),
    };
    ok_result(|response| {
        for song in database.find(&query) {
            render_song(response, &song);
        }
    })
}

pub fn count(ctx: &mut Context) -> CommandResult {
    let query = match query_from_pairs(ctx.args, false) {
        Ok(q) => q,
        Err(err) => return CommandResult::Error(err),
    };
    let database = match require_database(ctx) {
        Ok(db) => db,
        Err(err) => return CommandResult::Error(err),
    };
    let songs = database.find(&query);
    let playtime: f64 = songs.iter().filter_map(|s| s.duration_seconds).sum();
    ok_result(move |response| {
        response.pair("songs", songs.len());
        response.pair("playtime", playtime as u64);
    })
}

pub fn findadd(ctx: &mut Context) -> CommandResult {
    let query = match query_from_pairs(ctx.args, false) {
        Ok(q) => q,
        Err(err) => return CommandResult::Error(err),
    };
    add_matches_to_queue(ctx, query)
}

pub fn searchadd(ctx: &mut Context) -> CommandResult {
    let query = match query_from_pairs(ctx.args, true) {
        Ok(q) => q,
        Err(err) => return CommandResult::Error(err),
    };
    add_matches_to_queue(ctx, query)
}

pub fn searchaddpl(ctx: &mut Context) -> CommandResult {
    let Some((name, rest)) = ctx.args.split_first() else {
        return CommandResult::Error(AckError::arg("too few arguments"));
    };
    let name = name.clone();
    let query = match query_from_pairs(rest, true) {
        Ok(q) => q,
        Err(err) => return CommandResult::Error(err),
    };
    let database = match require_database(ctx) {
        Ok(db) => db,
        Err(err) => return CommandResult::Error(err),
    };
    for song in database.find(&query) {
        ctx.instance.stored_playlists.add(&name, song.uri);
    }
    ctx.instance.emit_idle(IdleKind::StoredPlaylist);
    ok_result(|_| {})
}

fn add_matches_to_queue(ctx: &mut Context, query: Query) -> CommandResult {
    let database = match require_database(ctx) {
        Ok(db) => db,
        Err(err) => return CommandResult::Error(err),
    };
    let songs = database.find(&query);
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    for song in &songs {
        if let Err(err) = partition.queue.append_uri(song.uri.clone()) {
            return CommandResult::Error(err);
        }
    }
    partition.emit_idle(IdleKind::Playlist);
    ok_result(|_| {})
}

pub fn list(ctx: &mut Context) -> CommandResult {
    let Some((tag_name, rest)) = ctx.args.split_first() else {
        return CommandResult::Error(AckError::arg("too few arguments"));
    };
    let tag = match parse_tag(tag_name) {
        Ok(t) => t,
        Err(err) => return CommandResult::Error(err),
    };
    let query = match query_from_pairs(rest, false) {
        Ok(q) => q,
        Err(err) => return CommandResult::Error(err),
    };
    let database = match require_database(ctx) {
        Ok(db) => db,
        Err(err) => return CommandResult::Error(err),
    };
    let mut values: Vec<String> = database
        .find(&query)
        .into_iter()
        .flat_map(|s| s.tags.into_iter())
        .filter(|(t, _)| *t == tag)
        .map(|(_, v)| v)
        .collect();
    values.sort();
    values.dedup();
    let tag_name = tag.to_string();
    ok_result(move |response| {
        for value in values {
            response.pair(&tag_name, value);
        }
    })
}

fn listing(ctx: &mut Context, with_tags: bool) -> CommandResult {
    let prefix = ctx.args.first().cloned().unwrap_or_default();
    let database = match require_database(ctx) {
        Ok(db) => db,
        Err(err) => return CommandResult::Error(err),
    };
    let query = Query::empty();
    let songs: Vec<_> = database
        .find(&query)
        .into_iter()
        .filter(|s| s.uri.as_str().starts_with(&prefix))
        .collect();
    ok_result(move |response| {
        for song in songs {
            if with_tags {
                render_song(response, &song);
            } else {
                response.pair("file", song.uri.as_str());
            }
        }
    })
}

pub fn listall(ctx: &mut Context) -> CommandResult {
    listing(ctx, false)
}

pub fn listallinfo(ctx: &mut Context) -> CommandResult {
    listing(ctx, true)
}

pub fn lsinfo(ctx: &mut Context) -> CommandResult {
    listing(ctx, true)
}

pub fn listfiles(ctx: &mut Context) -> CommandResult {
    listing(ctx, false)
}

pub fn stats(ctx: &mut Context) -> CommandResult {
    let database = match require_database(ctx) {
        Ok(db) => db,
        Err(err) => return CommandResult::Error(err),
    };
    let stats = database.stats();
    ok_result(move |response| {
        response.pair("artists", stats.artist_count);
        response.pair("albums", stats.album_count);
        response.pair("songs", stats.song_count);
        response.pair("db_playtime", stats.db_playtime_seconds);
        if let Some(last_update) = stats.last_update {
            response.pair("db_update", last_update.as_second());
        }
    })
}

pub fn update(ctx: &mut Context) -> CommandResult {
    schedule_update(ctx, false)
}

pub fn rescan(ctx: &mut Context) -> CommandResult {
    schedule_update(ctx, true)
}

fn schedule_update(ctx: &mut Context, rescan: bool) -> CommandResult {
    let path = ctx.args.first().map(|s| Utf8PathBuf::from(s.as_str()));
    let database = match require_database(ctx) {
        Ok(db) => db,
        Err(err) => return CommandResult::Error(err),
    };
    match database.schedule_update(path.as_ref(), rescan) {
        Ok(job_id) => {
            ctx.instance.emit_idle(IdleKind::Update);
            ok_result(move |r| r.pair("updating_db", job_id))
        }
        Err(message) => CommandResult::Error(AckError::new(crate::error::AckCode::UpdateAlready, message)),
    }
}

pub fn readcomments(ctx: &mut Context) -> CommandResult {
    let uri = match ctx.arg(0) {
        Ok(u) => Utf8PathBuf::from(u),
        Err(err) => return CommandResult::Error(err),
    };
    let database = match require_database(ctx) {
        Ok(db) => db,
        Err(err) => return CommandResult::Error(err),
    };
    let Some(song) = database.lookup(&uri) else {
        return CommandResult::Error(AckError::no_exist("No such song"));
    };
    ok_result(move |response| {
        for (tag, value) in &song.tags {
            response.pair(&tag.to_string(), value);
        }
    })
}

pub fn listmounts(ctx: &mut Context) -> CommandResult {
    ok_result(|response| {
        for (mount_point, storage) in &ctx.instance.mounts {
            response.pair("mount", mount_point.as_str());
            response.pair("storage", storage.as_str());
        }
    })
}

pub fn mount(ctx: &mut Context) -> CommandResult {
    let mount_point = match ctx.arg(0) {
        Ok(m) => Utf8PathBuf::from(m),
        Err(err) => return CommandResult::Error(err),
    };
    let storage = match ctx.arg(1) {
        Ok(s) => s.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    if ctx.instance.mounts.iter().any(|(m, _)| *m == mount_point) {
        return CommandResult::Error(AckError::new(crate::error::AckCode::Exist, "Mount point already exists"));
    }
    ctx.instance.mounts.push((mount_point, storage));
    ctx.instance.emit_idle(IdleKind::Mount);
    ok_result(|_| {})
}

pub fn unmount(ctx: &mut Context) -> CommandResult {
    let mount_point = match ctx.arg(0) {
        Ok(m) => Utf8PathBuf::from(m),
        Err(err) => return CommandResult::Error(err),
    };
    let before = ctx.instance.mounts.len();
    ctx.instance.mounts.retain(|(m, _)| *m != mount_point);
    if ctx.instance.mounts.len() == before {
        return CommandResult::Error(AckError::no_exist("No such mount point"));
    }
    ctx.instance.emit_idle(IdleKind::Mount);
    ok_result(|_| {})
}

/// Fetches embedded album art for `uri` at byte `offset`, chunked to the
/// session's negotiated `binary_limit`. The input cache backs repeat reads
/// of the same track's art during a single playback.
pub fn albumart(ctx: &mut Context) -> CommandResult {
    binary_fetch(ctx)
}

pub fn readpicture(ctx: &mut Context) -> CommandResult {
    binary_fetch(ctx)
}

fn binary_fetch(ctx: &mut Context) -> CommandResult {
    let uri = match ctx.arg(0) {
        Ok(u) => Utf8PathBuf::from(u),
        Err(err) => return CommandResult::Error(err),
    };
    let offset = match ctx.arg(1).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n as usize,
        Err(err) => return CommandResult::Error(err),
    };
    let Some(cache) = ctx.instance.input_cache.clone() else {
        return CommandResult::Error(AckError::no_exist("No picture"));
    };
    let Some(lease) = cache.get(&uri, false, Vec::new) else {
        return CommandResult::Error(AckError::no_exist("No picture"));
    };
    let bytes = lease.bytes();
    if offset >= bytes.len() && !bytes.is_empty() {
        return CommandResult::Error(AckError::arg("Offset too large"));
    }
    let limit = ctx.session.binary_limit as usize;
    let end = (offset + limit).min(bytes.len());
    let chunk = bytes[offset..end].to_vec();
    let size = bytes.len();
    ok_result(move |response| {
        response.pair("size", size);
        response.binary_chunk(&chunk);
    })
}
