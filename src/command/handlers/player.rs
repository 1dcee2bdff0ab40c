//! Transport control and the two status-reporting commands, `status` and
//! `currentsong`.

use crate::command::{ok_result, CommandResult, Context};
use crate::error::AckError;
use crate::idle::IdleKind;
use crate::partition::SingleMode;
use crate::protocol::request;
use crate::protocol::response::Response;
use crate::queue::QueueId;

pub fn currentsong(ctx: &mut Context) -> CommandResult {
    let database = ctx.instance.database.clone();
    let Some(partition) = ctx.instance.partition(&ctx.session.partition_name) else {
        return CommandResult::Error(AckError::system("session's partition no longer exists"));
    };
    let mut response = Response::new();
    if let Some(pos) = partition.current_position()
        && let Some(entry) = partition.queue.by_position(pos)
    {
        response.pair("file", entry.uri.as_str());
        response.pair("Pos", pos);
        response.pair("Id", entry.id.0);
        if let Some(song) = database.as_ref().and_then(|db| db.lookup(&entry.uri)) {
            for (tag, value) in &song.tags {
                response.pair(&tag.to_string(), value);
            }
        }
    }
    CommandResult::Ok(response)
}

pub fn status(ctx: &mut Context) -> CommandResult {
    let partition_name = ctx.session.partition_name.clone();
    let partition = match ctx.instance.partition(&partition_name) {
        Some(p) => p,
        None => return CommandResult::Error(AckError::system("session's partition no longer exists")),
    };
    let player_status = partition.player_control.status();
    let mut response = Response::new();
    response.pair("volume", player_status.volume.map(i32::from).unwrap_or(-1));
    response.pair("repeat", partition.options.repeat as u8);
    response.pair("random", partition.options.random as u8);
    response.pair(
        "single",
        match partition.options.single {
            SingleMode::Off => "0",
            SingleMode::On => "1",
            SingleMode::Oneshot => "oneshot",
        },
    );
    response.pair("consume", partition.options.consume as u8);
    response.pair("playlist", partition.queue.version());
    response.pair("playlistlength", partition.queue.len());
    response.pair("mixrampdb", partition.options.mixramp_db);
    if partition.options.mixramp_delay > 0.0 {
        response.pair("mixrampdelay", partition.options.mixramp_delay);
    }
    let state = match player_status.state {
        crate::player_control::PlayState::Stop => "stop",
        crate::player_control::PlayState::Play => "play",
        crate::player_control::PlayState::Pause => "pause",
    };
    response.pair("state", state);
    if let Some(pos) = partition.current_position() {
        response.pair("song", pos);
        if let Some(entry) = partition.queue.by_position(pos) {
            response.pair("songid", entry.id.0);
        }
    }
    if let Some(duration) = player_status.duration_seconds {
        response.pair("elapsed", player_status.elapsed_seconds);
        response.pair("duration", duration);
        response.pair(
            "time",
            format!("{}:{}", player_status.elapsed_seconds as u64, duration as u64),
        );
    }
    if let Some(bitrate) = player_status.bitrate_kbps {
        response.pair("bitrate", bitrate);
    }
    if let Some(format) = &player_status.audio_format {
        response.pair("audio", format);
    }
    response.pair("partition", partition.name.as_str());
    if let Some(error) = &player_status.error {
        response.pair("error", error);
    }
    CommandResult::Ok(response)
}

pub fn play(ctx: &mut Context) -> CommandResult {
    let position = match ctx.args.first() {
        Some(raw) => match request::parse_uint(raw, None) {
            Ok(n) => Some(n),
            Err(err) => return CommandResult::Error(err),
        },
        None => None,
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let result = match position {
        Some(pos) => partition.play_position(pos),
        None => partition.play_resume(),
    };
    match result {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

pub fn playid(ctx: &mut Context) -> CommandResult {
    let id = match ctx.args.first() {
        Some(raw) => match request::parse_uint(raw, None) {
            Ok(n) => Some(QueueId(n)),
            Err(err) => return CommandResult::Error(err),
        },
        None => None,
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let result = match id {
        Some(id) => partition.play_id(id),
        None => partition.play_resume(),
    };
    match result {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

pub fn stop(ctx: &mut Context) -> CommandResult {
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    partition.stop();
    ok_result(|_| {})
}

pub fn pause(ctx: &mut Context) -> CommandResult {
    let pause = match ctx.args.first() {
        Some(raw) => match request::parse_bool(raw) {
            Ok(v) => Some(v),
            Err(err) => return CommandResult::Error(err),
        },
        None => None,
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let pause = pause.unwrap_or_else(|| partition.player_control.status().state != crate::player_control::PlayState::Pause);
    partition.pause(pause);
    ok_result(|_| {})
}

pub fn next(ctx: &mut Context) -> CommandResult {
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.next() {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

pub fn previous(ctx: &mut Context) -> CommandResult {
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.previous() {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

pub fn seek(ctx: &mut Context) -> CommandResult {
    let position = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    let seconds = match ctx.arg(1).and_then(request::parse_song_time) {
        Ok(v) => v,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    if let Err(err) = partition.play_position(position) {
        return CommandResult::Error(err);
    }
    match partition.seek_seconds(seconds as f64) {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

pub fn seekid(ctx: &mut Context) -> CommandResult {
    let id = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => QueueId(n),
        Err(err) => return CommandResult::Error(err),
    };
    let seconds = match ctx.arg(1).and_then(request::parse_song_time) {
        Ok(v) => v,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    if let Err(err) = partition.play_id(id) {
        return CommandResult::Error(err);
    }
    match partition.seek_seconds(seconds as f64) {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

pub fn seekcur(ctx: &mut Context) -> CommandResult {
    let raw = match ctx.arg(0) {
        Ok(r) => r,
        Err(err) => return CommandResult::Error(err),
    };
    let (relative, seconds) = if let Some(rest) = raw.strip_prefix('+') {
        match request::parse_song_time(rest) {
            Ok(v) => (true, v as f64),
            Err(err) => return CommandResult::Error(err),
        }
    } else if let Some(rest) = raw.strip_prefix('-') {
        match request::parse_song_time(rest) {
            Ok(v) => (true, -(v as f64)),
            Err(err) => return CommandResult::Error(err),
        }
    } else {
        match request::parse_song_time(raw) {
            Ok(v) => (false, v as f64),
            Err(err) => return CommandResult::Error(err),
        }
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let target = if relative {
        partition.player_control.status().elapsed_seconds + seconds
    } else {
        seconds
    };
    match partition.seek_seconds(target.max(0.0)) {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

pub fn clearerror(ctx: &mut Context) -> CommandResult {
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    partition.emit_idle(IdleKind::Player);
    ok_result(|_| {})
}
