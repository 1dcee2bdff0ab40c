//! Playback-option toggles: repeat/random/single/consume, crossfade and
//! mixramp tuning, volume, and replay gain mode.

use crate::command::{ok_result, CommandResult, Context};
use crate::error::AckError;
use crate::partition::{ReplayGainMode, SingleMode};
use crate::protocol::request;

pub fn repeat(ctx: &mut Context) -> CommandResult {
    let value = match ctx.arg(0).and_then(request::parse_bool) {
        Ok(v) => v,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    partition.set_repeat(value);
    ok_result(|_| {})
}

pub fn random(ctx: &mut Context) -> CommandResult {
    let value = match ctx.arg(0).and_then(request::parse_bool) {
        Ok(v) => v,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    partition.set_random(value);
    ok_result(|_| {})
}

pub fn consume(ctx: &mut Context) -> CommandResult {
    let value = match ctx.arg(0).and_then(request::parse_bool) {
        Ok(v) => v,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    partition.set_consume(value);
    ok_result(|_| {})
}

pub fn single(ctx: &mut Context) -> CommandResult {
    let raw = match ctx.arg(0) {
        Ok(r) => r,
        Err(err) => return CommandResult::Error(err),
    };
    let mode = match raw {
        "0" => SingleMode::Off,
        "1" => SingleMode::On,
        "oneshot" => SingleMode::Oneshot,
        _ => return CommandResult::Error(AckError::arg(format!("Unknown single mode: {raw}"))),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    partition.set_single(mode);
    ok_result(|_| {})
}

pub fn crossfade(ctx: &mut Context) -> CommandResult {
    let seconds = match ctx.arg(0).and_then(request::parse_song_time) {
        Ok(v) => v,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    partition.set_crossfade(seconds);
    ok_result(|_| {})
}

pub fn mixrampdb(ctx: &mut Context) -> CommandResult {
    let value = match ctx.arg(0).and_then(request::parse_float) {
        Ok(v) => v,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    partition.options.mixramp_db = value;
    partition.emit_idle(crate::idle::IdleKind::Options);
    ok_result(|_| {})
}

pub fn mixrampdelay(ctx: &mut Context) -> CommandResult {
    let value = match ctx.arg(0).and_then(request::parse_signed_song_time) {
        Ok(v) => v,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    partition.options.mixramp_delay = value;
    partition.emit_idle(crate::idle::IdleKind::Options);
    ok_result(|_| {})
}

pub fn setvol(ctx: &mut Context) -> CommandResult {
    let volume = match ctx.arg(0).and_then(|s| request::parse_uint(s, Some(100))) {
        Ok(v) => v as u8,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match partition.set_volume(volume) {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

/// `volume <+N|-N>`: the legacy relative form, still accepted by real clients
/// even though `setvol` is the documented command.
pub fn volume(ctx: &mut Context) -> CommandResult {
    let delta = match ctx.arg(0).and_then(request::parse_int) {
        Ok(v) => v,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let current = partition.player_control.status().volume.unwrap_or(0) as i32;
    let target = (current + delta).clamp(0, 100) as u8;
    match partition.set_volume(target) {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

pub fn getvol(ctx: &mut Context) -> CommandResult {
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let volume = partition.player_control.status().volume.map(i32::from).unwrap_or(-1);
    ok_result(move |r| r.pair("volume", volume))
}

pub fn replay_gain_mode(ctx: &mut Context) -> CommandResult {
    let raw = match ctx.arg(0) {
        Ok(r) => r,
        Err(err) => return CommandResult::Error(err),
    };
    let mode = match raw {
        "off" => ReplayGainMode::Off,
        "track" => ReplayGainMode::Track,
        "album" => ReplayGainMode::Album,
        "auto" => ReplayGainMode::Auto,
        _ => return CommandResult::Error(AckError::arg(format!("Unknown replay gain mode: {raw}"))),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    partition.options.replay_gain_mode = mode;
    partition.emit_idle(crate::idle::IdleKind::Options);
    ok_result(|_| {})
}

pub fn replay_gain_status(ctx: &mut Context) -> CommandResult {
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let mode = partition.options.replay_gain_mode.wire_name();
    ok_result(move |r| r.pair("replay_gain_mode", mode))
}
