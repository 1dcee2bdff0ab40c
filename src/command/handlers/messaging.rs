//! Client-to-client channels: `subscribe`/`unsubscribe`/`sendmessage` and
//! the two commands a subscriber polls with.

use crate::command::{ok_result, CommandResult, Context};
use crate::error::AckError;
use crate::idle::IdleKind;

pub fn subscribe(ctx: &mut Context) -> CommandResult {
    let channel = match ctx.arg(0) {
        Ok(c) => c.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    match ctx.session.subscribe(channel) {
        Ok(()) => {
            ctx.instance.emit_idle(IdleKind::Subscription);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn unsubscribe(ctx: &mut Context) -> CommandResult {
    let channel = match ctx.arg(0) {
        Ok(c) => c.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    match ctx.session.unsubscribe(&channel) {
        Ok(()) => {
            ctx.instance.emit_idle(IdleKind::Subscription);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

pub fn channels(ctx: &mut Context) -> CommandResult {
    let caller_id = ctx.session.id;
    let mut channels: Vec<String> = ctx.session.subscriptions.clone();
    for other in ctx.instance.other_sessions(caller_id) {
        let other = other.lock().unwrap();
        channels.extend(other.subscriptions.iter().cloned());
    }
    channels.sort();
    channels.dedup();
    ok_result(move |response| {
        for channel in &channels {
            response.pair("channel", channel.as_str());
        }
    })
}

pub fn readmessages(ctx: &mut Context) -> CommandResult {
    let messages = ctx.session.drain_messages();
    ok_result(move |response| {
        for (channel, message) in messages {
            response.pair("channel", channel.as_str());
            response.pair("message", message.as_str());
        }
    })
}

/// Delivers to the caller's own subscriptions too, matching real clients'
/// expectation that sending on a channel you're subscribed to echoes back.
pub fn sendmessage(ctx: &mut Context) -> CommandResult {
    let channel = match ctx.arg(0) {
        Ok(c) => c.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let message = match ctx.arg(1) {
        Ok(m) => m.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let caller_id = ctx.session.id;
    let mut delivered = ctx.session.deliver_message(&channel, &message);
    for other in ctx.instance.other_sessions(caller_id) {
        let mut other = other.lock().unwrap();
        if other.deliver_message(&channel, &message) {
            delivered = true;
        }
    }
    if !delivered {
        return CommandResult::Error(AckError::no_exist("nobody is subscribed to this channel"));
    }
    ctx.instance.emit_idle(IdleKind::Message);
    ok_result(|_| {})
}
