//! Connection-scoped bookkeeping: the idle/noidle state machine,
//! authentication, capability listings, and the handful of commands that
//! report static server metadata rather than touching a partition.

use crate::command::{ok_result, CommandResult, Context};
use crate::error::{AckCode, AckError};
use crate::idle::{IdleKind, IdleMask};
use crate::protocol::request;
use crate::protocol::Tag;

pub fn ping(_ctx: &mut Context) -> CommandResult {
    ok_result(|_| {})
}

pub fn close(_ctx: &mut Context) -> CommandResult {
    CommandResult::Close
}

pub fn kill(_ctx: &mut Context) -> CommandResult {
    CommandResult::Kill
}

/// `password PASSWORD`: tries every configured password in order and
/// grants the first match's permission bits. An empty password table means
/// the server is unauthenticated and every connection already holds
/// [`crate::permission::Permission::DEFAULT`], so this always fails in
/// that configuration — matching the "no password configured" behavior.
pub fn password(ctx: &mut Context) -> CommandResult {
    let given = match ctx.arg(0) {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let granted = ctx
        .instance
        .passwords
        .iter()
        .find(|(password, _)| password == given)
        .map(|(_, permission)| *permission);
    match granted {
        Some(permission) => {
            ctx.session.permission_mask |= permission;
            ok_result(|_| {})
        }
        None => CommandResult::Error(AckError::new(AckCode::Password, "incorrect password")),
    }
}

pub fn binarylimit(ctx: &mut Context) -> CommandResult {
    let limit = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    match ctx.session.set_binary_limit(limit, 1 << 20) {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

pub fn commands(ctx: &mut Context) -> CommandResult {
    let names: Vec<&str> = crate::command::registry::names_with_permission(ctx.session.permission_mask).collect();
    ok_result(move |response| {
        for name in names {
            response.pair("command", name);
        }
    })
}

pub fn notcommands(ctx: &mut Context) -> CommandResult {
    let names: Vec<&str> = crate::command::registry::names_without_permission(ctx.session.permission_mask).collect();
    ok_result(move |response| {
        for name in names {
            response.pair("command", name);
        }
    })
}

/// The tag mask is always the full set; the core does not model a
/// per-session enabled/disabled subset (`tagtypes disable`/`clear`/`all`
/// would need somewhere to park that state on [`crate::client::session::ClientSession`],
/// and nothing downstream ever consults a narrowed mask).
pub fn tagtypes(_ctx: &mut Context) -> CommandResult {
    ok_result(|response| {
        use strum::IntoEnumIterator;
        for tag in Tag::iter() {
            response.pair("tagtype", tag.to_string());
        }
    })
}

pub fn urlhandlers(_ctx: &mut Context) -> CommandResult {
    ok_result(|response| {
        response.pair("handler", "http://");
        response.pair("handler", "https://");
    })
}

pub fn decoders(_ctx: &mut Context) -> CommandResult {
    // No decoder plugins are modeled; report an empty list rather than
    // inventing plugin names nothing backs.
    ok_result(|_| {})
}

pub fn config(ctx: &mut Context) -> CommandResult {
    let sticker_path = ctx.instance.sticker_db_path.clone();
    ok_result(move |response| {
        if let Some(path) = sticker_path {
            response.pair("sticker_file", path.as_str());
        }
    })
}

/// `idle [SUBSYSTEM...]`: subscribes to the named subsystems (or all of
/// them) and either delivers already-pending bits immediately or parks the
/// session waiting for the next matching event.
pub fn idle(ctx: &mut Context) -> CommandResult {
    let mut mask = IdleMask::EMPTY;
    if ctx.args.is_empty() {
        mask = IdleMask::all();
    } else {
        for name in ctx.args {
            match IdleKind::from_wire_name(name) {
                Some(kind) => mask |= kind.into(),
                None => return CommandResult::Error(AckError::arg(format!("Unknown idle event: {name}"))),
            }
        }
    }
    match ctx.session.begin_idle(mask) {
        Some(delivered) => ok_result(move |response| {
            for kind in delivered.kinds() {
                response.pair("changed", kind.wire_name());
            }
        }),
        None => CommandResult::Idle,
    }
}

pub fn noidle(ctx: &mut Context) -> CommandResult {
    let was_waiting = ctx.session.noidle();
    if was_waiting {
        CommandResult::Finish(crate::protocol::response::Response::new())
    } else {
        ok_result(|_| {})
    }
}
