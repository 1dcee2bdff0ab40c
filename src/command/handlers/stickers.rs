//! `sticker get/set/delete/list/find`: the one command covering every
//! verb of the key/value store attached to songs.

use crate::command::{ok_result, CommandResult, Context};
use crate::error::AckError;
use crate::idle::IdleKind;
use crate::sticker::StickerStore;

fn open_store(ctx: &Context) -> Result<StickerStore, AckError> {
    let path = ctx
        .instance
        .sticker_db_path
        .as_ref()
        .ok_or_else(|| AckError::no_exist("sticker database is disabled"))?;
    StickerStore::open(path.as_std_path()).map_err(|err| AckError::system(err.to_string()))
}

pub fn sticker(ctx: &mut Context) -> CommandResult {
    let verb = ctx.args[0].clone();
    match verb.as_str() {
        "get" => get(ctx),
        "set" => set(ctx),
        "delete" => delete(ctx),
        "list" => list(ctx),
        "find" => find(ctx),
        other => CommandResult::Error(AckError::arg(format!("unknown sticker verb: {other}"))),
    }
}

fn get(ctx: &mut Context) -> CommandResult {
    let (Some(ty), Some(uri), Some(name)) = (ctx.args.get(1), ctx.args.get(2), ctx.args.get(3)) else {
        return CommandResult::Error(AckError::arg("too few arguments"));
    };
    let store = match open_store(ctx) {
        Ok(s) => s,
        Err(err) => return CommandResult::Error(err),
    };
    match store.get(ty, uri, name) {
        Ok(Some(value)) => ok_result(move |r| r.pair("sticker", format!("{name}={value}"))),
        Ok(None) => CommandResult::Error(AckError::no_exist("No such sticker")),
        Err(err) => CommandResult::Error(AckError::system(err.to_string())),
    }
}

fn set(ctx: &mut Context) -> CommandResult {
    let (Some(ty), Some(uri), Some(name), Some(value)) =
        (ctx.args.get(1), ctx.args.get(2), ctx.args.get(3), ctx.args.get(4))
    else {
        return CommandResult::Error(AckError::arg("too few arguments"));
    };
    let store = match open_store(ctx) {
        Ok(s) => s,
        Err(err) => return CommandResult::Error(err),
    };
    match store.set(ty, uri, name, value) {
        Ok(()) => {
            ctx.instance.emit_idle(IdleKind::Sticker);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(AckError::system(err.to_string())),
    }
}

fn delete(ctx: &mut Context) -> CommandResult {
    let (Some(ty), Some(uri)) = (ctx.args.get(1), ctx.args.get(2)) else {
        return CommandResult::Error(AckError::arg("too few arguments"));
    };
    let name = ctx.args.get(3).map(String::as_str);
    let store = match open_store(ctx) {
        Ok(s) => s,
        Err(err) => return CommandResult::Error(err),
    };
    match store.delete(ty, uri, name) {
        Ok(()) => {
            ctx.instance.emit_idle(IdleKind::Sticker);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(AckError::system(err.to_string())),
    }
}

fn list(ctx: &mut Context) -> CommandResult {
    let (Some(ty), Some(uri)) = (ctx.args.get(1), ctx.args.get(2)) else {
        return CommandResult::Error(AckError::arg("too few arguments"));
    };
    let store = match open_store(ctx) {
        Ok(s) => s,
        Err(err) => return CommandResult::Error(err),
    };
    match store.list(ty, uri) {
        Ok(entries) => ok_result(move |response| {
            for (name, value) in entries {
                response.pair("sticker", format!("{name}={value}"));
            }
        }),
        Err(err) => CommandResult::Error(AckError::system(err.to_string())),
    }
}

fn find(ctx: &mut Context) -> CommandResult {
    let (Some(ty), Some(uri), Some(name)) = (ctx.args.get(1), ctx.args.get(2), ctx.args.get(3)) else {
        return CommandResult::Error(AckError::arg("too few arguments"));
    };
    let store = match open_store(ctx) {
        Ok(s) => s,
        Err(err) => return CommandResult::Error(err),
    };
    match store.find_by_name(ty, uri, name) {
        Ok(entries) => {
            let name = name.clone();
            ok_result(move |response| {
                for (uri, value) in entries {
                    response.pair("file", uri.as_str());
                    response.pair("sticker", format!("{name}={value}"));
                }
            })
        }
        Err(err) => CommandResult::Error(AckError::system(err.to_string())),
    }
}
