//! Multiple independent playback universes sharing one daemon: creating,
//! destroying, listing them, and migrating a client between them.

use crate::command::{ok_result, CommandResult, Context};
use crate::error::AckError;
use crate::player_control::NullPlayerControl;
use std::sync::Arc;

pub fn listpartitions(ctx: &mut Context) -> CommandResult {
    let names: Vec<String> = ctx.instance.partitions.iter().map(|p| p.name.clone()).collect();
    ok_result(move |response| {
        for name in names {
            response.pair("partition", name.as_str());
        }
    })
}

pub fn newpartition(ctx: &mut Context) -> CommandResult {
    let name = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let max_queue_length = ctx
        .instance
        .partition(&ctx.session.partition_name)
        .map(|p| p.queue.max_length)
        .unwrap_or(1000);
    match ctx.instance.new_partition(name, Arc::new(NullPlayerControl::new()), max_queue_length) {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

pub fn delpartition(ctx: &mut Context) -> CommandResult {
    let name = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    match ctx.instance.delete_partition(&name) {
        Ok(()) => ok_result(|_| {}),
        Err(err) => CommandResult::Error(err),
    }
}

/// `partition NAME`: moves the calling client from its current partition
/// to `NAME`, dragging its `ClientId` entry along so `outputs`/`clients`
/// bookkeeping and `is_empty_and_deletable` stay accurate.
pub fn partition(ctx: &mut Context) -> CommandResult {
    let target = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    if !ctx.instance.partitions.iter().any(|p| p.name == target) {
        return CommandResult::Error(AckError::no_exist("No such partition"));
    }
    let client_id = ctx.session.id;
    let source_name = ctx.session.partition_name.clone();
    if let Some(source) = ctx.instance.partition_mut(&source_name) {
        source.clients.retain(|&id| id != client_id);
    }
    if let Some(target_partition) = ctx.instance.partition_mut(&target) {
        target_partition.clients.push(client_id);
    }
    ctx.session.migrate_partition(target);
    ok_result(|_| {})
}
