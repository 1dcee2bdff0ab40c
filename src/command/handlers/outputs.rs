//! Audio outputs. The actual output plugins (ALSA, PulseAudio, pipe, null,
//! ...) are out of scope; a `Partition` just keeps a named on/off list a
//! client can query and toggle.

use crate::command::{ok_result, CommandResult, Context};
use crate::error::AckError;
use crate::idle::IdleKind;
use crate::protocol::request;

fn find_output<'a>(outputs: &'a mut [crate::partition::AudioOutput], id: u32) -> Result<&'a mut crate::partition::AudioOutput, AckError> {
    outputs
        .get_mut(id as usize)
        .ok_or_else(|| AckError::no_exist(format!("No such output: {id}")))
}

pub fn outputs(ctx: &mut Context) -> CommandResult {
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    ok_result(|response| {
        for (id, output) in partition.outputs.iter().enumerate() {
            response.pair("outputid", id);
            response.pair("outputname", output.name.as_str());
            response.pair("plugin", "null");
            response.pair("outputenabled", output.enabled as u8);
        }
    })
}

pub fn enableoutput(ctx: &mut Context) -> CommandResult {
    set_enabled(ctx, true)
}

pub fn disableoutput(ctx: &mut Context) -> CommandResult {
    set_enabled(ctx, false)
}

pub fn toggleoutput(ctx: &mut Context) -> CommandResult {
    let id = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    let output = match find_output(&mut partition.outputs, id) {
        Ok(o) => o,
        Err(err) => return CommandResult::Error(err),
    };
    output.enabled = !output.enabled;
    partition.emit_idle(IdleKind::Output);
    ok_result(|_| {})
}

fn set_enabled(ctx: &mut Context, enabled: bool) -> CommandResult {
    let id = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    match find_output(&mut partition.outputs, id) {
        Ok(output) => {
            output.enabled = enabled;
            partition.emit_idle(IdleKind::Output);
            ok_result(|_| {})
        }
        Err(err) => CommandResult::Error(err),
    }
}

/// Moves an output to a different partition by name, detaching it from the
/// caller's partition. The output's enabled state carries over.
pub fn moveoutput(ctx: &mut Context) -> CommandResult {
    let output_name = match ctx.arg(0) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let target_name = match ctx.arg(1) {
        Ok(n) => n.to_string(),
        Err(err) => return CommandResult::Error(err),
    };
    let source_name = ctx.session.partition_name.clone();
    if !ctx.instance.partitions.iter().any(|p| p.name == target_name) {
        return CommandResult::Error(AckError::no_exist("No such partition"));
    }
    let output = {
        let Some(source) = ctx.instance.partition_mut(&source_name) else {
            return CommandResult::Error(AckError::system("session's partition no longer exists"));
        };
        let Some(index) = source.outputs.iter().position(|o| o.name == output_name) else {
            return CommandResult::Error(AckError::no_exist(format!("No such output: {output_name}")));
        };
        let output = source.outputs.remove(index);
        source.emit_idle(IdleKind::Output);
        output
    };
    let target = ctx.instance.partition_mut(&target_name).expect("checked above");
    target.outputs.push(output);
    target.emit_idle(IdleKind::Output);
    ok_result(|_| {})
}

/// Sets a runtime output attribute. The core does not model per-plugin
/// attributes (there are no plugins), so this only validates that the
/// output exists and reports the change on the idle bus.
pub fn outputset(ctx: &mut Context) -> CommandResult {
    let id = match ctx.arg(0).and_then(|s| request::parse_uint(s, None)) {
        Ok(n) => n,
        Err(err) => return CommandResult::Error(err),
    };
    let _attribute = match ctx.arg(1) {
        Ok(a) => a,
        Err(err) => return CommandResult::Error(err),
    };
    let _value = match ctx.arg(2) {
        Ok(v) => v,
        Err(err) => return CommandResult::Error(err),
    };
    let partition = match ctx.partition() {
        Ok(p) => p,
        Err(err) => return CommandResult::Error(err),
    };
    if find_output(&mut partition.outputs, id).is_err() {
        return CommandResult::Error(AckError::no_exist(format!("No such output: {id}")));
    }
    partition.emit_idle(IdleKind::Output);
    ok_result(|_| {})
}
