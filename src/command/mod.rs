//! Command dispatch: looks a line's first token up in the registry, checks
//! permission and arity, and invokes its handler.

pub mod handlers;
pub mod registry;

use crate::client::session::ClientSession;
use crate::error::AckError;
use crate::instance::Instance;
use crate::protocol::response::Response;

/// The six dispositions a handler can return, mirroring what the owning
/// session driver does next.
pub enum CommandResult {
    Ok(Response),
    Idle,
    Background,
    Error(AckError),
    Finish(Response),
    Close,
    Kill,
}

/// What a handler needs: the whole instance (so it can reach any
/// partition, or add/remove one), the calling session, and the command's
/// arguments (the command name itself has already been consumed by
/// dispatch and is not included here).
pub struct Context<'a> {
    pub instance: &'a mut Instance,
    pub session: &'a mut ClientSession,
    pub args: &'a [String],
}

impl<'a> Context<'a> {
    pub fn arg(&self, index: usize) -> Result<&str, AckError> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| AckError::arg("wrong number of arguments"))
    }

    pub fn partition(&mut self) -> Result<&mut crate::partition::Partition, AckError> {
        let name = self.session.partition_name.clone();
        self.instance
            .partition_mut(&name)
            .ok_or_else(|| AckError::system("session's partition no longer exists"))
    }
}

pub type HandlerFn = fn(&mut Context) -> CommandResult;

/// Looks `argv[0]` up in the registry, checks permission and arity against
/// the rest of `argv`, then invokes the handler. This is the single place
/// command-list execution and direct dispatch both funnel through.
pub fn dispatch(instance: &mut Instance, session: &mut ClientSession, argv: &[String]) -> CommandResult {
    let Some((name, args)) = argv.split_first() else {
        return CommandResult::Error(AckError::arg("no command given"));
    };
    let entry = match registry::lookup(name) {
        Ok(entry) => entry,
        Err(err) => return CommandResult::Error(err),
    };
    if let Err(err) = registry::check_permission(entry, session.permission_mask) {
        return CommandResult::Error(err);
    }
    if let Err(err) = registry::check_arity(entry, args.len()) {
        return CommandResult::Error(err);
    }
    let mut context = Context { instance, session, args };
    (entry.handler)(&mut context)
}

pub fn ok_result(build: impl FnOnce(&mut Response)) -> CommandResult {
    let mut response = Response::new();
    build(&mut response);
    CommandResult::Ok(response)
}

pub fn from_ack_result(result: Result<(), AckError>, build: impl FnOnce(&mut Response)) -> CommandResult {
    match result {
        Ok(()) => ok_result(build),
        Err(err) => CommandResult::Error(err),
    }
}
