//! Command table: name, required permission, arity, and the handler
//! function. Sorted once on first access and looked up by binary search
//! from then on, rather than hand-sorting ~90 literal rows and hoping a
//! future edit doesn't silently break the invariant.

use std::sync::OnceLock;

use crate::command::handlers;
use crate::command::HandlerFn;
use crate::error::AckError;
use crate::permission::Permission;

#[derive(Debug)]
pub struct CommandEntry {
    pub name: &'static str,
    pub permission: Permission,
    /// `-1` means "no arity check".
    pub min_args: i32,
    pub max_args: i32,
    pub handler: HandlerFn,
}

macro_rules! entry {
    ($name:expr, $perm:expr, $min:expr, $max:expr, $handler:path) => {
        CommandEntry { name: $name, permission: $perm, min_args: $min, max_args: $max, handler: $handler }
    };
}

fn raw_table() -> Vec<CommandEntry> {
    vec![
        entry!("add", Permission::ADD, 1, 2, handlers::queue::add),
        entry!("addid", Permission::ADD, 1, 2, handlers::queue::addid),
        entry!("addtagid", Permission::ADD, 3, 3, handlers::queue::addtagid),
        entry!("albumart", Permission::READ, 2, 2, handlers::database::albumart),
        entry!("binarylimit", Permission::NONE, 1, 1, handlers::session::binarylimit),
        entry!("channels", Permission::READ, 0, 0, handlers::messaging::channels),
        entry!("clear", Permission::CONTROL, 0, 0, handlers::queue::clear),
        entry!("clearerror", Permission::CONTROL, 0, 0, handlers::player::clearerror),
        entry!("cleartagid", Permission::ADD, 1, 2, handlers::queue::cleartagid),
        entry!("close", Permission::NONE, 0, 0, handlers::session::close),
        entry!("commands", Permission::NONE, 0, 0, handlers::session::commands),
        entry!("config", Permission::ADMIN, 0, 0, handlers::session::config),
        entry!("consume", Permission::CONTROL, 1, 1, handlers::options::consume),
        entry!("count", Permission::READ, 0, -1, handlers::database::count),
        entry!("crossfade", Permission::CONTROL, 1, 1, handlers::options::crossfade),
        entry!("currentsong", Permission::READ, 0, 0, handlers::player::currentsong),
        entry!("decoders", Permission::READ, 0, 0, handlers::session::decoders),
        entry!("delete", Permission::CONTROL, 1, 1, handlers::queue::delete),
        entry!("deleteid", Permission::CONTROL, 1, 1, handlers::queue::deleteid),
        entry!("delpartition", Permission::ADMIN, 1, 1, handlers::partitions::delpartition),
        entry!("disableoutput", Permission::ADMIN, 1, 1, handlers::outputs::disableoutput),
        entry!("enableoutput", Permission::ADMIN, 1, 1, handlers::outputs::enableoutput),
        entry!("find", Permission::READ, 0, -1, handlers::database::find),
        entry!("findadd", Permission::ADD, 0, -1, handlers::database::findadd),
        entry!("getvol", Permission::READ, 0, 0, handlers::options::getvol),
        entry!("idle", Permission::READ, 0, -1, handlers::session::idle),
        entry!("kill", Permission::ADMIN, 0, 0, handlers::session::kill),
        entry!("list", Permission::READ, 1, -1, handlers::database::list),
        entry!("listall", Permission::READ, 0, 1, handlers::database::listall),
        entry!("listallinfo", Permission::READ, 0, 1, handlers::database::listallinfo),
        entry!("listfiles", Permission::READ, 0, 1, handlers::database::listfiles),
        entry!("listmounts", Permission::READ, 0, 0, handlers::database::listmounts),
        entry!("listpartitions", Permission::READ, 0, 0, handlers::partitions::listpartitions),
        entry!("listplaylist", Permission::READ, 1, 1, handlers::playlists::listplaylist),
        entry!("listplaylistinfo", Permission::READ, 1, 1, handlers::playlists::listplaylistinfo),
        entry!("listplaylists", Permission::READ, 0, 0, handlers::playlists::listplaylists),
        entry!("load", Permission::ADD, 1, 2, handlers::playlists::load),
        entry!("lsinfo", Permission::READ, 0, 1, handlers::database::lsinfo),
        entry!("mixrampdb", Permission::CONTROL, 1, 1, handlers::options::mixrampdb),
        entry!("mixrampdelay", Permission::CONTROL, 1, 1, handlers::options::mixrampdelay),
        entry!("mount", Permission::ADMIN, 2, 2, handlers::database::mount),
        entry!("move", Permission::CONTROL, 2, 2, handlers::queue::move_cmd),
        entry!("moveid", Permission::CONTROL, 2, 2, handlers::queue::moveid),
        entry!("moveoutput", Permission::ADMIN, 2, 2, handlers::outputs::moveoutput),
        entry!("newpartition", Permission::ADMIN, 1, 1, handlers::partitions::newpartition),
        entry!("next", Permission::CONTROL, 0, 0, handlers::player::next),
        entry!("noidle", Permission::NONE, 0, 0, handlers::session::noidle),
        entry!("notcommands", Permission::NONE, 0, 0, handlers::session::notcommands),
        entry!("outputs", Permission::READ, 0, 0, handlers::outputs::outputs),
        entry!("outputset", Permission::ADMIN, 3, 3, handlers::outputs::outputset),
        entry!("partition", Permission::READ, 1, 1, handlers::partitions::partition),
        entry!("password", Permission::NONE, 1, 1, handlers::session::password),
        entry!("pause", Permission::CONTROL, 0, 1, handlers::player::pause),
        entry!("ping", Permission::NONE, 0, 0, handlers::session::ping),
        entry!("play", Permission::CONTROL, 0, 1, handlers::player::play),
        entry!("playid", Permission::CONTROL, 0, 1, handlers::player::playid),
        entry!("playlist", Permission::READ, 0, 0, handlers::queue::playlist),
        entry!("playlistadd", Permission::ADD, 2, 2, handlers::playlists::playlistadd),
        entry!("playlistclear", Permission::ADD, 1, 1, handlers::playlists::playlistclear),
        entry!("playlistdelete", Permission::ADD, 2, 2, handlers::playlists::playlistdelete),
        entry!("playlistfind", Permission::READ, 0, -1, handlers::queue::playlistfind),
        entry!("playlistid", Permission::READ, 0, 1, handlers::queue::playlistid),
        entry!("playlistinfo", Permission::READ, 0, 1, handlers::queue::playlistinfo),
        entry!("playlistmove", Permission::ADD, 3, 3, handlers::playlists::playlistmove),
        entry!("playlistsearch", Permission::READ, 0, -1, handlers::queue::playlistsearch),
        entry!("plchanges", Permission::READ, 1, 2, handlers::queue::plchanges),
        entry!("plchangesposid", Permission::READ, 1, 2, handlers::queue::plchangesposid),
        entry!("previous", Permission::CONTROL, 0, 0, handlers::player::previous),
        entry!("prio", Permission::CONTROL, 2, 2, handlers::queue::prio),
        entry!("prioid", Permission::CONTROL, 2, -1, handlers::queue::prioid),
        entry!("random", Permission::CONTROL, 1, 1, handlers::options::random),
        entry!("rangeid", Permission::ADD, 2, 2, handlers::queue::rangeid),
        entry!("readcomments", Permission::READ, 1, 1, handlers::database::readcomments),
        entry!("readmessages", Permission::READ, 0, 0, handlers::messaging::readmessages),
        entry!("readpicture", Permission::READ, 2, 2, handlers::database::readpicture),
        entry!("rename", Permission::ADD, 2, 2, handlers::playlists::rename),
        entry!("repeat", Permission::CONTROL, 1, 1, handlers::options::repeat),
        entry!("replay_gain_mode", Permission::CONTROL, 1, 1, handlers::options::replay_gain_mode),
        entry!("replay_gain_status", Permission::READ, 0, 0, handlers::options::replay_gain_status),
        entry!("rescan", Permission::ADMIN, 0, 1, handlers::database::rescan),
        entry!("rm", Permission::ADD, 1, 1, handlers::playlists::rm),
        entry!("save", Permission::ADD, 1, 2, handlers::playlists::save),
        entry!("search", Permission::READ, 0, -1, handlers::database::search),
        entry!("searchadd", Permission::ADD, 0, -1, handlers::database::searchadd),
        entry!("searchaddpl", Permission::ADD, 1, -1, handlers::database::searchaddpl),
        entry!("seek", Permission::CONTROL, 2, 2, handlers::player::seek),
        entry!("seekcur", Permission::CONTROL, 1, 1, handlers::player::seekcur),
        entry!("seekid", Permission::CONTROL, 2, 2, handlers::player::seekid),
        entry!("sendmessage", Permission::READ, 2, 2, handlers::messaging::sendmessage),
        entry!("setvol", Permission::CONTROL, 1, 1, handlers::options::setvol),
        entry!("shuffle", Permission::CONTROL, 0, 1, handlers::queue::shuffle),
        entry!("single", Permission::CONTROL, 1, 1, handlers::options::single),
        entry!("stats", Permission::READ, 0, 0, handlers::database::stats),
        entry!("status", Permission::READ, 0, 0, handlers::player::status),
        entry!("sticker", Permission::ADMIN, 3, -1, handlers::stickers::sticker),
        entry!("stop", Permission::CONTROL, 0, 0, handlers::player::stop),
        entry!("subscribe", Permission::READ, 1, 1, handlers::messaging::subscribe),
        entry!("swap", Permission::CONTROL, 2, 2, handlers::queue::swap),
        entry!("swapid", Permission::CONTROL, 2, 2, handlers::queue::swapid),
        entry!("tagtypes", Permission::READ, 0, -1, handlers::session::tagtypes),
        entry!("toggleoutput", Permission::ADMIN, 1, 1, handlers::outputs::toggleoutput),
        entry!("unmount", Permission::ADMIN, 1, 1, handlers::database::unmount),
        entry!("unsubscribe", Permission::READ, 1, 1, handlers::messaging::unsubscribe),
        entry!("update", Permission::ADMIN, 0, 1, handlers::database::update),
        entry!("urlhandlers", Permission::READ, 0, 0, handlers::session::urlhandlers),
        entry!("volume", Permission::CONTROL, 1, 1, handlers::options::volume),
    ]
}

fn table() -> &'static [CommandEntry] {
    static TABLE: OnceLock<Vec<CommandEntry>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut rows = raw_table();
        rows.sort_unstable_by_key(|e| e.name);
        rows
    })
}

pub fn lookup(name: &str) -> Result<&'static CommandEntry, AckError> {
    table()
        .binary_search_by(|e| e.name.cmp(name))
        .map(|i| &table()[i])
        .map_err(|_| AckError::unknown_command(name))
}

pub fn check_arity(entry: &CommandEntry, argc: usize) -> Result<(), AckError> {
    let argc = argc as i32;
    if entry.min_args >= 0 && argc < entry.min_args {
        return Err(AckError::arg("too few arguments"));
    }
    if entry.max_args >= 0 && argc > entry.max_args {
        return Err(AckError::arg("too many arguments"));
    }
    Ok(())
}

pub fn check_permission(entry: &CommandEntry, granted: Permission) -> Result<(), AckError> {
    if granted.contains(entry.permission) {
        Ok(())
    } else {
        Err(AckError::permission())
    }
}

pub fn names() -> impl Iterator<Item = &'static str> {
    table().iter().map(|e| e.name)
}

pub fn names_with_permission(granted: Permission) -> impl Iterator<Item = &'static str> {
    table().iter().filter(move |e| granted.contains(e.permission)).map(|e| e.name)
}

pub fn names_without_permission(granted: Permission) -> impl Iterator<Item = &'static str> {
    table().iter().filter(move |e| !granted.contains(e.permission)).map(|e| e.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AckCode;

    #[test]
    fn unknown_command_reports_the_right_code() {
        let err = lookup("frobnicate").unwrap_err();
        assert_eq!(err.code, AckCode::Unknown);
    }

    #[test]
    fn lookup_finds_every_listed_command() {
        for entry in table() {
            assert!(lookup(entry.name).is_ok(), "missing {}", entry.name);
        }
    }

    #[test]
    fn permission_filter_is_a_partition() {
        let granted = Permission::READ;
        let with: std::collections::HashSet<_> = names_with_permission(granted).collect();
        let without: std::collections::HashSet<_> = names_without_permission(granted).collect();
        assert!(with.is_disjoint(&without));
        assert_eq!(with.len() + without.len(), table().len());
    }
}
