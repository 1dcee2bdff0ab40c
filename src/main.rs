mod client;
mod cli;
mod command;
mod database;
mod error;
mod event_loop;
mod idle;
mod input_cache;
mod instance;
mod partition;
mod permission;
mod player_control;
mod protocol;
mod queue;
mod remote_tag_cache;
mod sticker;
mod stored_playlist;

fn main() -> color_eyre::Result<()> {
    cli::run()
}
