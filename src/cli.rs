//! Process entry point: CLI flags, tracing setup, and the accept loop that
//! turns each TCP connection into a command-dispatch session.

use std::sync::{Arc, Mutex};

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::Context as _;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::client::session::{ClientSession, SessionAction};
use crate::command::{self, CommandResult};
use crate::database::InMemoryDatabase;
use crate::error::AckError;
use crate::event_loop::EventLoop;
use crate::idle::MaskMonitor;
use crate::input_cache::InputCache;
use crate::instance::Instance;
use crate::player_control::NullPlayerControl;
use crate::protocol::response::Response;
use crate::protocol::tokenizer;
use crate::remote_tag_cache::RemoteTagCache;

#[derive(Parser, Debug)]
#[command(name = "mpdhaj-core", about = "Command-dispatch and session engine for a network-accessible audio server daemon")]
pub struct Cli {
    /// Address to bind the client-facing socket to.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 6600)]
    pub port: u16,

    /// Root of the music collection. Reserved for a real database backend;
    /// the in-memory stand-in does not scan it.
    #[arg(long)]
    pub music_dir: Option<std::path::PathBuf>,

    /// Directory stored playlists would be persisted under. Reserved for a
    /// real on-disk stored-playlist backend; this core keeps them in memory.
    #[arg(long)]
    pub playlist_dir: Option<std::path::PathBuf>,

    /// Path to the sticker SQLite database. Omit to disable stickers.
    #[arg(long)]
    pub sticker_file: Option<std::path::PathBuf>,

    /// Idle seconds after which an inactive connection is dropped.
    #[arg(long, default_value_t = 60)]
    pub client_timeout_seconds: u64,

    /// `tracing_subscriber::EnvFilter` directive, e.g. `mpdhaj_core=debug`.
    /// Falls back to the process environment (`RUST_LOG`) when unset.
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Maximum number of entries any one queue may hold.
    #[arg(long, default_value_t = 16384)]
    pub max_playlist_length: usize,

    /// Maximum number of simultaneously connected clients.
    #[arg(long, default_value_t = 64)]
    pub max_connections: usize,

    /// Prefetch cache capacity, in bytes.
    #[arg(long, default_value_t = 32 * 1024 * 1024)]
    pub input_cache_bytes: usize,
}

#[allow(unexpected_cfgs)]
#[tokio::main(flavor = "current_thread")]
pub async fn run() -> Result<()> {
    color_eyre::install().unwrap();
    let cli = Cli::parse();
    setup_tracing(cli.log_filter.as_deref());

    let event_loop = EventLoop::new();
    let inject = event_loop.handle();
    tokio::task::spawn(event_loop.run());

    let mut instance = Instance::new(Arc::new(NullPlayerControl::new()), cli.max_playlist_length, cli.max_connections);
    instance.database = Some(Arc::new(InMemoryDatabase::new()));
    instance.input_cache = Some(InputCache::new(cli.input_cache_bytes));
    instance.remote_tag_cache = Some(RemoteTagCache::new(256));
    instance.sticker_db_path = cli.sticker_file.map(|p| camino::Utf8PathBuf::try_from(p).expect("sticker-file path must be valid UTF-8"));
    instance.inject_handle = Some(inject);

    let instance = Arc::new(Mutex::new(instance));
    Instance::bind_self_handle(&instance);

    let listener = TcpListener::bind(format!("{}:{}", cli.bind_address, cli.port))
        .await
        .wrap_err("Could not bind listener")?;
    info!(address = %cli.bind_address, port = cli.port, "listening");

    let mut next_session_id: u64 = 1;
    loop {
        let (stream, addr) = listener.accept().await.wrap_err("Could not accept connection")?;
        let session_id = next_session_id;
        next_session_id += 1;

        let session = Arc::new(Mutex::new(ClientSession::new(session_id, crate::instance::DEFAULT_PARTITION)));
        instance.lock().unwrap().register_session(&session);

        let instance = Arc::clone(&instance);
        let timeout = std::time::Duration::from_secs(cli.client_timeout_seconds);
        tokio::task::spawn(async move {
            debug!(%addr, session_id, "client connected");
            if let Err(err) = handle_connection(stream, Arc::clone(&instance), Arc::clone(&session), timeout).await {
                warn!(%addr, session_id, "connection ended with error: {err:#}");
            } else {
                info!(%addr, session_id, "client disconnected");
            }
            instance.lock().unwrap().unregister_session(session_id);
        });
    }
}

pub fn setup_tracing(log_filter: Option<&str>) {
    use tracing_subscriber::filter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = match log_filter {
        Some(directive) => filter::EnvFilter::builder().parse_lossy(directive),
        None => filter::EnvFilter::builder().from_env().unwrap(),
    };
    let fmt = fmt::layer().pretty().with_line_number(true);

    let _ignore_err = tracing_subscriber::registry().with(fmt).with(filter).try_init();
}

/// Drives one accepted connection start to finish: greeting, then an
/// alternation between reading the next input line and delivering any idle
/// events that arrive for this session's subscription while it waits.
async fn handle_connection(
    stream: TcpStream,
    instance: Arc<Mutex<Instance>>,
    session: Arc<Mutex<ClientSession>>,
    timeout: std::time::Duration,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    writer.write_all(crate::protocol::greeting().as_bytes()).await?;

    let instance_idle: Arc<MaskMonitor> = instance.lock().unwrap().idle.clone();

    loop {
        let partition_idle = {
            let instance = instance.lock().unwrap();
            let partition_name = session.lock().unwrap().partition_name.clone();
            instance.partition(&partition_name).map(|p| p.idle_local.clone())
        };

        let mut line = String::new();
        tokio::select! {
            biased;

            bits = instance_idle.recv() => {
                deliver_idle(&session, &mut writer, bits).await?;
            }
            bits = recv_optional(partition_idle.as_deref()) => {
                deliver_idle(&session, &mut writer, bits).await?;
            }
            read = tokio::time::timeout(timeout, reader.read_line(&mut line)) => {
                let Ok(read) = read else {
                    debug!("client timed out after {timeout:?} of inactivity");
                    return Ok(());
                };
                let bytes = read.wrap_err("Could not read from client")?;
                if bytes == 0 {
                    return Ok(());
                }
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                if !crate::client::session::is_well_formed_command_line(&line) {
                    return Ok(());
                }
                match handle_line(&instance, &session, &mut writer, line).await? {
                    SessionAction::Continue => {}
                    SessionAction::Close => return Ok(()),
                    SessionAction::Kill => return Ok(()),
                }
            }
        }
    }
}

/// `tokio::select!` needs every branch to be a real future; partitions can
/// vanish between iterations (the client's own partition was deleted), so
/// this stands in for "never resolves" rather than forcing a `MaskMonitor`
/// to exist.
async fn recv_optional(monitor: Option<&MaskMonitor>) -> crate::idle::IdleMask {
    match monitor {
        Some(monitor) => monitor.recv().await,
        None => std::future::pending().await,
    }
}

/// Folds newly observed idle bits into the session's own pending/waiting
/// state; if the session was already blocked inside an `idle` command, this
/// is also responsible for writing the deferred response.
async fn deliver_idle(
    session: &Arc<Mutex<ClientSession>>,
    writer: &mut (impl tokio::io::AsyncWrite + Unpin),
    bits: crate::idle::IdleMask,
) -> Result<()> {
    let delivered = session.lock().unwrap().idle_add(bits);
    if let Some(delivered) = delivered {
        let mut response = Response::new();
        for kind in delivered.kinds() {
            response.pair("changed", kind.wire_name());
        }
        writer.write_all(&response.into_ok()).await?;
    }
    Ok(())
}

/// One line of input, outside (or opening/continuing) a command list.
async fn handle_line(
    instance: &Arc<Mutex<Instance>>,
    session: &Arc<Mutex<ClientSession>>,
    writer: &mut (impl tokio::io::AsyncWrite + Unpin),
    line: String,
) -> Result<SessionAction> {
    if session.lock().unwrap().is_waiting() && line != "noidle" {
        return Ok(SessionAction::Close);
    }

    let collecting = session.lock().unwrap().is_collecting();
    if collecting {
        if line == "command_list_end" {
            let (lines, ok_mode) = session.lock().unwrap().end_command_list();
            return run_command_list(instance, session, writer, lines, ok_mode).await;
        }
        if session.lock().unwrap().push_command_list_line(line).is_err() {
            return Ok(SessionAction::Close);
        }
        return Ok(SessionAction::Continue);
    }

    if line == "command_list_begin" {
        session.lock().unwrap().begin_command_list(false).ok();
        return Ok(SessionAction::Continue);
    }
    if line == "command_list_ok_begin" {
        session.lock().unwrap().begin_command_list(true).ok();
        return Ok(SessionAction::Continue);
    }

    let argv = match tokenizer::tokenize(&line) {
        Ok(argv) if !argv.is_empty() => argv,
        Ok(_) => return Ok(SessionAction::Continue),
        Err(err) => {
            writer.write_all(&Response::new().into_ack(&err, "", 0)).await?;
            return Ok(SessionAction::Continue);
        }
    };
    let name = argv[0].clone();
    let result = {
        let mut instance = instance.lock().unwrap();
        let mut session = session.lock().unwrap();
        command::dispatch(&mut instance, &mut session, &argv)
    };
    write_result(writer, result, &name, 0).await
}

/// Executes every line of a closed command list in order, stopping at (and
/// reporting) the first error — matching the wire protocol's contract that a
/// failing command list aborts rather than continuing past the failure.
async fn run_command_list(
    instance: &Arc<Mutex<Instance>>,
    session: &Arc<Mutex<ClientSession>>,
    writer: &mut (impl tokio::io::AsyncWrite + Unpin),
    lines: Vec<String>,
    ok_mode: bool,
) -> Result<SessionAction> {
    for (index, line) in lines.into_iter().enumerate() {
        let argv = match tokenizer::tokenize(&line) {
            Ok(argv) if !argv.is_empty() => argv,
            Ok(_) => continue,
            Err(err) => {
                writer.write_all(&Response::new().into_ack(&err, "", index as u32)).await?;
                return Ok(SessionAction::Continue);
            }
        };
        let name = argv[0].clone();
        if name == "idle" || name == "noidle" {
            let err = AckError::new(crate::error::AckCode::NotList, "idle not allowed within command list");
            writer.write_all(&Response::new().into_ack(&err, &name, index as u32)).await?;
            return Ok(SessionAction::Continue);
        }
        let result = {
            let mut instance = instance.lock().unwrap();
            let mut session = session.lock().unwrap();
            command::dispatch(&mut instance, &mut session, &argv)
        };
        match result {
            CommandResult::Ok(response) => {
                let body = if ok_mode { response.into_list_ok() } else { response_body(response) };
                writer.write_all(&body).await?;
            }
            CommandResult::Finish(response) => {
                writer.write_all(&response.into_ok()).await?;
            }
            CommandResult::Error(err) => {
                writer.write_all(&Response::new().into_ack(&err, &name, index as u32)).await?;
                return Ok(SessionAction::Continue);
            }
            CommandResult::Idle => {
                let err = AckError::new(crate::error::AckCode::NotList, "idle not allowed within command list");
                writer.write_all(&Response::new().into_ack(&err, &name, index as u32)).await?;
                return Ok(SessionAction::Continue);
            }
            CommandResult::Background => {}
            CommandResult::Close => return Ok(SessionAction::Close),
            CommandResult::Kill => return Ok(SessionAction::Kill),
        }
    }
    writer.write_all(b"OK\n").await?;
    Ok(SessionAction::Continue)
}

/// A command-list entry's body without its own terminator, since the whole
/// list shares a single trailing `OK`.
fn response_body(response: Response) -> Vec<u8> {
    let mut full = response.into_ok();
    let body_len = full.len() - b"OK\n".len();
    full.truncate(body_len);
    full
}

async fn write_result(
    writer: &mut (impl tokio::io::AsyncWrite + Unpin),
    result: CommandResult,
    command_name: &str,
    index: u32,
) -> Result<SessionAction> {
    match result {
        CommandResult::Ok(response) | CommandResult::Finish(response) => {
            writer.write_all(&response.into_ok()).await?;
            Ok(SessionAction::Continue)
        }
        CommandResult::Idle => Ok(SessionAction::Continue),
        CommandResult::Background => Ok(SessionAction::Continue),
        CommandResult::Error(err) => {
            writer.write_all(&Response::new().into_ack(&err, command_name, index)).await?;
            Ok(SessionAction::Continue)
        }
        CommandResult::Close => Ok(SessionAction::Close),
        CommandResult::Kill => Ok(SessionAction::Kill),
    }
}
