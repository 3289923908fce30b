#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, Registry};

use frameboard::config::{ConsoleConfig, StoreBackendKind};
use frameboard::console::{render_board, run_script};
use frameboard::ipc::{IpcStore, StoreServer};
use frameboard::session::Session;
use frameboard::store::{FileStore, StoreBackend};

#[derive(Debug, Parser)]
#[command(name = "frameboard", version, about = "Freeform dashboard layout console")]
struct Cli {
    /// Config file (defaults to the XDG config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Board width in pixels, overriding the config
    #[arg(long, global = true)]
    width: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the dashboard and print the arranged board
    Show,
    /// Replay a JSON-lines command script (stdin when no file is given)
    Run { script: Option<PathBuf> },
    /// Serve the layout document over a Unix socket
    Serve {
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}

type LevelHandle = reload::Handle<LevelFilter, Registry>;

fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

/// Level from the config file, applied only when LOG_LEVEL is not set
fn config_level(env_level: Option<&str>, config_level: &str) -> Option<LevelFilter> {
    match env_level {
        Some(_) => None,
        None => Some(parse_level(config_level)),
    }
}

fn subscriber<W>(level: LevelFilter, writer: W) -> (impl tracing::Subscriber + Send + Sync, LevelHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(level);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer));
    (subscriber, handle)
}

/// Install the global subscriber before the config is read so config
/// warnings are not lost. The level can be changed later through the handle.
fn init_logging() -> Result<LevelHandle> {
    let level = std::env::var("LOG_LEVEL")
        .map(|l| parse_level(&l))
        .unwrap_or(LevelFilter::INFO);
    let (subscriber, handle) = subscriber(level, io::stderr);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(handle)
}

fn store_backend(config: &ConsoleConfig) -> Result<StoreBackend> {
    Ok(match config.store.backend {
        StoreBackendKind::File => StoreBackend::File(FileStore::new(config.document_path())),
        StoreBackendKind::Ipc => StoreBackend::Ipc(IpcStore::new(config.socket_path()?)),
    })
}

async fn open_session(config: &ConsoleConfig, width: i32) -> Result<(Session, StoreBackend)> {
    let store = store_backend(config)?;
    let session = Session::load(&store, width, config.geometry()).await?;
    Ok((session, store))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_handle = init_logging()?;

    let config = match &cli.config {
        Some(path) => ConsoleConfig::load_from(path)?,
        None => ConsoleConfig::load()?,
    };
    let env_level = std::env::var("LOG_LEVEL").ok();
    if let Some(level) = config_level(env_level.as_deref(), &config.log_level) {
        log_handle.reload(level).context("Failed to apply log level")?;
    }
    info!(backend = ?config.store.backend, width = config.board.width, "Configuration loaded");

    let width = cli.width.unwrap_or(config.board.width).max(config.board.min_size);

    match cli.command {
        Command::Show => match open_session(&config, width).await {
            Ok((mut session, _store)) => println!("{}", render_board(&session.view())),
            Err(e) => {
                error!(error = %e, "Dashboard unavailable");
                println!("+-------------------------------+");
                println!("| Dashboard layout unavailable  |");
                println!("+-------------------------------+");
                println!("{e:#}");
                std::process::exit(1);
            }
        },
        Command::Run { script } => {
            let (mut session, store) = open_session(&config, width).await?;
            let mut out = io::stdout().lock();
            match script {
                Some(path) => {
                    let file = std::fs::File::open(&path)
                        .context(format!("Failed to open script {}", path.display()))?;
                    run_script(&mut session, &store, BufReader::new(file), &mut out).await?;
                }
                None => run_script(&mut session, &store, io::stdin().lock(), &mut out).await?,
            }
            if session.should_block_unload() {
                info!("Script ended with unsaved changes; they are discarded");
            }
        }
        Command::Serve { socket } => {
            let socket = match socket {
                Some(socket) => socket,
                None => config.socket_path()?,
            };
            let store = FileStore::new(config.document_path());
            let server = StoreServer::bind_to(socket)?;
            tokio::task::spawn_blocking(move || server.run(&store))
                .await
                .context("Store server task failed")??;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'w> MakeWriter<'w> for Captured {
        type Writer = Captured;

        fn make_writer(&'w self) -> Self::Writer {
            self.clone()
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_level(" warn "), LevelFilter::WARN);
        assert_eq!(parse_level("verbose"), LevelFilter::INFO);
    }

    #[test]
    fn test_config_level_only_without_env() {
        assert_eq!(config_level(None, "debug"), Some(LevelFilter::DEBUG));
        assert_eq!(config_level(Some("error"), "debug"), None);
    }

    #[test]
    fn test_config_clamp_warnings_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"error\"\n[board]\ngrid_size = 0\n").unwrap();

        let out = Captured::default();
        let (subscriber, handle) = subscriber(LevelFilter::INFO, out.clone());
        let config = tracing::subscriber::with_default(subscriber, || {
            let config = ConsoleConfig::load_from(&path).unwrap();
            handle.reload(parse_level(&config.log_level)).unwrap();
            tracing::warn!("after reload");
            config
        });

        assert_eq!(config.board.grid_size, 20);
        let text = out.text();
        assert!(text.contains("grid_size out of range"), "{text}");
        assert!(!text.contains("after reload"), "{text}");
    }
}
