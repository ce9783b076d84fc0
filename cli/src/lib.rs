mod cli;
mod surface;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
pub use cli::Cli;
pub use cli::Command;
use studio_backend_client::Backend;
use studio_backend_client::BackendClient;
use studio_channel::Channel;
use studio_channel::ChannelEvent;
use studio_channel::ConnectionState;
use studio_channel::WsTransport;
use studio_core::Studio;
use studio_core::chat::ChatSession;
use studio_core::chat::ChatUpdate;
use studio_core::chat::EntryKind;
use studio_core::config::Config;
use studio_core::config::ConfigOverrides;
use studio_core::notifications::Level;
use studio_core::terminal::TerminalSession;
use studio_protocol::chat::ChatEvent;
use studio_protocol::terminal::TerminalFrame;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tracing::debug;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::surface::StdoutSurface;

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    let default_level = "warn";
    let _ = tracing_subscriber::fmt()
        // Fall back to `default_level` if RUST_LOG is unset or invalid.
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let session_id = match &cli.command {
        Command::Chat { session, .. } => session.clone(),
        _ => None,
    };
    let config = Config::load_with_overrides(ConfigOverrides {
        config_path: cli.config_path.clone(),
        api_base: cli.api_base.clone(),
        session_id,
        ..Default::default()
    })?;
    debug!("using backend at {}", config.api_base);

    let client = BackendClient::new(config.api_base.clone())
        .context("failed to build HTTP client")?
        .with_user_agent(concat!("studio/", env!("CARGO_PKG_VERSION")));
    let backend: Arc<dyn Backend> = Arc::new(client);
    let mut studio = Studio::new(config, Arc::clone(&backend));

    let result = match cli.command {
        Command::Health { watch } => health(&mut studio, watch).await,
        Command::Ls { path } => ls(backend.as_ref(), path.as_deref().unwrap_or_default()).await,
        Command::Find { query, limit } => find(&mut studio, &query, limit).await,
        Command::Chat { prompt, .. } => chat(&mut studio, prompt).await,
        Command::Terminal => terminal(studio.config()).await,
        Command::Test => run_tests(&mut studio).await,
        Command::Search { query } => search(&mut studio, &query).await,
    };
    flush_notifications(&mut studio);
    result
}

async fn health(studio: &mut Studio, watch: bool) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(studio.config().health_poll_interval());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = ticker.tick() => {}
        }
        let status = studio.refresh_health().await;
        println!(
            "api: {}  project: {}  codex: {}",
            status.api,
            status.project_root.as_deref().unwrap_or("-"),
            if status.codex_configured { "configured" } else { "not configured" },
        );
        if !watch {
            return Ok(());
        }
    }
}

async fn ls(backend: &dyn Backend, path: &str) -> anyhow::Result<()> {
    let items = backend.list_dir(path).await?;
    for item in items {
        if item.dir {
            println!("{}/", item.path);
        } else {
            println!("{}", item.path);
        }
    }
    Ok(())
}

async fn find(studio: &mut Studio, query: &str, limit: Option<usize>) -> anyhow::Result<()> {
    studio.open_quick_open().await;
    if studio.quick_open().needs_fetch() {
        anyhow::bail!("could not load the file index");
    }
    studio.set_quick_open_query(query);
    let results = studio.quick_open_results();
    for file_match in results.iter().take(limit.unwrap_or(usize::MAX)) {
        println!("{}", file_match.path);
    }
    Ok(())
}

async fn chat(studio: &mut Studio, prompt: String) -> anyhow::Result<()> {
    let config = studio.config().clone();
    let transport = WsTransport::new(config.chat_url()).with_probe(config.health_url());
    let mut channel = Channel::<ChatEvent>::open(transport, config.backoff_policy());
    let handle = channel.handle();
    let mut session = ChatSession::new(config.session_id.clone());
    session.set_input(prompt);
    let mut sent = false;
    let mut stdout = std::io::stdout();

    loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = channel.next_event() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let opened = matches!(event, ChannelEvent::State(ConnectionState::Open));
        let interrupted = reply_interrupted(sent, &event);
        let partial = match &event {
            ChannelEvent::Event(ChatEvent::Partial(frame)) => Some(frame.payload.text.clone()),
            _ => None,
        };
        let update = session.handle_channel_event(event, studio.notifications_mut());
        flush_notifications(studio);
        if interrupted {
            // A new connection will not resume this reply.
            writeln!(stdout)?;
            channel.shutdown().await;
            anyhow::bail!("connection lost before the reply finished");
        }

        if opened && !sent {
            match session.send_prompt(&handle) {
                Ok(message_id) => {
                    debug!("sent prompt {message_id}");
                    sent = true;
                }
                Err(err) => warn!("prompt not sent, waiting for reconnect: {err}"),
            }
            continue;
        }
        if let Some(text) = partial {
            write!(stdout, "{text}")?;
            stdout.flush()?;
        }
        match update {
            ChatUpdate::StreamFinished(_) if sent => {
                writeln!(stdout)?;
                break;
            }
            ChatUpdate::Transcript => {
                if let Some(entry) = session.transcript().last()
                    && entry.kind == EntryKind::Synthetic
                {
                    writeln!(stdout, "\n[{}]", entry.text)?;
                }
            }
            _ => {}
        }
    }

    channel.shutdown().await;
    Ok(())
}

/// The connection dropped while a sent prompt was still awaiting its reply.
fn reply_interrupted<E>(sent: bool, event: &ChannelEvent<E>) -> bool {
    sent && matches!(event, ChannelEvent::State(ConnectionState::Closed))
}

async fn terminal(config: &Config) -> anyhow::Result<()> {
    let transport = WsTransport::new(config.terminal_url()).with_probe(config.health_url());
    let mut channel = Channel::<TerminalFrame>::open(transport, config.backoff_policy());
    let handle = channel.handle();
    let surface = StdoutSurface::new(config.terminal.size());
    let mut session = TerminalSession::new(surface, config.terminal.wake_on_connect);
    session.resize(&handle);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = channel.next_event() => match event {
                Some(event) => session.handle_channel_event(event, &handle),
                None => break,
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !session.key(&format!("{line}\n"), &handle) {
                        warn!("terminal not connected; input dropped");
                    }
                }
                None => break,
            },
        }
    }

    channel.shutdown().await;
    Ok(())
}

async fn run_tests(studio: &mut Studio) -> anyhow::Result<()> {
    let output = studio.run_tests().await?;
    print!("{}", output.stdout);
    if !output.ok {
        anyhow::bail!("tests failed (exit code {})", output.code.unwrap_or(-1));
    }
    Ok(())
}

async fn search(studio: &mut Studio, query: &str) -> anyhow::Result<()> {
    for hit in studio.search(query).await? {
        println!("{}:{}: {}", hit.path, hit.line, hit.text.trim());
    }
    Ok(())
}

fn flush_notifications(studio: &mut Studio) {
    for notice in studio.notifications_mut().drain() {
        let tag = match notice.level {
            Level::Info => "info",
            Level::Success => "ok",
            Level::Error => "error",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
}
