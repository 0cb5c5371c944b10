mod app;
mod cli;
mod config;
mod error;
mod event;
mod input;
mod k8s;
mod model;
mod plugin;
mod refresh;
mod status;
mod ui;
mod view;
mod xr;

use anyhow::{Context, Result};
use app::{App, AppCommand};
use clap::Parser;
use cli::{CliArgs, CliCommand};
use config::DashboardConfig;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use error::FatalUiError;
use event::{AppEvent, spawn_worker};
use futures::StreamExt;
use k8s::{KubectlClient, MockClient, ResourceClient};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use status::StatusStore;
use std::fs::{self, File};
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep, timeout};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use view::DetailMode;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

struct Runtime {
    client: Arc<dyn ResourceClient>,
    store: StatusStore,
    config: DashboardConfig,
    tx: mpsc::UnboundedSender<AppEvent>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let debug_log = args.debug.then_some(args.debug_path.as_path());
    let log_filter = if args.debug && args.log_filter == "info" {
        "debug"
    } else {
        args.log_filter.as_str()
    };
    init_tracing(log_filter, debug_log)?;

    if let Some(CliCommand::Install { shortcut }) = &args.command {
        let descriptor = plugin::install(shortcut).await?;
        println!("installed xrefs plugin into {}", descriptor.display());
        return Ok(());
    }

    let config = DashboardConfig::from_args(&args);
    let client: Arc<dyn ResourceClient> = if config.mock {
        info!("using mock client");
        Arc::new(MockClient::new())
    } else {
        Arc::new(KubectlClient::new())
    };

    let store = StatusStore::new();
    let mut app = App::new(&config, store.clone());
    let (tx, rx) = mpsc::unbounded_channel();
    let runtime = Runtime {
        client,
        store,
        config,
        tx,
    };

    run(&mut app, &runtime, rx).await
}

fn init_tracing(level_filter: &str, debug_log: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let file = debug_log.and_then(|path| match open_debug_log(path) {
        Ok(file) => Some(file),
        Err(error) => {
            eprintln!("xrefs: debug logging disabled: {error:#}");
            None
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();
    let _ = match file {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => builder.with_writer(std::io::sink).try_init(),
    };

    Ok(())
}

fn open_debug_log(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("failed to open {}", path.display()))
}

async fn run(
    app: &mut App,
    runtime: &Runtime,
    rx: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, runtime, rx).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    runtime: &Runtime,
    mut rx: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    let theme = ui::Theme::default();
    let mut reader = EventStream::new();
    // Single-shot timer, re-armed after every firing. The first cycle starts
    // right away.
    let timer = sleep(Duration::ZERO);
    tokio::pin!(timer);

    loop {
        terminal
            .draw(|frame| ui::render(frame, app, &theme))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        let event = tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                    Some(Ok(Event::Resize(_, _))) => AppEvent::Resize,
                    Some(Ok(_)) => continue,
                    Some(Err(error)) => AppEvent::Fatal(FatalUiError::Terminal(error.to_string())),
                    None => break,
                }
            }
            () = &mut timer => {
                timer.as_mut().reset(Instant::now() + runtime.config.refresh_interval);
                AppEvent::Tick
            }
            maybe_event = rx.recv() => {
                maybe_event.unwrap_or(AppEvent::Fatal(FatalUiError::ChannelClosed))
            }
        };

        debug!("event={event:?}");
        let command = app.handle_event(event);
        execute_app_command(runtime, command);
    }

    Ok(())
}

fn execute_app_command(runtime: &Runtime, command: AppCommand) {
    match command {
        AppCommand::None => {}
        AppCommand::StartCycle { cycle } => refresh::spawn_extraction(
            Arc::clone(&runtime.client),
            runtime.config.target.clone(),
            cycle,
            runtime.config.poll_timeout,
            runtime.tx.clone(),
        ),
        AppCommand::PollStatuses {
            cycle,
            namespace,
            refs,
        } => status::spawn_fan_out(
            Arc::clone(&runtime.client),
            runtime.store.clone(),
            cycle,
            namespace,
            refs,
            runtime.config.poll_timeout,
            runtime.tx.clone(),
        ),
        AppCommand::LoadDetail {
            mode,
            title,
            command,
        } => spawn_detail_fetch(
            Arc::clone(&runtime.client),
            mode,
            title,
            command,
            runtime.config.poll_timeout,
            runtime.tx.clone(),
        ),
    }
}

fn spawn_detail_fetch(
    client: Arc<dyn ResourceClient>,
    mode: DetailMode,
    title: String,
    command: String,
    fetch_timeout: Duration,
    tx: mpsc::UnboundedSender<AppEvent>,
) {
    spawn_worker(tx, async move {
        match timeout(fetch_timeout, client.run(&command)).await {
            Ok(Ok(text)) => AppEvent::DetailLoaded { mode, title, text },
            Ok(Err(error)) => AppEvent::DetailFailed {
                message: error.to_string(),
            },
            Err(_) => AppEvent::DetailFailed {
                message: format!(
                    "{command}: timed out after {}ms",
                    fetch_timeout.as_millis()
                ),
            },
        }
    });
}

#[cfg(test)]
mod tests {
    use super::{init_tracing, open_debug_log, spawn_detail_fetch};
    use crate::event::AppEvent;
    use crate::k8s::MockClient;
    use crate::view::DetailMode;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tokio::time::Duration;

    #[tokio::test]
    async fn detail_fetch_delivers_describe_text() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_detail_fetch(
            Arc::new(MockClient::new()),
            DetailMode::Describe,
            "describe Pod/coredns".to_string(),
            "kubectl describe Pod.v1./coredns -n kube-system".to_string(),
            Duration::from_secs(1),
            tx,
        );

        match rx.recv().await {
            Some(AppEvent::DetailLoaded { mode, title, text }) => {
                assert_eq!(mode, DetailMode::Describe);
                assert_eq!(title, "describe Pod/coredns");
                assert!(text.starts_with("Name:"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn debug_log_parent_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xrefs").join("debug.log");
        open_debug_log(&path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn bad_filter_falls_back_to_info() {
        assert!(init_tracing("not a [valid filter", None).is_ok());
    }
}
