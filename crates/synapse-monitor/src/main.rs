use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use synapse_monitor::app::App;
use synapse_monitor::config::{parse_bool_flag, Args, Config};
use synapse_monitor::pull::{run_cycle, ApiClient, PullChannel};
use synapse_monitor::push::{stream_url, PushChannel};
use synapse_monitor::ui;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PUSH_QUEUE_CAPACITY: usize = 256;
const PULL_QUEUE_CAPACITY: usize = 4;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args(Args::parse())?;
    init_logging(&config)?;

    if config.once {
        return run_once(&config).await;
    }
    run_dashboard(config).await
}

async fn run_once(config: &Config) -> Result<()> {
    let client = ApiClient::new(config.server_url.clone(), config.request_timeout)?;
    let cycle = run_cycle(&client).await;
    let failures = cycle.failures();
    let mut app = App::new(config.server_url.as_str());
    app.apply_pull_cycle(cycle);
    for line in ui::plain_lines(app.view()) {
        println!("{line}");
    }
    if failures == 3 {
        bail!("all requests to {} failed", config.server_url);
    }
    Ok(())
}

async fn run_dashboard(config: Config) -> Result<()> {
    let client = ApiClient::new(config.server_url.clone(), config.request_timeout)?;
    let ws_url = stream_url(&config.server_url)?;
    info!(event = "startup", server = %config.server_url, stream = %ws_url);

    let (push_tx, mut push_rx) = mpsc::channel(PUSH_QUEUE_CAPACITY);
    let (pull_tx, mut pull_rx) = mpsc::channel(PULL_QUEUE_CAPACITY);
    let pull = PullChannel::new(client, config.pull_interval, pull_tx);
    let refresh = pull.refresh_handle();
    let pull_task = pull.start();
    let push_task = PushChannel::new(ws_url, config.reconnect_delay, push_tx).start();

    let mut app = App::new(config.server_url.as_str());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut events = EventStream::new();

    let outcome: Result<()> = async {
        loop {
            terminal.draw(|frame| ui::render(frame, &app))?;
            tokio::select! {
                Some(event) = push_rx.recv() => app.apply_push_event(event),
                Some(cycle) = pull_rx.recv() => app.apply_pull_cycle(cycle),
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        if app.handle_key(key) {
                            break;
                        }
                        if app.take_refresh_request() {
                            refresh.notify_one();
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                    None => break,
                },
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    push_task.abort();
    pull_task.abort();
    info!(event = "shutdown");
    outcome
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_enabled = std::env::var("SYNAPSE_LOG_STDOUT")
        .ok()
        .and_then(|value| parse_bool_flag(&value))
        .unwrap_or(false);
    if let Some(path) = config.log_file.as_ref() {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init();
    } else if config.once {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
    } else if stdout_enabled {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
    Ok(())
}
