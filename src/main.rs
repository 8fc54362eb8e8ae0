use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use netstat_meter::data::format_speed_or_placeholder;
use netstat_meter::{
    default_interface_name, events, ui, App, Error, InterfaceProvider, Monitor, NetstatSource,
    ReaderSource, Settings, StreamSource, SystemInterfaces,
};

/// Exit code when no interface could be found to monitor.
const EXIT_NO_INTERFACE: u8 = 2;

/// Interface label used when replaying a capture without `--interface`.
const REPLAY_INTERFACE: &str = "replay";

#[derive(Parser, Debug)]
#[command(name = "netstat-meter")]
#[command(about = "Live bandwidth meter driven by netstat output")]
struct Args {
    /// Interface to monitor (default: the busiest non-loopback interface)
    #[arg(short, long)]
    interface: Option<String>,

    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print one line per sample instead of running the TUI
    #[arg(short, long)]
    plain: bool,

    /// Print samples as JSON objects (implies --plain)
    #[arg(long)]
    json: bool,

    /// List network interfaces and exit
    #[arg(short, long)]
    list_interfaces: bool,

    /// Replay a captured netstat transcript instead of running netstat
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;

    init_tracing(&args)?;

    if args.list_interfaces {
        list_interfaces(&SystemInterfaces);
        return Ok(ExitCode::SUCCESS);
    }

    let interface = match resolve_interface(&args, &settings) {
        Ok(interface) => interface,
        Err(Error::NoInterfaceFound) => {
            eprintln!("No network interface could be found.");
            return Ok(ExitCode::from(EXIT_NO_INTERFACE));
        }
        Err(e) => return Err(e.into()),
    };

    // The runtime drives the stream source and the chunk handler in the
    // background while the TUI owns the main thread.
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let source: Box<dyn StreamSource> = match &args.replay {
        Some(path) => Box::new(open_replay(&rt, path)?),
        None => Box::new(NetstatSource::new(settings.command.clone())),
    };
    let monitor = Monitor::new(source)
        .with_args(settings.args.clone())
        .with_marker(settings.marker.clone());

    if args.plain || args.json {
        rt.block_on(run_plain(monitor, &interface, args.json, tokio::signal::ctrl_c()))?;
    } else {
        run_tui(monitor, &interface, settings.tick())?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Install the log subscriber.
///
/// The TUI owns the terminal, so without `--log-file` it runs without logs.
fn init_tracing(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(path) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
    } else if args.plain || args.json || args.list_interfaces {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    Ok(())
}

fn resolve_interface(args: &Args, settings: &Settings) -> netstat_meter::Result<String> {
    if let Some(interface) = args.interface.clone().or_else(|| settings.interface.clone()) {
        return Ok(interface);
    }
    if args.replay.is_some() {
        return Ok(REPLAY_INTERFACE.to_string());
    }

    let interface = default_interface_name(&SystemInterfaces)?;
    info!("using default interface {}", interface);
    Ok(interface)
}

fn open_replay(
    rt: &tokio::runtime::Runtime,
    path: &Path,
) -> Result<ReaderSource<tokio::fs::File>> {
    let file = rt
        .block_on(tokio::fs::File::open(path))
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(ReaderSource::new(file, &path.display().to_string()).with_pace(Duration::from_secs(1)))
}

/// Print every interface with its totals, marking the default one.
fn list_interfaces(provider: &dyn InterfaceProvider) {
    let default = default_interface_name(provider).ok();

    println!("{:<2}{:<16} {:>16} {:>16}", "", "INTERFACE", "RECEIVED", "SENT");
    for iface in provider.interfaces() {
        let marker = if default.as_deref() == Some(iface.name.as_str()) {
            "*"
        } else {
            ""
        };
        println!(
            "{:<2}{:<16} {:>16} {:>16}",
            marker, iface.name, iface.total_received, iface.total_transmitted
        );
    }
}

/// Print samples to stdout until the session ends or `shutdown` completes.
async fn run_plain<S>(mut monitor: Monitor, interface: &str, json: bool, shutdown: S) -> Result<()>
where
    S: Future,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    monitor.start(interface, move |sample| {
        let _ = tx.send(sample);
    })?;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            sample = rx.recv() => {
                let Some(sample) = sample else { break };
                let speed_in = format_speed_or_placeholder(&sample.bytes_in);
                let speed_out = format_speed_or_placeholder(&sample.bytes_out);
                if json {
                    let line = serde_json::json!({
                        "interface": interface,
                        "bytes_in": sample.bytes_in,
                        "bytes_out": sample.bytes_out,
                        "in": speed_in,
                        "out": speed_out,
                    });
                    println!("{}", line);
                } else {
                    println!("{}  in {:>12}  out {:>12}", interface, speed_in, speed_out);
                }
            }
            _ = &mut shutdown => break,
        }
    }

    monitor.stop();
    Ok(())
}

/// Run the TUI for `interface`
fn run_tui(monitor: Monitor, interface: &str, tick: Duration) -> Result<()> {
    let mut app = App::new(monitor, interface);
    app.start()?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, &mut app, tick);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.quit();
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tick: Duration,
) -> Result<()> {
    while app.running {
        app.reload_data();

        terminal.draw(|frame| ui::render(frame, app))?;

        if let Some(Event::Key(key)) = events::poll_event(tick)? {
            events::handle_key_event(app, key);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netstat_meter::ChannelSource;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_run_plain_stops_on_shutdown() {
        let (tx, source) = ChannelSource::create("test");
        let monitor = Monitor::new(Box::new(source));
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move { run_plain(monitor, "en0", false, stop_rx).await });

        tx.send(b"packets bytes packets bytes\n".to_vec()).await.unwrap();
        tx.send(b"1 1024 1 2048\n".to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(b"2 4096 2 8192\n".to_vec()).await.unwrap();

        // Signalled once, while samples are still flowing
        stop_tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), task).await;
        assert!(result.unwrap().unwrap().is_ok());
    }
}
