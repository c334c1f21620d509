use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use global_hotkey::{GlobalHotKeyEvent, HotKeyState};
use std::time::Duration;
use textshot_core::hotkey::{GlobalHotkeyBackend, HotkeyRegistry, KeyCombo};
use textshot_core::session::CaptureOutcome;
use textshot_core::snapshot::privacy_settings_url;
use textshot_core::{AppError, DeliveryMode, TextShot, init};
use tokio::runtime::Handle;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Copy recognized text to the clipboard
    #[arg(short, long, conflicts_with = "window")]
    copy: bool,

    /// Show recognized text in a floating window
    #[arg(short, long)]
    window: bool,

    /// Language hints for recognition (repeatable), e.g. -l eng -l deu
    #[arg(short, long = "lang")]
    languages: Vec<String>,

    /// Select which monitor to capture
    #[arg(long, default_value_t = 0)]
    monitor: usize,

    /// List available monitors and exit
    #[arg(long)]
    list_monitors: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run in the background and capture on the configured hotkey
    Daemon,
}

#[tokio::main]
async fn main() -> Result<()> {
    init();
    env_logger::init();
    let args = Args::parse();

    let mut app = TextShot::new().context("Failed to load configuration")?;

    if args.list_monitors {
        println!("Available monitors:");
        for info in app
            .list_monitors()
            .context("Failed to enumerate monitors")?
        {
            println!("{}", info);
        }
        return Ok(());
    }

    // Command-line flags win over environment and persisted settings.
    if !args.languages.is_empty() {
        app.config_mut().language_override = Some(args.languages.clone());
    }
    if args.window {
        app.settings_mut().delivery = DeliveryMode::Window;
    } else if args.copy {
        app.settings_mut().delivery = DeliveryMode::Clipboard;
    }

    match args.command {
        Some(Command::Daemon) => run_daemon(app, args.monitor).await,
        None => run_once(app, args.monitor).await,
    }
}

/// One-shot mode: capture, recognize, deliver, exit.
async fn run_once(mut app: TextShot, monitor: usize) -> Result<()> {
    let mut orchestrator = app
        .build_orchestrator(monitor, Handle::current())
        .context("Failed to initialize capture pipeline")?;

    let outcome = orchestrator.trigger_capture();
    app.persist_permission_flag(&orchestrator)?;

    match outcome {
        Ok(CaptureOutcome::Pending) => {
            // Wait for the background crop + recognition to land.
            while orchestrator.live_session_id().is_some() {
                orchestrator.pump();
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
            orchestrator.pump();
        }
        Ok(CaptureOutcome::Cancelled) => {
            println!("Selection cancelled");
        }
        Err(AppError::PermissionDenied) => explain_permission(),
        Err(e) => return Err(e).context("Capture failed"),
    }

    Ok(())
}

/// Daemon mode: park on the configured global hotkey until interrupted.
async fn run_daemon(mut app: TextShot, monitor: usize) -> Result<()> {
    let mut orchestrator = app
        .build_orchestrator(monitor, Handle::current())
        .context("Failed to initialize capture pipeline")?;

    let combo = KeyCombo::parse(&app.settings().hotkey)
        .with_context(|| format!("Invalid hotkey '{}'", app.settings().hotkey))?;
    let backend = GlobalHotkeyBackend::new().context("Failed to initialize hotkey manager")?;
    let mut registry = HotkeyRegistry::new(backend);

    let (trigger_tx, trigger_rx) = std::sync::mpsc::channel();
    match registry.register(combo, move || {
        let _ = trigger_tx.send(());
    }) {
        Ok(_) => log::info!("daemon running; press {} to capture", app.settings().hotkey),
        // Not fatal: captures stay reachable by running `textshot` directly.
        Err(e) => log::warn!("hotkey unavailable: {e}"),
    }

    let hotkey_events = GlobalHotKeyEvent::receiver();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                while let Ok(event) = hotkey_events.try_recv() {
                    if event.state() == HotKeyState::Pressed {
                        registry.handle_os_event(event.id());
                    }
                }
                registry.poll();

                while trigger_rx.try_recv().is_ok() {
                    match orchestrator.trigger_capture() {
                        Err(AppError::PermissionDenied) => explain_permission(),
                        Err(e) => log::warn!("capture failed: {e}"),
                        Ok(_) => {}
                    }
                    app.persist_permission_flag(&orchestrator)?;
                }
                orchestrator.pump();
            }
        }
    }

    orchestrator.teardown_active();
    registry.unregister_all();
    Ok(())
}

fn explain_permission() {
    eprintln!("textshot needs screen-recording permission to capture your screen.");
    match privacy_settings_url() {
        Some(url) => eprintln!("Grant it in the system privacy settings: {url}"),
        None => eprintln!("Grant it in your system privacy settings, then try again."),
    }
}
