// src/console.rs

use color_eyre::eyre::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};
use vanguard_rs_orchestrator::core::models::ScanCategory;
use vanguard_rs_orchestrator::core::orchestrator::{Admission, Orchestrator, SubmitRequest};

use crate::app::{App, AppState};
use crate::ui;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type AdmissionResult = Result<Admission, String>;

/// Runs the interactive console until the user quits.
pub async fn run(orchestrator: Orchestrator, log_path: PathBuf) -> Result<()> {
    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let outcome = event_loop(&mut terminal, &orchestrator, &log_path).await;

    // --- Ripristino Terminale ---
    // Restore Terminal
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;

    if !orchestrator.shutdown(SHUTDOWN_GRACE).await {
        warn!("Some scan jobs were still running at exit.");
    }
    outcome
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    orchestrator: &Orchestrator,
    log_path: &Path,
) -> Result<()> {
    let mut app = App::new();
    let (tx, mut rx) = mpsc::channel::<AdmissionResult>(1);
    let mut last_poll = Instant::now();

    while !app.should_quit {
        app.refresh_logs(log_path);
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(&mut app, orchestrator, &tx)?;
        }
        app.on_tick();

        if let Ok(admission) = rx.try_recv() {
            match admission {
                Ok(admission) => app.admitted(admission),
                Err(message) => app.rejected(message),
            }
        }

        if app.state == AppState::Scanning && last_poll.elapsed() >= POLL_INTERVAL {
            last_poll = Instant::now();
            if let Some(id) = app.job_id {
                match orchestrator.get_status(id).await {
                    Ok(record) => app.job_updated(record),
                    Err(e) => warn!(job_id = %id, error = %e, "Status poll failed."),
                }
            }
        }
    }
    Ok(())
}

fn handle_events(
    app: &mut App,
    orchestrator: &Orchestrator,
    tx: &mpsc::Sender<AdmissionResult>,
) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            match app.state {
                AppState::Disclaimer => match key.code {
                    KeyCode::Enter => app.acknowledge_disclaimer(),
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    _ => {}
                },
                AppState::Idle => handle_idle_input(app, key.code, orchestrator, tx),
                AppState::Submitting => {
                    if key.code == KeyCode::Esc {
                        app.quit();
                    }
                }
                AppState::Scanning | AppState::Finished => handle_report_input(app, key.code),
            }
        }
    }
    Ok(())
}

/// Input while editing the target. `q` is a valid hostname character here, so
/// quitting is bound to Esc.
fn handle_idle_input(
    app: &mut App,
    key_code: KeyCode,
    orchestrator: &Orchestrator,
    tx: &mpsc::Sender<AdmissionResult>,
) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Tab => app.next_category(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            if let Some((target, category)) = app.start_submission() {
                submit_in_background(orchestrator.clone(), target, category, tx.clone());
            }
        }
        _ => {}
    }
}

/// Admission resolves DNS, so it runs off the UI loop.
fn submit_in_background(
    orchestrator: Orchestrator,
    target: String,
    category: ScanCategory,
    tx: mpsc::Sender<AdmissionResult>,
) {
    tokio::spawn(async move {
        info!(host = %target, category = %category, "Submitting scan from console.");
        let request = SubmitRequest {
            target,
            category,
            ..SubmitRequest::default()
        };
        let outcome = orchestrator.submit(request, None).await.map_err(|e| e.to_string());
        let _ = tx.send(outcome).await;
    });
}

fn handle_report_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('l') => app.toggle_logs(),
        KeyCode::Left => app.scroll_logs_left(),
        KeyCode::Right => app.scroll_logs_right(),
        KeyCode::Char('n') if app.state == AppState::Finished => app.reset(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        _ => {}
    }
}
