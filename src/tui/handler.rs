//! Async event handler for studio mode.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use tokio::sync::mpsc;

use crate::{
    agent::{AnalysisRequest, RepairLoop, Session},
    config::Config,
    dataset::Dataset,
    llm::LlmClient,
    prompt,
    sandbox::PythonSandbox,
};

use super::{
    app::{PopupState, StudioApp},
    events::StudioEvent,
    ui::render_ui,
};

/// Run an interactive analysis session over the given dataset.
#[allow(clippy::too_many_arguments)]
pub async fn run_studio(
    cfg: &Config,
    file: PathBuf,
    objective: Option<&str>,
    hardware: Option<&str>,
    model: Option<&str>,
    max_iterations: Option<usize>,
    temperature: f32,
    top_p: f32,
) -> Result<()> {
    // Load and validate everything fallible before touching the terminal.
    let dataset = Dataset::load(&crate::dataset::resolve_input(&cfg.data_path(), &file))?;
    let template = AnalysisRequest::from_parts(
        cfg,
        objective,
        hardware,
        model,
        max_iterations,
        temperature,
        top_p,
    )?;
    // Fail on missing credentials now, not mid-session.
    LlmClient::from_config(cfg)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = StudioApp::new(
        dataset.profile(),
        template.model.clone(),
        template.max_iterations,
        objective,
    );

    let (event_tx, event_rx) = mpsc::unbounded_channel::<StudioEvent>();

    let result = run_app(
        &mut terminal,
        &mut app,
        cfg.clone(),
        dataset,
        template,
        event_tx,
        event_rx,
    )
    .await;

    // Restore terminal
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut StudioApp,
    cfg: Config,
    dataset: Dataset,
    template: AnalysisRequest,
    event_tx: mpsc::UnboundedSender<StudioEvent>,
    mut event_rx: mpsc::UnboundedReceiver<StudioEvent>,
) -> Result<()> {
    // Spawn input handler
    let input_tx = event_tx.clone();
    tokio::task::spawn_blocking(move || {
        loop {
            // Poll for keyboard events
            if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                if let Ok(Event::Key(key)) = event::read() {
                    if input_tx.send(StudioEvent::Key(key)).is_err() {
                        break; // Channel closed
                    }
                }
            }
        }
    });

    loop {
        terminal.draw(|frame| render_ui(frame, app))?;

        if let Ok(studio_event) = event_rx.try_recv() {
            match studio_event {
                StudioEvent::Key(key) => {
                    if handle_key_event(app, key, &cfg, &dataset, &template, &event_tx) {
                        break; // Quit requested
                    }
                }
                StudioEvent::Loop(loop_event) => {
                    app.apply_loop_event(loop_event);
                }
                StudioEvent::RunFinished(result) => {
                    app.finish_run(result);
                }
            }
        }

        // Small delay to prevent busy waiting
        tokio::time::sleep(Duration::from_millis(16)).await;
    }

    Ok(())
}

/// Handle keyboard events. Returns true when the app should quit.
fn handle_key_event(
    app: &mut StudioApp,
    key: crossterm::event::KeyEvent,
    cfg: &Config,
    dataset: &Dataset,
    template: &AnalysisRequest,
    event_tx: &mpsc::UnboundedSender<StudioEvent>,
) -> bool {
    // Any key closes an open popup
    if app.is_popup_shown() {
        app.hide_popup();
        return false;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return true; // Quit
        }
        KeyCode::F(1) => {
            app.toggle_help();
        }
        KeyCode::Up => {
            app.scroll_up();
        }
        KeyCode::Down => {
            app.scroll_down();
        }
        KeyCode::Enter => {
            if app.show_help {
                app.show_help = false;
                return false;
            }
            let input = app.input.trim().to_string();
            match input.as_str() {
                "exit()" => return true,
                "c" => {
                    if let Some(i) = app.last_record_index() {
                        app.popup = PopupState::Code(i);
                    }
                    app.clear_input();
                }
                "o" => {
                    if let Some(i) = app.last_record_index() {
                        app.popup = PopupState::Output(i);
                    }
                    app.clear_input();
                }
                "" => {}
                _ => {
                    if !app.running {
                        start_analysis(app, cfg, dataset, template, &input, event_tx);
                        app.clear_input();
                    }
                }
            }
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(c) => {
            app.input.push(c);
        }
        _ => {}
    }

    false
}

/// Kick off one analysis run on a background task, streaming loop progress
/// back through the event channel.
fn start_analysis(
    app: &mut StudioApp,
    cfg: &Config,
    dataset: &Dataset,
    template: &AnalysisRequest,
    objective: &str,
    event_tx: &mpsc::UnboundedSender<StudioEvent>,
) {
    app.begin_run(objective);

    let mut request = template.clone();
    request.objective = if objective.is_empty() {
        prompt::DEFAULT_OBJECTIVE.to_string()
    } else {
        objective.to_string()
    };

    let cfg = cfg.clone();
    let dataset = dataset.clone();
    let tx = event_tx.clone();
    tokio::spawn(async move {
        let client = match LlmClient::from_config(&cfg) {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.send(StudioEvent::RunFinished(Err(e.to_string())));
                return;
            }
        };
        let sandbox = PythonSandbox::from_config(&cfg);
        let plots_dir = cfg.plots_path().display().to_string();

        let (loop_tx, mut loop_rx) = mpsc::unbounded_channel();
        let forward_tx = tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(loop_event) = loop_rx.recv().await {
                if forward_tx.send(StudioEvent::Loop(loop_event)).is_err() {
                    break;
                }
            }
        });

        let mut session = Session::new(request, dataset);
        let result = {
            let repair = RepairLoop::new(&client, &sandbox, plots_dir).with_events(loop_tx);
            repair.run(&mut session).await
        };
        let _ = forwarder.await;
        let _ = tx.send(StudioEvent::RunFinished(result.map_err(|e| e.to_string())));
    });
}
