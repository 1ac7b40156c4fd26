//! Studio application state management.

use crate::agent::{error_line, IterationRecord, LoopEvent, LoopState};

/// Popup display state
#[derive(Debug, Clone, PartialEq)]
pub enum PopupState {
    /// No popup shown
    None,
    /// Generated code of the given attempt (index into `records`)
    Code(usize),
    /// Captured output of the given attempt
    Output(usize),
}

/// Kind of a run-log line, used for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    Success,
    Failure,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub kind: LogKind,
    pub text: String,
}

/// Application state for the studio UI
#[derive(Debug)]
pub struct StudioApp {
    /// Dataset profile shown in the left pane
    pub profile: String,
    /// Model used for generation
    pub model: String,
    /// Iteration bound shown in the status bar
    pub max_iterations: usize,
    /// Objective input buffer
    pub input: String,
    /// Iteration records of the current run
    pub records: Vec<IterationRecord>,
    /// Current repair-loop state
    pub state: LoopState,
    /// Whether a run is in flight
    pub running: bool,
    /// Run log lines
    pub log: Vec<LogLine>,
    /// Scroll offset for the run log (0 = follow bottom)
    pub scroll_offset: usize,
    /// Whether to show help
    pub show_help: bool,
    /// Popup display state
    pub popup: PopupState,
    /// Status message to display
    pub status_message: String,
}

impl StudioApp {
    pub fn new(
        profile: String,
        model: String,
        max_iterations: usize,
        init_objective: Option<&str>,
    ) -> Self {
        Self {
            profile,
            model,
            max_iterations,
            input: init_objective.unwrap_or_default().to_string(),
            records: Vec::new(),
            state: LoopState::Idle,
            running: false,
            log: Vec::new(),
            scroll_offset: 0,
            show_help: false,
            popup: PopupState::None,
            status_message: "Type an objective and press Enter | F1 help".to_string(),
        }
    }

    pub fn push_log(&mut self, kind: LogKind, text: impl Into<String>) {
        self.log.push(LogLine { kind, text: text.into() });
        self.scroll_to_bottom();
    }

    /// Reset per-run state; each submission is an independent session.
    pub fn begin_run(&mut self, objective: &str) {
        self.records.clear();
        self.log.clear();
        self.running = true;
        self.state = LoopState::Idle;
        self.popup = PopupState::None;
        self.status_message = "Running analysis...".to_string();
        self.push_log(LogKind::Info, format!("objective: {objective}"));
    }

    pub fn apply_loop_event(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::StateChanged(state) => {
                self.state = state;
                if state.is_terminal() {
                    self.scroll_to_bottom();
                }
            }
            LoopEvent::AttemptStarted(n) => {
                self.push_log(
                    LogKind::Info,
                    format!("attempt {n}/{}: generating code", self.max_iterations),
                );
            }
            LoopEvent::AttemptFinished(record) => {
                if record.success {
                    self.push_log(
                        LogKind::Success,
                        format!(
                            "attempt {} succeeded ({} plot files)",
                            record.attempt,
                            record.artifacts.len()
                        ),
                    );
                } else {
                    self.push_log(
                        LogKind::Failure,
                        format!("attempt {} failed: {}", record.attempt, error_line(&record.output)),
                    );
                }
                self.records.push(record);
            }
        }
    }

    pub fn finish_run(&mut self, result: Result<LoopState, String>) {
        self.running = false;
        match result {
            Ok(LoopState::Succeeded) => {
                self.status_message =
                    "Analysis succeeded | 'o' output, 'c' code, new objective to rerun".to_string();
            }
            Ok(LoopState::Exhausted) => {
                self.push_log(LogKind::Failure, "iteration bound reached without success");
                self.status_message =
                    "Analysis exhausted | 'o' last error, 'c' code, new objective to rerun"
                        .to_string();
            }
            Ok(state) => {
                self.status_message = format!("Analysis stopped in state: {state}");
            }
            Err(message) => {
                self.push_log(LogKind::Failure, format!("fatal: {message}"));
                self.status_message = "Analysis failed | F1 help".to_string();
            }
        }
    }

    pub fn last_record_index(&self) -> Option<usize> {
        self.records.len().checked_sub(1)
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Scroll run log up (show older lines)
    pub fn scroll_up(&mut self) {
        self.scroll_offset += 1;
    }

    /// Scroll run log down (show newer lines)
    pub fn scroll_down(&mut self) {
        if self.scroll_offset > 0 {
            self.scroll_offset -= 1;
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn hide_popup(&mut self) {
        self.popup = PopupState::None;
    }

    pub fn is_popup_shown(&self) -> bool {
        self.popup != PopupState::None
    }
}
