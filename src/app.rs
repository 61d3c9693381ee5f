// src/app.rs

use ratatui::widgets::ScrollbarState;
use std::path::Path;
use strum::IntoEnumIterator;
use vanguard_rs_orchestrator::core::models::{JobId, JobRecord, ScanCategory};
use vanguard_rs_orchestrator::core::orchestrator::Admission;

/// Lines of the log file kept for the log panel.
const LOG_TAIL_LINES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// The legal notice shown at startup.
    Disclaimer,
    /// Editing the target.
    Idle,
    /// Waiting for admission (validation and DNS).
    Submitting,
    /// Job admitted, polling its status.
    Scanning,
    /// The job reached COMPLETED or FAILED.
    Finished,
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub input: String,
    pub category: ScanCategory,
    pub job_id: Option<JobId>,
    pub job: Option<JobRecord>,
    /// Admission error of the last submission, shown under the input.
    pub error: Option<String>,
    pub scroll_offset: usize,
    pub report_scroll_state: ScrollbarState,
    pub show_logs: bool,
    pub log_content: Vec<String>,
    pub log_horizontal_scroll: usize,
    pub log_horizontal_scroll_state: ScrollbarState,
    pub tick: usize,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            state: AppState::Disclaimer,
            input: String::new(),
            category: ScanCategory::default(),
            job_id: None,
            job: None,
            error: None,
            scroll_offset: 0,
            report_scroll_state: ScrollbarState::default(),
            show_logs: false,
            log_content: Vec::new(),
            log_horizontal_scroll: 0,
            log_horizontal_scroll_state: ScrollbarState::default(),
            tick: 0,
        }
    }

    pub fn acknowledge_disclaimer(&mut self) {
        self.state = AppState::Idle;
    }

    /// Cycles QUICK -> FULL -> NETWORK -> WEB -> SSL -> QUICK.
    pub fn next_category(&mut self) {
        let all: Vec<ScanCategory> = ScanCategory::iter().collect();
        let position = all.iter().position(|c| *c == self.category).unwrap_or(0);
        self.category = all[(position + 1) % all.len()];
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
        self.report_scroll_state = self.report_scroll_state.position(self.scroll_offset);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(1);
        self.report_scroll_state = self.report_scroll_state.position(self.scroll_offset);
    }

    pub fn scroll_logs_left(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_sub(4);
        self.log_horizontal_scroll_state =
            self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    pub fn scroll_logs_right(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_add(4);
        self.log_horizontal_scroll_state =
            self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    pub fn toggle_logs(&mut self) {
        self.show_logs = !self.show_logs;
    }

    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn start_submission(&mut self) -> Option<(String, ScanCategory)> {
        let target = self.input.trim().to_string();
        if target.is_empty() {
            return None;
        }
        self.error = None;
        self.state = AppState::Submitting;
        Some((target, self.category))
    }

    pub fn admitted(&mut self, admission: Admission) {
        self.job_id = Some(admission.job_id);
        self.job = None;
        self.state = AppState::Scanning;
    }

    pub fn rejected(&mut self, message: String) {
        self.error = Some(message);
        self.state = AppState::Idle;
    }

    /// Stores the latest snapshot; terminal states end the polling.
    pub fn job_updated(&mut self, record: JobRecord) {
        if record.status.is_terminal() {
            self.state = AppState::Finished;
        }
        self.job = Some(record);
    }

    /// Reloads the tail of the log file, if the panel is visible.
    pub fn refresh_logs(&mut self, path: &Path) {
        if !self.show_logs {
            return;
        }
        if let Ok(content) = std::fs::read_to_string(path) {
            let lines: Vec<&str> = content.lines().collect();
            let start = lines.len().saturating_sub(LOG_TAIL_LINES);
            self.log_content = lines[start..].iter().map(|l| l.to_string()).collect();
        }
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.job_id = None;
        self.job = None;
        self.error = None;
        self.scroll_offset = 0;
        self.report_scroll_state = ScrollbarState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanguard_rs_orchestrator::core::models::JobStatus;

    #[test]
    fn category_cycles_through_all_values() {
        let mut app = App::new();
        let mut seen = vec![app.category];
        for _ in 0..5 {
            app.next_category();
            seen.push(app.category);
        }
        assert_eq!(seen.first(), seen.last());
        assert_eq!(seen[1], ScanCategory::Full);
    }

    #[test]
    fn blank_input_is_not_submitted() {
        let mut app = App::new();
        app.acknowledge_disclaimer();
        app.input = "   ".into();
        assert!(app.start_submission().is_none());
        assert_eq!(app.state, AppState::Idle);

        app.input = " example.com ".into();
        assert_eq!(app.start_submission(), Some(("example.com".to_string(), ScanCategory::Quick)));
        assert_eq!(app.state, AppState::Submitting);

        app.admitted(Admission {
            job_id: uuid::Uuid::new_v4(),
            status: JobStatus::Queued,
            target: "example.com".into(),
        });
        assert_eq!(app.state, AppState::Scanning);
    }
}
