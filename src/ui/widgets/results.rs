// src/ui/widgets/results.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, Wrap},
};
use vanguard_rs_orchestrator::core::models::{JobRecord, ScanResult};

/// Lines of raw report shown per scanner.
const PREVIEW_LINES: usize = 15;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Renders the main content area based on the application state.
pub fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
    let results_block = Block::default().borders(Borders::ALL).title("Scan Results");

    let text = match app.state {
        AppState::Disclaimer => Text::default(),
        AppState::Idle => {
            let mut lines = vec![
                Line::from("Enter a domain or IPv4 address and press Enter to start the scan."),
                Line::from("Press Tab to choose the scan category."),
            ];
            if let Some(error) = &app.error {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("✗ {error}"),
                    Style::default().fg(Color::Red),
                )));
            }
            Text::from(lines)
        }
        AppState::Submitting => Text::from(Line::from(Span::styled(
            "Validating and resolving target...",
            Style::default().fg(Color::Cyan),
        ))),
        AppState::Scanning => {
            let spinner = SPINNER[app.tick % SPINNER.len()];
            let status = app.job.as_ref().map_or("QUEUED".to_string(), |j| j.status.to_string());
            Text::from(Line::from(Span::styled(
                format!("{spinner} Job {status}. External scanners can take several minutes."),
                Style::default().fg(Color::Cyan),
            )))
        }
        AppState::Finished => match &app.job {
            Some(job) => build_job_text(job),
            None => Text::default(),
        },
    };

    app.report_scroll_state = app.report_scroll_state.content_length(text.lines.len());
    let paragraph = Paragraph::new(text)
        .block(results_block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset as u16, 0));
    frame.render_widget(paragraph, area);

    if app.state == AppState::Finished {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        frame.render_stateful_widget(scrollbar, area, &mut app.report_scroll_state);
    }
}

fn build_job_text(job: &JobRecord) -> Text<'static> {
    let mut lines = Vec::new();

    if let Some(error) = &job.error {
        lines.push(Line::from(Span::styled("Job failed:", Style::default().fg(Color::Red).bold())));
        lines.push(Line::from(format!("  {error}")));
        return Text::from(lines);
    }

    for result in job.results.iter().flatten() {
        lines.extend(result_lines(result));
        lines.push(Line::from(""));
    }
    Text::from(lines)
}

fn result_lines(result: &ScanResult) -> Vec<Line<'static>> {
    let (icon, style) = if result.succeeded {
        ("✓", Style::default().fg(Color::Green))
    } else {
        ("✗", Style::default().fg(Color::Red))
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{icon} "), style),
        Span::styled(result.scanner_name.clone(), Style::default().bold().underlined()),
        Span::raw(format!("  ({:.1}s)", result.duration_ms as f64 / 1000.0)),
    ])];

    if let Some(warning) = &result.warning {
        lines.push(Line::from(Span::styled(
            format!("  ! {warning}"),
            Style::default().fg(Color::Yellow),
        )));
    }
    if result.output_truncated {
        lines.push(Line::from(Span::styled(
            "  ! tool output was truncated",
            Style::default().fg(Color::Yellow),
        )));
    }

    if let Some(reason) = &result.failure_reason {
        let kind = result.failure_kind.map(|k| k.to_string()).unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(format!("  [{kind}] "), Style::default().fg(Color::Red)),
            Span::raw(reason.clone()),
        ]));
        return lines;
    }

    let total = result.raw_output.lines().count();
    for line in result.raw_output.lines().take(PREVIEW_LINES) {
        lines.push(Line::from(Span::styled(
            format!("  {line}"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if total > PREVIEW_LINES {
        lines.push(Line::from(format!("  ... {} more lines", total - PREVIEW_LINES)));
    }
    lines
}
