// src/ui/widgets/summary.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
};
use vanguard_rs_orchestrator::core::dispatch::adapters_for;
use vanguard_rs_orchestrator::core::models::JobStatus;

/// Renders the job overview: status, target, timing and adapter outcomes.
///
/// Before a job exists it lists the scanners the selected category will run.
///
/// # Arguments
/// * `frame` - The `Frame` used for rendering the UI.
/// * `app` - Application state holding the latest job snapshot.
/// * `area` - The area of this widget.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Status
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Details
        ])
        .split(area);

    let Some(job) = app.job.as_ref().filter(|_| app.state != AppState::Idle) else {
        let mut lines = vec![Line::from("SCANNERS".bold())];
        for kind in adapters_for(app.category) {
            lines.push(Line::from(format!("- {kind}")));
        }
        frame.render_widget(Paragraph::new(lines), summary_chunks[3]);
        return;
    };

    // --- Stato ---
    // Status
    let status_style = match job.status {
        JobStatus::Queued => Style::default().fg(Color::Gray),
        JobStatus::InProgress => Style::default().fg(Color::Cyan),
        JobStatus::Completed => Style::default().fg(Color::Green),
        JobStatus::Failed => Style::default().fg(Color::Red),
    };
    let status_text = Text::from(vec![
        Line::from("Job Status".bold()),
        Line::from(job.status.to_string()).style(status_style),
    ]);
    frame.render_widget(
        Paragraph::new(status_text).alignment(Alignment::Center),
        summary_chunks[0],
    );

    let expected = adapters_for(job.scan_category).len();
    let succeeded = job.succeeded_count();
    let percent = if expected == 0 { 0 } else { (succeeded * 100 / expected) as u16 };
    let gauge = Gauge::default()
        .percent(percent)
        .label(format!("{succeeded}/{expected} scanners succeeded"))
        .style(Style::default().fg(if percent == 100 {
            Color::Green
        } else if percent >= 50 {
            Color::Yellow
        } else {
            Color::Red
        }));
    frame.render_widget(gauge, summary_chunks[1]);

    let mut details = vec![
        Line::from(vec![
            Span::raw("Target:   "),
            Span::styled(job.target.clone(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(format!("IP:       {}", job.resolved_ip)),
        Line::from(format!("Category: {}", job.scan_category)),
        Line::from(format!("Created:  {}", job.created_at.format("%H:%M:%S"))),
    ];
    if let Some(started) = job.started_at {
        details.push(Line::from(format!("Started:  {}", started.format("%H:%M:%S"))));
        if let Some(finished) = job.finished_at {
            let elapsed = (finished - started).num_seconds();
            details.push(Line::from(format!("Duration: {elapsed}s")));
        }
    }
    if job.status == JobStatus::Completed {
        details.push(Line::from(""));
        details.push(Line::from(vec![
            Span::raw("Failed scanners: "),
            Span::styled(job.failed_count().to_string(), Style::default().fg(Color::Red)),
        ]));
    }
    frame.render_widget(Paragraph::new(details), summary_chunks[3]);
}
