// src/ui/widgets/log_view.rs

use crate::app::App;
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation},
};

const LEVELS: [&str; 5] = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

/// Colors the level token of a `tracing_subscriber::fmt` line.
fn level_style(level: &str) -> Style {
    match level {
        "ERROR" => Style::default().fg(Color::Red).bold(),
        "WARN" => Style::default().fg(Color::Yellow),
        "INFO" => Style::default().fg(Color::Green),
        _ => Style::default().fg(Color::DarkGray),
    }
}

fn styled_line(raw: &str) -> Line<'_> {
    // "<timestamp>  <LEVEL> <fields and message>"
    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(timestamp), Some(level)) if LEVELS.contains(&level) => {
            let rest_start = raw.find(level).map_or(raw.len(), |i| i + level.len());
            Line::from(vec![
                Span::styled(timestamp.to_string(), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(format!("{level:>5}"), level_style(level)),
                Span::raw(raw[rest_start..].to_string()),
            ])
        }
        _ => Line::from(raw),
    }
}

/// Renders the tail of the log file with horizontal scrolling for long lines.
pub fn render_log_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default().title("Logs (← → to scroll)").borders(Borders::ALL);
    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let max_width = app.log_content.iter().map(|line| line.chars().count()).max().unwrap_or(0);
    app.log_horizontal_scroll_state = app.log_horizontal_scroll_state.content_length(max_width);

    // Only the lines that fit are shown, newest at the bottom.
    let visible = inner_area.height.saturating_sub(1) as usize;
    let start = app.log_content.len().saturating_sub(visible);
    let log_lines: Vec<Line> = app.log_content[start..].iter().map(|l| styled_line(l)).collect();

    let log_paragraph = Paragraph::new(log_lines).scroll((0, app.log_horizontal_scroll as u16));
    frame.render_widget(log_paragraph, inner_area);

    let scrollbar = Scrollbar::new(ScrollbarOrientation::HorizontalBottom).thumb_symbol("■");
    let scrollbar_area = Rect {
        x: inner_area.x,
        y: inner_area.y + inner_area.height.saturating_sub(1),
        width: inner_area.width,
        height: 1,
    };
    frame.render_stateful_widget(scrollbar, scrollbar_area, &mut app.log_horizontal_scroll_state);
}
