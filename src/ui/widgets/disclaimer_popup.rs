// src/ui/widgets/disclaimer_popup.rs

use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Renders the authorization notice on top of the console.
///
/// # Arguments
/// * `frame` - The frame being drawn.
/// * `area` - The full terminal area; the popup is centered inside it.
pub fn render_disclaimer_popup(frame: &mut Frame, area: Rect) {
    let disclaimer_text = Text::from(vec![
        Line::from("AUTHORIZED USE ONLY".bold().yellow()),
        Line::from(""),
        Line::from("This console launches active scanners (nmap, sslscan, testssl.sh, nikto, OWASP ZAP) against the target you enter."),
        Line::from(""),
        Line::from("Port scans and web attack simulations against systems you do not own or have written permission to test are ILLEGAL in many jurisdictions and may disrupt the target."),
        Line::from(""),
        Line::from("By continuing you confirm that:"),
        Line::from("1. Every target you scan is yours or covered by an explicit authorization."),
        Line::from("2. You accept full responsibility for the traffic this tool generates."),
        Line::from(""),
        Line::from(
            "Press ".bold() + "Enter".bold().yellow() + " to acknowledge and continue".bold(),
        ),
    ]);

    let block = Block::default()
        .title("Disclaimer")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let popup_area = centered_rect(70, 60, area);
    let popup = Paragraph::new(disclaimer_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    // Clear first so the content underneath does not bleed through.
    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

/// A `Rect` of the given percentages, centered in `r`.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(r);

    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}
