//! UI layout and rendering logic for the studio.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::app::{LogKind, PopupState, StudioApp};

/// Render the main UI
pub fn render_ui(frame: &mut Frame, app: &StudioApp) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Dataset + run panes
            Constraint::Length(3), // Objective input
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(main_layout[0]);

    render_dataset_pane(frame, app, panes[0]);
    render_run_pane(frame, app, panes[1]);
    render_input_area(frame, app, main_layout[1]);
    render_status_bar(frame, app, main_layout[2]);

    if app.show_help {
        render_help_overlay(frame);
    }

    match &app.popup {
        PopupState::Code(i) => {
            if let Some(rec) = app.records.get(*i) {
                render_text_popup(
                    frame,
                    &format!("Generated Code (attempt {})", rec.attempt),
                    &rec.code,
                );
            }
        }
        PopupState::Output(i) => {
            if let Some(rec) = app.records.get(*i) {
                let title = if rec.success {
                    format!("Output (attempt {})", rec.attempt)
                } else {
                    format!("Error Output (attempt {})", rec.attempt)
                };
                render_text_popup(frame, &title, &rec.output);
            }
        }
        PopupState::None => {}
    }
}

/// Render the dataset profile pane
fn render_dataset_pane(frame: &mut Frame, app: &StudioApp, area: Rect) {
    let paragraph = Paragraph::new(app.profile.as_str())
        .block(Block::default().borders(Borders::ALL).title("Dataset"))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Render the run log pane
fn render_run_pane(frame: &mut Frame, app: &StudioApp, area: Rect) {
    let mut content_lines = Vec::new();
    for line in &app.log {
        let style = match line.kind {
            LogKind::Info => Style::default().fg(Color::Yellow),
            LogKind::Success => Style::default().fg(Color::Green),
            LogKind::Failure => Style::default().fg(Color::Red),
        };
        for text_line in line.text.lines() {
            content_lines.push(Line::from(vec![Span::styled(text_line.to_string(), style)]));
        }
    }

    let title = format!("Analysis Run | Model: {}", app.model);

    // Calculate scrolling
    let available_height = area.height.saturating_sub(2) as usize; // Account for borders
    let total_lines = content_lines.len();

    let mut paragraph = Paragraph::new(Text::from(content_lines))
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });

    if total_lines > available_height {
        // When scroll_offset is 0, follow the bottom
        let scroll_y = if app.scroll_offset == 0 {
            total_lines.saturating_sub(available_height) as u16
        } else {
            let max_scroll = total_lines.saturating_sub(available_height);
            let actual_offset = app.scroll_offset.min(max_scroll);
            (total_lines
                .saturating_sub(available_height)
                .saturating_sub(actual_offset)) as u16
        };
        paragraph = paragraph.scroll((scroll_y, 0));
    }

    frame.render_widget(paragraph, area);
}

/// Render the objective input area
fn render_input_area(frame: &mut Frame, app: &StudioApp, area: Rect) {
    let title = if app.running {
        "Objective (run in progress)"
    } else {
        "Objective (Enter to run, 'c' code, 'o' output, exit() to quit)"
    };
    let paragraph = Paragraph::new(app.input.as_str())
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, app: &StudioApp, area: Rect) {
    let status_text = format!(
        "{} | state: {} | attempts: {}/{}",
        app.status_message,
        app.state,
        app.records.len(),
        app.max_iterations
    );
    let paragraph =
        Paragraph::new(status_text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(paragraph, area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame) {
    let area = frame.area();
    let popup_area = centered_rect(80, 70, area);
    frame.render_widget(Clear, popup_area);

    let help_lines = vec![
        Line::from("Studio Help"),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  ↑/↓        - Scroll the run log"),
        Line::from("  Ctrl+C     - Quit"),
        Line::from("  F1         - Toggle this help"),
        Line::from(""),
        Line::from("Input:"),
        Line::from("  Enter      - Run the analysis with the typed objective"),
        Line::from("  c          - Show the last attempt's generated code"),
        Line::from("  o          - Show the last attempt's output"),
        Line::from("  exit()     - Quit the studio"),
    ];

    let help_paragraph = Paragraph::new(Text::from(help_lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .title_style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(help_paragraph, popup_area);
}

/// Render a scrolling text popup for code or captured output
fn render_text_popup(frame: &mut Frame, title: &str, body: &str) {
    let area = frame.area();
    let popup_area = centered_rect(85, 75, area);
    frame.render_widget(Clear, popup_area);

    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Body
            Constraint::Length(2), // Instructions
        ])
        .split(popup_area);

    let body_paragraph = Paragraph::new(body)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .title_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(body_paragraph, popup_layout[0]);

    let instructions = Paragraph::new("Press any key to close")
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(instructions, popup_layout[1]);
}

/// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
