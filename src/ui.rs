//! `ratatui` front-end: button row, rate field, event log and status bar.

use crate::log_debug;
use crate::terminal::TerminalGuard;
use crate::{ButtonStates, TimelapseApp};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Paragraph},
    Terminal,
};
use std::io;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

const ACCENT: Color = Color::Rgb(255, 176, 80);
const TITLE: Color = Color::Rgb(255, 200, 120);
const DIM: Color = Color::Rgb(110, 100, 90);
const LOG_TEXT: Color = Color::Rgb(210, 205, 200);
const INPUT_TEXT: Color = Color::Rgb(255, 220, 100);
const STATUS_TEXT: Color = Color::Rgb(160, 150, 150);

/// Configure the terminal, run the drawing loop, and tear everything down.
///
/// Any active session is stopped before returning.
pub fn run_app(app: &mut TimelapseApp) -> Result<()> {
    let mut stdout = io::stdout();
    let guard = TerminalGuard::enter(&mut stdout)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = app_loop(&mut terminal, app);
    app.shutdown();

    drop(terminal);
    drop(guard);
    result
}

fn app_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut TimelapseApp) -> Result<()> {
    terminal.draw(|frame| draw(frame, app))?;

    loop {
        app.drain_events();
        let mut should_quit = false;

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    should_quit = handle_key_event(app, key);
                }
                Event::Resize(_, _) => app.request_redraw(),
                _ => {}
            }
        }

        if app.take_redraw_request() {
            terminal.draw(|frame| draw(frame, app))?;
        }

        // Draw the "Generating" status first; the encoder blocks this thread.
        if app.take_pending_export() {
            app.run_export();
            terminal.draw(|frame| draw(frame, app))?;
        }

        if should_quit {
            break;
        }
    }
    Ok(())
}

/// Apply one keystroke. Returns true when the user asked to quit.
fn handle_key_event(app: &mut TimelapseApp, key: KeyEvent) -> bool {
    log_debug(&format!(
        "key event: {:?} with modifiers: {:?}",
        key.code, key.modifiers
    ));

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return key.code == KeyCode::Char('c');
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('s') => app.start(),
        KeyCode::Char('p') => app.pause(),
        KeyCode::Char('x') => app.stop(),
        KeyCode::Char('g') => {
            app.request_export();
        }
        KeyCode::Char(ch) if ch.is_ascii_digit() => app.push_rate_char(ch),
        KeyCode::Backspace => app.backspace_rate(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::End => app.scroll_to_bottom(),
        _ => {}
    }
    false
}

fn button_spans(buttons: &ButtonStates) -> Vec<Span<'static>> {
    let entries = [
        ("s", buttons.start_label, buttons.start_enabled),
        ("p", "Pause", buttons.pause_enabled),
        ("x", "Stop", buttons.stop_enabled),
        ("g", "Generate", buttons.generate_enabled),
    ];
    let mut spans = Vec::with_capacity(entries.len() * 2);
    for (key, label, enabled) in entries {
        let style = if enabled {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DIM)
        };
        spans.push(Span::styled(format!(" [{key}] {label} "), style));
        spans.push(Span::raw(" "));
    }
    spans
}

fn titled_block(title: String, border: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title(Span::styled(
            title,
            Style::default().fg(TITLE).add_modifier(Modifier::BOLD),
        ))
}

pub fn draw(frame: &mut ratatui::Frame<'_>, app: &TimelapseApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.size());

    let buttons = Paragraph::new(Line::from(button_spans(&app.buttons())))
        .block(titled_block(" LapseTerm ".into(), ACCENT));
    frame.render_widget(buttons, chunks[0]);

    let interval = app.controller().interval_secs();
    let rate_block = titled_block(" Frames per minute ".into(), ACCENT).title_bottom(Line::from(
        Span::styled(
            format!(" one image every {interval}s "),
            Style::default().fg(DIM),
        ),
    ));
    let rate = Paragraph::new(app.rate_input())
        .block(rate_block)
        .style(Style::default().fg(INPUT_TEXT));
    frame.render_widget(rate, chunks[1]);

    // No wrapping: one event per row keeps the scroll math exact.
    let log_area = chunks[2];
    let visible = log_area.height.saturating_sub(2) as usize;
    let lines = app.log_lines();
    let log_text = if lines.is_empty() {
        Text::from("No events yet. Press s to start a timelapse.")
    } else {
        Text::from(lines.iter().map(|line| Line::from(line.as_str())).collect::<Vec<_>>())
    };
    let top = lines
        .len()
        .saturating_sub(visible)
        .saturating_sub(app.scroll_back() as usize)
        .min(u16::MAX as usize) as u16;
    let log = Paragraph::new(log_text)
        .block(titled_block(" Log ".into(), DIM))
        .style(Style::default().fg(LOG_TEXT))
        .scroll((top, 0));
    frame.render_widget(log, log_area);

    let status = Paragraph::new(app.status_text())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(DIM))
                .title(Span::styled(
                    format!(" {} ", app.session_summary()),
                    Style::default().fg(STATUS_TEXT),
                ))
                .title_bottom(Line::from(Span::styled(
                    " q quit  ↑/↓ scroll ",
                    Style::default().fg(DIM),
                ))),
        )
        .style(Style::default().fg(STATUS_TEXT));
    frame.render_widget(status, chunks[3]);

    let inner_width = chunks[1].width.saturating_sub(2);
    let input_width = UnicodeWidthStr::width(app.rate_input()).min(u16::MAX as usize) as u16;
    let cursor_x = chunks[1]
        .x
        .saturating_add(1)
        .saturating_add(input_width.min(inner_width));
    frame.set_cursor(cursor_x, chunks[1].y + 1);
}
