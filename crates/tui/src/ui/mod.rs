pub mod components;
pub mod keymap;
pub mod screens;

mod terminal;
mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::app::{AppState, Screen};

pub use terminal::{AppTerminal as Terminal, restore_terminal, setup_terminal};
pub use theme::Theme;

pub fn render(frame: &mut Frame<'_>, state: &AppState) {
    let theme = Theme::default();
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Info bar
            Constraint::Length(2), // Tabs
            Constraint::Min(0),
            Constraint::Length(1), // Key hints
        ])
        .split(area);

    render_info_bar(frame, layout[0], state, &theme);
    components::tabs::render_tabs(frame, layout[1], state.screen, &theme);

    match state.screen {
        Screen::Home => screens::home::render(frame, layout[2], state, &theme),
        Screen::Create => screens::create::render(frame, layout[2], state, &theme),
        Screen::Profile => screens::profile::render(frame, layout[2], state, &theme),
    }

    render_bottom_bar(frame, layout[3], state, &theme);
    components::toast::render(frame, area, state.toast.as_ref());
}

fn render_info_bar(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let refreshed = state
        .home
        .list
        .updated_at
        .map(|at| at.with_timezone(&state.tz).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let (status, color) = if state.home.is_fetching() {
        ("SYNC", theme.accent)
    } else if state.home.list.is_error() {
        ("ERR", theme.error)
    } else {
        ("OK", theme.positive)
    };

    let line = Line::from(vec![
        Span::styled("Kudi", Style::default().fg(theme.accent)),
        Span::raw(format!("  {}  ", state.profile.display_name)),
        Span::styled("Refresh", Style::default().fg(theme.text_muted)),
        Span::raw(format!(": {refreshed}  ")),
        Span::styled(status, Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_bottom_bar(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    use components::tabs::hint;

    let mut parts: Vec<Span<'static>> = Vec::new();
    match state.screen {
        Screen::Home if state.home.confirm_delete.is_some() => {
            parts.extend(hint("y", " delete  ", theme));
            parts.extend(hint("n", " keep", theme));
        }
        Screen::Home => {
            parts.extend(hint("j/k", " move  ", theme));
            parts.extend(hint("r", " refresh  ", theme));
            parts.extend(hint("a", " add  ", theme));
            parts.extend(hint("d", " delete  ", theme));
            parts.extend(hint("p", " profile", theme));
        }
        Screen::Create if state.create.submitting => {
            parts.extend(hint("Esc", " cancel submit", theme));
        }
        Screen::Create => {
            parts.extend(hint("Tab", " next  ", theme));
            parts.extend(hint("←/→", " choose  ", theme));
            parts.extend(hint("Enter", " save  ", theme));
            parts.extend(hint("Esc", " back", theme));
        }
        Screen::Profile => {
            parts.extend(hint("h", " home  ", theme));
            parts.extend(hint("a", " add", theme));
        }
    }

    if state.screen != Screen::Create {
        parts.push(Span::styled("  │  ", Style::default().fg(theme.border)));
        parts.extend(hint("q", " quit", theme));
    }

    frame.render_widget(Paragraph::new(Line::from(parts)), area);
}
