use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::{
    app::AppState,
    ui::{components::card::Card, theme::Theme},
};

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let profile = &state.profile;
    let label = |text: &'static str| Span::styled(text, Style::default().fg(theme.text_muted));

    let lines = vec![
        Line::from(Span::styled(
            format!("Hello, {}", profile.display_name),
            Style::default()
                .fg(theme.text)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            label("Email"),
            Span::raw(format!(": {}", profile.email.as_deref().unwrap_or("-"))),
        ]),
        Line::from(vec![label("User"), Span::raw(format!(": {}", profile.user_id))]),
        Line::from(vec![label("Server"), Span::raw(format!(": {}", profile.api_url))]),
        Line::from(vec![label("Timezone"), Span::raw(format!(": {}", state.tz))]),
    ];

    Card::new("Profile", theme).render_with(frame, area, Paragraph::new(lines));
}
