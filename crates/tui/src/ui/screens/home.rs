use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use api_types::transaction::Transaction;
use chrono_tz::Tz;
use engine::format_date;

use crate::{
    app::AppState,
    ui::{
        components::{
            card::{Card, StatCard},
            money::{styled_amount, styled_total},
        },
        theme::Theme,
    },
};

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    render_summary(frame, layout[0], state, theme);
    render_list(frame, layout[1], state, theme);

    if let Some(id) = &state.home.confirm_delete {
        render_confirm(frame, layout[1], state, id, theme);
    }
}

fn render_summary(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let summary = state.home.summary();
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    StatCard::new("Balance", styled_total(summary.balance, theme), theme).render(frame, cols[0]);
    StatCard::new("Income", styled_total(summary.income, theme), theme).render(frame, cols[1]);
    StatCard::new("Expenses", styled_total(-summary.expenses, theme), theme)
        .render(frame, cols[2]);
}

fn render_list(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let home = &state.home;
    let card = Card::new("Recent Transactions", theme).focused(true);

    if home.list.data.is_none() {
        let message = if home.list.is_error() {
            let error = home.list.error.as_deref().unwrap_or("unknown error");
            Line::from(vec![
                Span::styled(
                    format!("Failed to load transactions: {error}"),
                    Style::default().fg(theme.error),
                ),
                Span::styled("  (r to retry)", Style::default().fg(theme.text_muted)),
            ])
        } else {
            Line::from(Span::styled(
                "Loading transactions...",
                Style::default().fg(theme.text_muted),
            ))
        };
        card.render_with(frame, area, Paragraph::new(message).alignment(Alignment::Center));
        return;
    }

    if home.list.is_empty() {
        let lines = vec![
            Line::from("No transactions yet"),
            Line::from(Span::styled(
                "Press a to add your first one",
                Style::default().fg(theme.text_muted),
            )),
        ];
        card.render_with(frame, area, Paragraph::new(lines).alignment(Alignment::Center));
        return;
    }

    let items = home
        .items()
        .iter()
        .map(|tx| list_item(tx, state.tz, theme))
        .collect::<Vec<_>>();

    let mut list_state = ListState::default();
    list_state.select(Some(home.selected));

    let list = List::new(items)
        .block(card.block())
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("» ");
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn list_item(tx: &Transaction, tz: Tz, theme: &Theme) -> ListItem<'static> {
    let date = tx
        .timestamp()
        .map(|raw| format_date(raw, tz))
        .unwrap_or_default();

    let mut lines = vec![Line::from(vec![
        Span::raw(format!("{} ", tx.category.icon().glyph())),
        Span::styled(tx.title.clone(), Style::default().fg(theme.text)),
        Span::raw("  "),
        styled_amount(tx.amount, theme),
    ])];

    let mut meta = vec![Span::styled(
        format!("   {}  {date}", tx.category),
        Style::default().fg(theme.text_muted),
    )];
    if let Some(description) = tx.description() {
        meta.push(Span::styled(
            format!("  · {description}"),
            Style::default().fg(theme.text_muted),
        ));
    }
    lines.push(Line::from(meta));

    ListItem::new(lines)
}

fn render_confirm(frame: &mut Frame<'_>, area: Rect, state: &AppState, id: &str, theme: &Theme) {
    let title = state
        .home
        .items()
        .iter()
        .find(|tx| tx.id == id)
        .map_or("this transaction", |tx| tx.title.as_str());
    let message = format!("Delete \"{title}\"? (y/n)");

    let width = (message.chars().count() as u16 + 4).min(area.width);
    let rect = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(3) / 2,
        width,
        height: 3.min(area.height),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.negative));
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(message)
            .alignment(Alignment::Center)
            .block(block),
        rect,
    );
}
