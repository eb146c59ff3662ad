use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use engine::{
    Category, DESCRIPTION_MAX_CHARS, FormField, TITLE_MAX_CHARS, TransactionForm, TransactionKind,
};

use crate::{
    app::{AppState, CreateState},
    ui::{components::card::Card, theme::Theme},
};

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let create = &state.create;
    let mut constraints = vec![Constraint::Length(3); FormField::ALL.len()];
    constraints.push(Constraint::Min(0));
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (field, rect) in FormField::ALL.into_iter().zip(layout.iter()) {
        render_field(frame, *rect, create, field, theme);
    }

    let status = if create.submitting {
        Span::styled("Saving...", Style::default().fg(theme.accent))
    } else {
        Span::styled(
            "Enter to save, Esc to go back",
            Style::default().fg(theme.text_muted),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(status)), layout[FormField::ALL.len()]);
}

fn render_field(
    frame: &mut Frame<'_>,
    area: Rect,
    create: &CreateState,
    field: FormField,
    theme: &Theme,
) {
    let focused = create.focus == field;
    let error = create.errors.get(field);
    let mut block = Card::new(field.label(), theme)
        .focused(focused)
        .error(error.is_some())
        .block();
    if let Some(error) = error {
        block = block.title_bottom(Span::styled(
            format!(" {error} "),
            Style::default().fg(theme.error),
        ));
    } else if let Some(counter) = counter(&create.form, field) {
        block = block.title_bottom(Span::styled(counter, Style::default().fg(theme.text_muted)));
    }

    let content = match field {
        FormField::Kind => kind_line(create.form.kind, theme),
        FormField::Category if create.form.category.is_empty() => Line::from(Span::styled(
            "← / → to pick a category",
            Style::default().fg(theme.text_muted),
        )),
        FormField::Category => {
            let category = Category::from(create.form.category.as_str());
            Line::from(format!("{} {category}", category.icon().glyph()))
        }
        FormField::Amount => Line::from(format!("₦ {}", create.form.amount)),
        FormField::Title => Line::from(create.form.title.as_str()),
        FormField::Description => Line::from(create.form.description.as_str()),
    };

    let content = if focused && field != FormField::Kind && field != FormField::Category {
        let mut spans = content.spans;
        spans.push(Span::styled("▏", Style::default().fg(theme.accent)));
        Line::from(spans)
    } else {
        content
    };

    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn kind_line(kind: TransactionKind, theme: &Theme) -> Line<'static> {
    let option = |value: TransactionKind| {
        let style = if value == kind {
            let color = match value {
                TransactionKind::Expense => theme.negative,
                TransactionKind::Income => theme.positive,
            };
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_muted)
        };
        let marker = if value == kind { "●" } else { "○" };
        Span::styled(format!("{marker} {}", value.label()), style)
    };
    Line::from(vec![
        option(TransactionKind::Expense),
        Span::raw("   "),
        option(TransactionKind::Income),
    ])
}

/// `12/50` style length hint for the limited text fields.
fn counter(form: &TransactionForm, field: FormField) -> Option<String> {
    let (value, max) = match field {
        FormField::Title => (&form.title, TITLE_MAX_CHARS),
        FormField::Description => (&form.description, DESCRIPTION_MAX_CHARS),
        _ => return None,
    };
    Some(format!(" {}/{max} ", value.trim().chars().count()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_only_for_limited_fields() {
        let form = TransactionForm {
            title: " Coffee ".to_string(),
            ..TransactionForm::default()
        };
        assert_eq!(counter(&form, FormField::Title).as_deref(), Some(" 6/50 "));
        assert_eq!(counter(&form, FormField::Description).as_deref(), Some(" 0/200 "));
        assert_eq!(counter(&form, FormField::Amount), None);
    }
}
