use engine::Money;
use ratatui::{
    style::{Modifier, Style},
    text::Span,
};

use crate::ui::theme::Theme;

/// List amount: `+ ₦50.00` for income, `- ₦3.50` for expenses.
#[must_use]
pub fn signed_label(amount: Money) -> String {
    let sign = if amount.is_negative() { "-" } else { "+" };
    format!("{sign} {}", amount.abs())
}

/// Creates a styled span for a transaction amount with semantic coloring.
#[must_use]
pub fn styled_amount(amount: Money, theme: &Theme) -> Span<'static> {
    let color = if amount.is_negative() {
        theme.negative
    } else {
        theme.positive
    };
    Span::styled(signed_label(amount), Style::default().fg(color))
}

/// Bold magnitude for summary figures; the caption carries the meaning.
#[must_use]
pub fn styled_total(amount: Money, theme: &Theme) -> Span<'static> {
    let color = if amount.is_negative() {
        theme.negative
    } else if amount.is_zero() {
        theme.text
    } else {
        theme.positive
    };
    Span::styled(
        amount.to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_is_spelled_out() {
        assert_eq!(signed_label(Money::new(-350)), "- ₦3.50");
        assert_eq!(signed_label(Money::new(500_000)), "+ ₦5000.00");
        assert_eq!(signed_label(Money::ZERO), "+ ₦0.00");
    }
}
