//! Client-side validation of the "new transaction" form.
//!
//! Validation collects every field error at once so the UI can show them next
//! to their inputs; any error blocks submission.

use std::{collections::BTreeMap, fmt};

use crate::{Category, Money};

/// Maximum title length, in characters.
pub const TITLE_MAX_CHARS: usize = 50;
/// Maximum description length, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// Expense/income toggle. The amount typed by the user is always positive;
/// the kind decides the sign that is submitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    #[default]
    Expense,
    Income,
}

impl TransactionKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Expense => "Expense",
            Self::Income => "Income",
        }
    }

    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Expense => Self::Income,
            Self::Income => Self::Expense,
        }
    }

    /// Applies the sign of this kind to `amount`, whatever its current sign.
    #[must_use]
    pub fn apply(self, amount: Money) -> Money {
        match self {
            Self::Expense => -amount.abs(),
            Self::Income => amount.abs(),
        }
    }

    /// Kind implied by a signed amount.
    #[must_use]
    pub fn of(amount: Money) -> Self {
        if amount.is_negative() {
            Self::Expense
        } else {
            Self::Income
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormField {
    Title,
    Amount,
    Kind,
    Category,
    Description,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::Title,
        FormField::Amount,
        FormField::Kind,
        FormField::Category,
        FormField::Description,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Amount => "Amount",
            Self::Kind => "Transaction Type",
            Self::Category => "Category",
            Self::Description => "Description (Optional)",
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    #[must_use]
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Per-field validation messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormErrors {
    errors: BTreeMap<FormField, &'static str>,
}

impl FormErrors {
    #[must_use]
    pub fn get(&self, field: FormField) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &'static str)> + '_ {
        self.errors.iter().map(|(field, msg)| (*field, *msg))
    }

    fn insert(&mut self, field: FormField, message: &'static str) {
        self.errors.entry(field).or_insert(message);
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {message}", field.label())?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

/// Raw form input, as typed by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionForm {
    pub title: String,
    pub amount: String,
    pub category: String,
    pub kind: TransactionKind,
    pub description: String,
}

/// A form that passed validation, with the sign already applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidTransaction {
    pub title: String,
    pub amount: Money,
    pub category: Category,
    pub description: Option<String>,
}

impl TransactionForm {
    pub fn validate(&self) -> Result<ValidTransaction, FormErrors> {
        let mut errors = FormErrors::default();

        let title = self.title.trim();
        if title.is_empty() {
            errors.insert(FormField::Title, "Title is required");
        } else if title.chars().count() > TITLE_MAX_CHARS {
            errors.insert(FormField::Title, "Title too long");
        }

        let amount = match parse_amount(&self.amount) {
            Ok(amount) => Some(amount),
            Err(message) => {
                errors.insert(FormField::Amount, message);
                None
            }
        };

        let category = self.category.trim();
        let category = if category.is_empty() {
            errors.insert(FormField::Category, "Category is required");
            None
        } else {
            match Category::parse_known(category) {
                Ok(category) => Some(category),
                Err(_) => {
                    errors.insert(FormField::Category, "Unknown category");
                    None
                }
            }
        };

        let description = self.description.trim();
        if description.chars().count() > DESCRIPTION_MAX_CHARS {
            errors.insert(FormField::Description, "Description too long");
        }

        match (amount, category) {
            (Some(amount), Some(category)) if errors.is_empty() => Ok(ValidTransaction {
                title: title.to_string(),
                amount: self.kind.apply(amount),
                category,
                description: (!description.is_empty()).then(|| description.to_string()),
            }),
            _ => Err(errors),
        }
    }

    /// Clears every field back to its default, expense selected.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn field_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::Title => Some(&mut self.title),
            FormField::Amount => Some(&mut self.amount),
            FormField::Category => Some(&mut self.category),
            FormField::Description => Some(&mut self.description),
            FormField::Kind => None,
        }
    }
}

/// Parses the amount field into a positive value.
///
/// A leading `₦` and surrounding whitespace are ignored. Anything else that
/// is not a plain decimal number is rejected rather than cleaned up.
fn parse_amount(input: &str) -> Result<Money, &'static str> {
    const NOT_POSITIVE: &str = "Amount must be positive";
    const INVALID: &str = "Invalid amount";

    let trimmed = input.trim();
    let raw = trimmed.strip_prefix('₦').unwrap_or(trimmed).trim_start();
    if raw.is_empty() || raw.starts_with('-') {
        return Err(NOT_POSITIVE);
    }

    let amount = match raw.parse::<Money>() {
        Ok(amount) => amount,
        Err(_) => round_to_kobo(raw).ok_or(INVALID)?,
    };
    if amount.is_positive() {
        Ok(amount)
    } else {
        Err(NOT_POSITIVE)
    }
}

/// Rounds a plain decimal with more than two fractional digits half up to
/// the nearest kobo.
fn round_to_kobo(raw: &str) -> Option<Money> {
    let (naira, frac) = raw.split_once(['.', ','])?;
    if frac.len() <= 2 || !naira.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    let kept = format!("{naira}.{}", &frac[..2]).parse::<Money>().ok()?;
    let carry = i64::from(frac.as_bytes()[2] >= b'5');
    Some(Money::new(kept.kobo().checked_add(carry)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coffee(kind: TransactionKind) -> TransactionForm {
        TransactionForm {
            title: "Coffee".to_string(),
            amount: "3.5".to_string(),
            category: "Food & Drinks".to_string(),
            kind,
            description: String::new(),
        }
    }

    #[test]
    fn expense_is_submitted_negative() {
        let valid = coffee(TransactionKind::Expense).validate().unwrap();
        assert_eq!(valid.amount, Money::new(-350));
        assert_eq!(valid.category, Category::FoodAndDrinks);
        assert_eq!(valid.title, "Coffee");
        assert_eq!(valid.description, None);
    }

    #[test]
    fn income_is_submitted_positive() {
        let valid = coffee(TransactionKind::Income).validate().unwrap();
        assert_eq!(valid.amount, Money::new(350));
    }

    #[test]
    fn sign_always_follows_toggle() {
        for raw in ["1", "0.01", "250", "99.99", "1,5", "₦ 2000"] {
            for kind in [TransactionKind::Expense, TransactionKind::Income] {
                let mut form = coffee(kind);
                form.amount = raw.to_string();
                let valid = form.validate().unwrap();
                assert_eq!(TransactionKind::of(valid.amount), kind, "amount {raw}");
            }
        }
    }

    #[test]
    fn title_is_required() {
        let mut form = coffee(TransactionKind::Expense);
        form.title = "   ".to_string();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get(FormField::Title), Some("Title is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn title_longer_than_fifty_chars_is_rejected() {
        let mut form = coffee(TransactionKind::Expense);
        form.title = "x".repeat(TITLE_MAX_CHARS);
        assert!(form.validate().is_ok());

        form.title = "x".repeat(TITLE_MAX_CHARS + 1);
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get(FormField::Title), Some("Title too long"));
    }

    #[test]
    fn title_length_counts_characters_not_bytes() {
        let mut form = coffee(TransactionKind::Expense);
        form.title = "é".repeat(TITLE_MAX_CHARS);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn description_longer_than_two_hundred_chars_is_rejected() {
        let mut form = coffee(TransactionKind::Expense);
        form.description = "d".repeat(DESCRIPTION_MAX_CHARS);
        assert_eq!(
            form.validate().unwrap().description.as_deref().map(str::len),
            Some(DESCRIPTION_MAX_CHARS)
        );

        form.description = "d".repeat(DESCRIPTION_MAX_CHARS + 1);
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get(FormField::Description), Some("Description too long"));
    }

    #[test]
    fn amount_must_be_positive() {
        for raw in ["", "  ", "₦", "0", "0.00", "-5", "₦ -2.50"] {
            let mut form = coffee(TransactionKind::Expense);
            form.amount = raw.to_string();
            let errors = form.validate().unwrap_err();
            assert_eq!(
                errors.get(FormField::Amount),
                Some("Amount must be positive"),
                "amount {raw:?}"
            );
        }
    }

    #[test]
    fn malformed_amount_is_invalid() {
        for raw in ["1.2.3", "abc", "1e3", "12abc34", "5-3", "$5", "1 000"] {
            let mut form = coffee(TransactionKind::Expense);
            form.amount = raw.to_string();
            let errors = form.validate().unwrap_err();
            assert_eq!(
                errors.get(FormField::Amount),
                Some("Invalid amount"),
                "amount {raw:?}"
            );
        }
    }

    #[test]
    fn extra_decimals_round_to_nearest_kobo() {
        for (raw, kobo) in [("3.555", 356), ("3.554", 355), ("0,999", 100), ("₦ 12.3456", 1235)] {
            let mut form = coffee(TransactionKind::Income);
            form.amount = raw.to_string();
            assert_eq!(form.validate().unwrap().amount, Money::new(kobo), "amount {raw:?}");
        }

        let mut form = coffee(TransactionKind::Expense);
        form.amount = "0.004".to_string();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get(FormField::Amount), Some("Amount must be positive"));
    }

    #[test]
    fn category_must_be_known() {
        let mut form = coffee(TransactionKind::Expense);
        form.category = String::new();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get(FormField::Category), Some("Category is required"));

        form.category = "Gym".to_string();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get(FormField::Category), Some("Unknown category"));
    }

    #[test]
    fn every_violation_is_reported() {
        let form = TransactionForm {
            title: String::new(),
            amount: String::new(),
            category: String::new(),
            kind: TransactionKind::Expense,
            description: "d".repeat(DESCRIPTION_MAX_CHARS + 1),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get(FormField::Kind), None);
        assert!(errors.to_string().starts_with("Title: Title is required"));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut form = coffee(TransactionKind::Income);
        form.reset();
        assert_eq!(form, TransactionForm::default());
        assert_eq!(form.kind, TransactionKind::Expense);
    }

    #[test]
    fn field_navigation_wraps() {
        assert_eq!(FormField::Description.next(), FormField::Title);
        assert_eq!(FormField::Title.prev(), FormField::Description);
        assert_eq!(FormField::Amount.next(), FormField::Kind);
    }
}
