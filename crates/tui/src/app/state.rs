use std::time::{Duration, Instant};

use api_types::transaction::Transaction;
use chrono_tz::Tz;
use client::QueryState;
use engine::{Category, FormErrors, FormField, Summary, TransactionForm};

const TOAST_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Create,
    Profile,
}

impl Screen {
    pub const ALL: [Screen; 3] = [Screen::Home, Screen::Create, Screen::Profile];

    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Create => "Add",
            Self::Profile => "Profile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct ToastState {
    pub message: String,
    pub level: ToastLevel,
    expires_at: Instant,
}

impl ToastState {
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            expires_at: Instant::now() + TOAST_TTL,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
pub struct HomeState {
    pub list: QueryState<Vec<Transaction>>,
    /// List requests running in the background.
    in_flight: usize,
    pub selected: usize,
    /// Id of the transaction waiting for delete confirmation.
    pub confirm_delete: Option<String>,
    pub deleting: bool,
}

impl HomeState {
    pub fn items(&self) -> &[Transaction] {
        self.list.data.as_deref().unwrap_or_default()
    }

    pub fn summary(&self) -> Summary {
        Summary::from_amounts(self.items().iter().map(|tx| tx.amount))
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight > 0
    }

    pub fn begin_fetch(&mut self) {
        self.in_flight += 1;
    }

    pub fn end_fetch(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn selected_item(&self) -> Option<&Transaction> {
        self.items().get(self.selected)
    }

    /// Replaces the list, keeping the selection in range.
    pub fn set_list(&mut self, list: QueryState<Vec<Transaction>>) {
        self.list = list;
        let len = self.items().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        let len = self.items().len();
        if len == 0 {
            return;
        }
        self.selected = (self.selected + 1).min(len - 1);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

#[derive(Debug)]
pub struct CreateState {
    pub form: TransactionForm,
    pub focus: FormField,
    pub errors: FormErrors,
    pub submitting: bool,
}

impl Default for CreateState {
    fn default() -> Self {
        Self {
            form: TransactionForm::default(),
            focus: FormField::Title,
            errors: FormErrors::default(),
            submitting: false,
        }
    }
}

impl CreateState {
    pub fn input(&mut self, ch: char) {
        if self.focus == FormField::Amount && !(ch.is_ascii_digit() || ch == '.') {
            return;
        }
        if let Some(field) = self.form.field_mut(self.focus) {
            field.push(ch);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.form.field_mut(self.focus) {
            field.pop();
        }
    }

    /// Left/right on a choice field: flips the kind or steps through the
    /// category picker.
    pub fn cycle(&mut self, forward: bool) {
        match self.focus {
            FormField::Kind => self.form.kind = self.form.kind.toggle(),
            FormField::Category => {
                let len = Category::KNOWN.len();
                let next = match Category::from(self.form.category.as_str()).known_index() {
                    Some(idx) if forward => (idx + 1) % len,
                    Some(idx) => (idx + len - 1) % len,
                    None if forward => 0,
                    None => len - 1,
                };
                self.form.category = Category::KNOWN[next].label().to_string();
            }
            _ => {}
        }
    }

    /// Back to an empty form after a successful submit.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone)]
pub struct ProfileState {
    pub display_name: String,
    pub email: Option<String>,
    pub user_id: String,
    pub api_url: String,
}

#[derive(Debug)]
pub struct AppState {
    pub screen: Screen,
    pub home: HomeState,
    pub create: CreateState,
    pub profile: ProfileState,
    pub toast: Option<ToastState>,
    pub tz: Tz,
}

impl AppState {
    pub fn toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(ToastState::new(level, message));
    }

    pub fn expire_toast(&mut self, now: Instant) {
        if self.toast.as_ref().is_some_and(|toast| toast.is_expired(now)) {
            self.toast = None;
        }
    }
}
