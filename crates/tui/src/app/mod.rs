mod state;

use std::time::{Duration, Instant};

use api_types::transaction::Transaction;
use client::{CancellationToken, ClientError, QueryState, Transactions};
use crossterm::event::{self, Event, KeyEvent};
use engine::{FormErrors, FormField, display_name};
use tokio::sync::mpsc;

use crate::{
    config::AppConfig,
    error::{AppError, Result},
    ui::{
        self,
        keymap::{AppAction, map_key},
    },
};

pub use state::{
    AppState, CreateState, HomeState, ProfileState, Screen, ToastLevel, ToastState,
};

const TICK_RATE: Duration = Duration::from_millis(100);

/// Results of background work, delivered back to the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    ListLoaded(std::result::Result<QueryState<Vec<Transaction>>, ClientError>),
    Created(std::result::Result<(), ClientError>),
    Deleted {
        id: String,
        result: std::result::Result<(), ClientError>,
    },
}

pub struct App {
    transactions: Transactions,
    pub state: AppState,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    /// Parent of every background task; cancelled on quit.
    shutdown: CancellationToken,
    /// Cancels the in-flight create, if any.
    submit: Option<CancellationToken>,
    should_quit: bool,
}

impl App {
    pub fn new(config: AppConfig, transactions: Transactions) -> Result<Self> {
        let tz = config.tz()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut home = HomeState::default();
        home.set_list(transactions.cached());

        let state = AppState {
            screen: Screen::Home,
            home,
            create: CreateState::default(),
            profile: ProfileState {
                display_name: display_name(config.first_name.as_deref(), config.email.as_deref()),
                email: config.email.clone(),
                user_id: config.user_id.clone(),
                api_url: config.api_url.clone(),
            },
            toast: None,
            tz,
        };

        Ok(Self {
            transactions,
            state,
            events_tx,
            events_rx,
            shutdown: CancellationToken::new(),
            submit: None,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut terminal = ui::setup_terminal()?;
        self.load_list(false);
        let result = self.event_loop(&mut terminal).await;
        self.shutdown.cancel();
        ui::restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(&mut self, terminal: &mut ui::Terminal) -> Result<()> {
        while !self.should_quit {
            terminal
                .draw(|frame| ui::render(frame, &self.state))
                .map_err(|err| AppError::Terminal(err.to_string()))?;

            if event::poll(TICK_RATE)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            while let Ok(event) = self.events_rx.try_recv() {
                self.handle_event(event);
            }
            self.state.expire_toast(Instant::now());
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let text_input = self.state.screen == Screen::Create;
        let action = map_key(key, text_input);
        if action == AppAction::Quit {
            self.should_quit = true;
            return;
        }

        match self.state.screen {
            Screen::Home => self.handle_home(action),
            Screen::Create => self.handle_create(action),
            Screen::Profile => self.handle_profile(action),
        }
    }

    fn handle_home(&mut self, action: AppAction) {
        if let Some(id) = self.state.home.confirm_delete.clone() {
            match action {
                AppAction::Input('y') | AppAction::Submit => {
                    self.state.home.confirm_delete = None;
                    self.delete(id);
                }
                AppAction::Input('n') | AppAction::Cancel => {
                    self.state.home.confirm_delete = None;
                }
                _ => {}
            }
            return;
        }

        match action {
            AppAction::Up | AppAction::Input('k') => self.state.home.select_prev(),
            AppAction::Down | AppAction::Input('j') => self.state.home.select_next(),
            AppAction::Input('r') => self.load_list(true),
            AppAction::Input('d') => {
                if !self.state.home.deleting {
                    self.state.home.confirm_delete =
                        self.state.home.selected_item().map(|tx| tx.id.clone());
                }
            }
            AppAction::Input('a') => self.state.screen = Screen::Create,
            AppAction::Input('p') => self.state.screen = Screen::Profile,
            _ => {}
        }
    }

    fn handle_create(&mut self, action: AppAction) {
        if action == AppAction::Cancel {
            match self.submit.take() {
                Some(token) => token.cancel(),
                None => self.state.screen = Screen::Home,
            }
            return;
        }
        if self.state.create.submitting {
            return;
        }
        if action == AppAction::Submit {
            self.submit();
            return;
        }

        let create = &mut self.state.create;
        match action {
            AppAction::NextField | AppAction::Down => create.focus = create.focus.next(),
            AppAction::PrevField | AppAction::Up => create.focus = create.focus.prev(),
            AppAction::Left => create.cycle(false),
            AppAction::Right => create.cycle(true),
            AppAction::Backspace => create.backspace(),
            AppAction::Input(' ') if create.focus == FormField::Kind => create.cycle(true),
            AppAction::Input(ch) => create.input(ch),
            _ => {}
        }
    }

    fn handle_profile(&mut self, action: AppAction) {
        match action {
            AppAction::Input('h') | AppAction::Cancel => self.state.screen = Screen::Home,
            AppAction::Input('a') => self.state.screen = Screen::Create,
            _ => {}
        }
    }

    /// Loads the list in the background. `force` revalidates even fresh
    /// data (pull-to-refresh).
    fn load_list(&mut self, force: bool) {
        self.state.home.begin_fetch();
        let transactions = self.transactions.clone();
        let cancel = self.shutdown.child_token();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = if force {
                transactions.refresh(&cancel).await
            } else {
                transactions.list(&cancel).await
            };
            let _ = tx.send(AppEvent::ListLoaded(result));
        });
    }

    fn submit(&mut self) {
        let valid = match self.state.create.form.validate() {
            Ok(valid) => valid,
            Err(errors) => {
                tracing::debug!(count = errors.len(), "form rejected");
                self.state.create.errors = errors;
                return;
            }
        };

        self.state.create.errors = FormErrors::default();
        self.state.create.submitting = true;
        let cancel = self.shutdown.child_token();
        self.submit = Some(cancel.clone());

        let transactions = self.transactions.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = transactions.create(valid, &cancel).await;
            let _ = tx.send(AppEvent::Created(result));
        });
    }

    fn delete(&mut self, id: String) {
        self.state.home.deleting = true;
        let transactions = self.transactions.clone();
        let cancel = self.shutdown.child_token();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = transactions.delete(&id, &cancel).await;
            let _ = tx.send(AppEvent::Deleted { id, result });
        });
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ListLoaded(Ok(list)) => {
                self.state.home.end_fetch();
                self.state.home.set_list(list);
            }
            AppEvent::ListLoaded(Err(ClientError::Cancelled)) => {
                self.state.home.end_fetch();
            }
            AppEvent::ListLoaded(Err(err)) => {
                self.state.home.end_fetch();
                self.state.toast(ToastLevel::Error, format!("Failed to load transactions: {err}"));
            }
            AppEvent::Created(result) => {
                self.submit = None;
                self.state.create.submitting = false;
                match result {
                    Ok(()) => {
                        self.state.create.reset();
                        self.state.screen = Screen::Home;
                        self.state.toast(ToastLevel::Success, "Transaction created successfully");
                        self.load_list(false);
                    }
                    Err(ClientError::Cancelled) => {
                        self.state.toast(ToastLevel::Info, "Submission cancelled");
                    }
                    Err(_) => {
                        self.state.toast(ToastLevel::Error, "Failed to create transaction");
                    }
                }
            }
            AppEvent::Deleted { id, result } => {
                self.state.home.deleting = false;
                match result {
                    Ok(()) => {
                        tracing::debug!(%id, "delete confirmed");
                        self.state.toast(ToastLevel::Success, "Transaction deleted");
                        self.load_list(false);
                    }
                    Err(ClientError::Cancelled) => {}
                    Err(_) => {
                        self.state.toast(ToastLevel::Error, "Failed to delete transaction");
                    }
                }
            }
        }
    }
}
