use iced::widget::{
    button, center, column, container, horizontal_space, mouse_area, opaque, pick_list, row,
    scrollable, stack, text, text_editor, text_input, toggler,
};
use iced::{Alignment, Color, Element, Length, Subscription, Task, Theme};
use log::{error, info, warn};
use std::sync::Arc;

mod backend;
mod config;
mod state;
mod ui;

use backend::{Backend, BackendError, ChangeEvent, SupabaseBackend};
use state::actions::{Write, WriteKind};
use state::data::{RecordId, StatusChoice, TestCase};
use state::form::CreationForm;
use state::prefs::{Prefs, PrefsStore, ThemeChoice};
use state::sync::ViewSynchronizer;
use ui::list::{ListSurface, NodeId, REMOVE_DELAY};

const LIST_ID: &str = "test-case-list";

/// Main application state
struct TestCaseBoard {
    /// `None` when credentials are missing: the board stays empty
    backend: Option<Arc<dyn Backend>>,
    /// Rendered list, kept in sync with the backend
    sync: ViewSynchronizer<ListSurface>,
    form: CreationForm,
    /// Editor buffer behind `form.description`
    description: text_editor::Content,
    form_open: bool,
    header_collapsed: bool,
    prefs: Prefs,
    prefs_store: Option<PrefsStore>,
    /// Blocking message shown over the board
    alert: Option<String>,
    /// Status line at the bottom of the window
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// Snapshot fetched at startup
    InitialLoaded(Result<Vec<TestCase>, Arc<BackendError>>),
    /// Change delivered by the realtime stream
    Realtime(ChangeEvent),
    /// Realtime stream could not be opened or ended
    RealtimeEnded(String),
    /// User picked a value on an item's status control
    StatusPicked(RecordId, StatusChoice),
    /// A backend write finished
    WriteFinished(WriteKind, Result<(), Arc<BackendError>>),
    /// Removal transition of a node is over
    Purge(NodeId),
    TestCaseIdChanged(String),
    DescriptionEdited(text_editor::Action),
    TeamToggled(bool),
    Save,
    ToggleForm,
    ThemeSelected(ThemeChoice),
    CollapseHeader,
    ExpandHeader,
    DismissAlert,
}

impl TestCaseBoard {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let prefs_store = PrefsStore::default_location();
        let prefs = prefs_store.as_ref().map(PrefsStore::load).unwrap_or_default();

        let backend = connect_backend();
        let status = match &backend {
            Some(_) => "Loading test cases...".to_string(),
            None => "Backend not configured. Set SUPABASE_URL and SUPABASE_ANON_KEY.".to_string(),
        };

        let task = match &backend {
            Some(backend) => {
                let backend = Arc::clone(backend);
                Task::perform(
                    async move { backend.fetch_all().await.map_err(Arc::new) },
                    Message::InitialLoaded,
                )
            }
            None => Task::none(),
        };

        (
            TestCaseBoard {
                backend,
                sync: ViewSynchronizer::new(ListSurface::default()),
                form: CreationForm::default(),
                description: text_editor::Content::new(),
                form_open: false,
                header_collapsed: false,
                prefs,
                prefs_store,
                alert: None,
                status,
            },
            task,
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::InitialLoaded(Ok(records)) => {
                let created = self.sync.load_initial(records);
                info!("📋 Loaded {} test cases", created);
                self.status = self.count_line();
                // Jump to the most recent entry
                scrollable::snap_to(scrollable::Id::new(LIST_ID), scrollable::RelativeOffset::END)
            }
            Message::InitialLoaded(Err(e)) => {
                error!("❌ Could not load test cases: {}", e);
                self.status = "Could not load test cases.".to_string();
                Task::none()
            }
            Message::Realtime(event) => {
                self.sync.apply(event);
                self.status = self.count_line();
                self.schedule_purges()
            }
            Message::RealtimeEnded(reason) => {
                warn!("📴 Live updates stopped: {}", reason);
                self.status = "Live updates stopped.".to_string();
                Task::none()
            }
            Message::StatusPicked(id, choice) => {
                self.dispatch(Write::from_status_choice(id, choice))
            }
            Message::WriteFinished(kind, Ok(())) => {
                if kind == WriteKind::Insert {
                    self.form.clear();
                    self.description = text_editor::Content::new();
                    self.form_open = false;
                }
                Task::none()
            }
            Message::WriteFinished(kind, Err(e)) => {
                error!("❌ {:?} failed: {}", kind, e);
                if kind == WriteKind::Insert {
                    self.alert = Some("Insert failed".to_string());
                }
                Task::none()
            }
            Message::Purge(node) => {
                self.sync.surface_mut().purge(node);
                Task::none()
            }
            Message::TestCaseIdChanged(value) => {
                self.form.test_case_id = value;
                Task::none()
            }
            Message::DescriptionEdited(action) => {
                self.description.perform(action);
                self.form.description = self.description.text();
                Task::none()
            }
            Message::TeamToggled(quotation_to_pricing) => {
                self.form.quotation_to_pricing = quotation_to_pricing;
                Task::none()
            }
            Message::Save => match self.form.submit() {
                Ok(new) => self.dispatch(Write::Insert(new)),
                Err(e) => {
                    self.alert = Some(e.to_string());
                    Task::none()
                }
            },
            Message::ToggleForm => {
                self.form_open = !self.form_open;
                Task::none()
            }
            Message::ThemeSelected(theme) => {
                self.prefs.theme = theme;
                if let Some(store) = &self.prefs_store {
                    if let Err(e) = store.save(&self.prefs) {
                        warn!("⚠️  {} ({})", e, store.path().display());
                    }
                }
                Task::none()
            }
            Message::CollapseHeader => {
                self.header_collapsed = true;
                Task::none()
            }
            Message::ExpandHeader => {
                self.header_collapsed = false;
                Task::none()
            }
            Message::DismissAlert => {
                self.alert = None;
                Task::none()
            }
        }
    }

    fn count_line(&self) -> String {
        if self.sync.is_empty() {
            "The table is empty.".to_string()
        } else {
            format!("{} test cases.", self.sync.len())
        }
    }

    /// Send a write to the backend; the list changes only when the
    /// backend echoes it back
    fn dispatch(&mut self, write: Write) -> Task<Message> {
        let kind = write.kind();
        let Some(backend) = self.backend.clone() else {
            error!("❌ {:?} skipped: backend not configured", kind);
            if kind == WriteKind::Insert {
                self.alert = Some("Insert failed".to_string());
            }
            return Task::none();
        };

        Task::perform(
            async move { write.send(backend.as_ref()).await.map_err(Arc::new) },
            move |result| Message::WriteFinished(kind, result),
        )
    }

    /// Start the fade-out timers of nodes removed by the last change
    fn schedule_purges(&mut self) -> Task<Message> {
        let purges = self.sync.surface_mut().take_pending_purges();
        Task::batch(purges.into_iter().map(|node| {
            Task::perform(tokio::time::sleep(REMOVE_DELAY), move |_| Message::Purge(node))
        }))
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let top: Element<'_, Message> = if self.header_collapsed {
            row![horizontal_space(), button("▼ Expand").on_press(Message::ExpandHeader)].into()
        } else {
            self.header_view()
        };

        let list = scrollable(self.sync.surface().view())
            .id(scrollable::Id::new(LIST_ID))
            .height(Length::Fill);

        let board = column![top, list, text(&self.status).size(12)]
            .spacing(12)
            .padding(20);

        match &self.alert {
            Some(message) => modal(board.into(), message),
            None => board.into(),
        }
    }

    fn header_view(&self) -> Element<'_, Message> {
        let title_bar = row![
            text("Test Case Board").size(32),
            horizontal_space(),
            text("Theme"),
            pick_list(ThemeChoice::ALL, Some(self.prefs.theme), Message::ThemeSelected),
            button("▲ Collapse").on_press(Message::CollapseHeader),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let toggle_label = if self.form_open {
            "▾ Add test case"
        } else {
            "▸ Add test case"
        };
        let form_toggle = button(toggle_label).on_press(Message::ToggleForm);

        let mut header = column![title_bar, form_toggle].spacing(12);
        if self.form_open {
            header = header.push(self.form_view());
        }

        container(header)
            .padding(16)
            .width(Length::Fill)
            .style(ui::style::header)
            .into()
    }

    fn form_view(&self) -> Element<'_, Message> {
        let dimmed = |active: bool| {
            move |theme: &Theme| text::Style {
                color: (!active).then(|| {
                    let mut faded = theme.palette().text;
                    faded.a = 0.4;
                    faded
                }),
            }
        };
        let q2p = self.form.quotation_to_pricing;

        let team_toggle = row![
            text("Pricing to Quotation").style(dimmed(!q2p)),
            toggler(q2p).on_toggle(Message::TeamToggled),
            text("Quotation to Pricing").style(dimmed(q2p)),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        column![
            team_toggle,
            text_input("Test Case ID", &self.form.test_case_id)
                .on_input(Message::TestCaseIdChanged)
                .on_submit(Message::Save),
            text_editor(&self.description)
                .placeholder("Description")
                .on_action(Message::DescriptionEdited)
                .height(120),
            button("Save").on_press(Message::Save),
        ]
        .spacing(10)
        .into()
    }

    /// Follow the table's change stream while a backend is configured
    fn subscription(&self) -> Subscription<Message> {
        match &self.backend {
            Some(backend) => {
                Subscription::run_with_id("realtime", change_stream(Arc::clone(backend)))
            }
            None => Subscription::none(),
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        match self.prefs.theme {
            ThemeChoice::Light => Theme::Light,
            ThemeChoice::Dark => Theme::Dark,
        }
    }
}

/// Build the Supabase backend from settings; `None` leaves the board
/// read-only and empty
fn connect_backend() -> Option<Arc<dyn Backend>> {
    let settings = match config::Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("❌ {}", e);
            return None;
        }
    };
    match SupabaseBackend::new(settings) {
        Ok(backend) => {
            let settings = backend.settings();
            info!("🔌 Using backend {} (table {})", settings.url, settings.table);
            Some(Arc::new(backend))
        }
        Err(e) => {
            error!("❌ {}", e);
            None
        }
    }
}

/// Messages from one realtime subscription. The feed, and with it the
/// socket, is dropped when iced drops the stream.
fn change_stream(backend: Arc<dyn Backend>) -> impl futures::Stream<Item = Message> {
    use futures::SinkExt;

    iced::stream::channel(100, move |mut output| async move {
        let mut feed = match backend.subscribe().await {
            Ok(feed) => feed,
            Err(e) => {
                let _ = output.send(Message::RealtimeEnded(e.to_string())).await;
                return;
            }
        };

        while let Some(event) = feed.next().await {
            if output.send(Message::Realtime(event)).await.is_err() {
                return;
            }
        }
        let _ = output.send(Message::RealtimeEnded("stream closed".to_string())).await;
    })
}

/// `content` greyed out under a blocking message
fn modal<'a>(content: Element<'a, Message>, message: &'a str) -> Element<'a, Message> {
    let dialog = container(
        column![text(message).size(16), button("OK").on_press(Message::DismissAlert)]
            .spacing(16)
            .align_x(Alignment::Center),
    )
    .padding(24)
    .style(container::rounded_box);

    stack![
        content,
        opaque(
            mouse_area(center(opaque(dialog)).style(|_theme| container::Style {
                background: Some(
                    Color {
                        a: 0.6,
                        ..Color::BLACK
                    }
                    .into(),
                ),
                ..container::Style::default()
            }))
            .on_press(Message::DismissAlert)
        )
    ]
    .into()
}

fn main() -> iced::Result {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("test_case_board=info"),
    )
    .init();

    iced::application("Test Case Board", TestCaseBoard::update, TestCaseBoard::view)
        .subscription(TestCaseBoard::subscription)
        .theme(TestCaseBoard::theme)
        .centered()
        .run_with(TestCaseBoard::new)
}
