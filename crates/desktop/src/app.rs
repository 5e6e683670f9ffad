//! Calbot Desktop — egui app state and UI.
//!
//! The whole view recomputes every frame. Widget handlers only record intent
//! into the pending-action slots; the top of each `update` pass polls the
//! in-flight round-trip and drains at most one pending action.

use eframe::egui;
use lib::backend::startup::RETRY_WAIT_SECS;
use lib::backend::{BookingClient, ChatBackend, ChatReply, HealthStatus};
use lib::conversation::{Role, Turn};
use lib::display::{
    claims_booking_without_data, format_booking_start, select_affordance, Affordance,
};
use lib::processor::{action_turn, begin_turn, complete_turn, TurnOrigin};
use lib::session::SessionState;
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

const CHAT_INPUT_HEIGHT: f32 = 96.0;
const SLOT_COLUMNS: usize = 3;
const CELEBRATION_SECS: u64 = 4;
const LOG_BUFFER_MAX_LINES: usize = 2000;

const QUICK_ACTIONS: [(&str, &str); 3] = [
    ("📅 Check today's availability", "What's my availability today?"),
    ("📞 Schedule a call", "I want to schedule a call"),
    ("🗓 Book a meeting tomorrow", "Book a meeting tomorrow"),
];

/// Ring buffer of log lines for the Logs screen.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

/// Logger that appends to LOG_LINES for display in the Logs screen.
struct DesktopLogger;

impl log::Log for DesktopLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!(
            "{} [{}] {}",
            lib::conversation::ist_now().format("%H:%M:%S%.3f"),
            record.level(),
            record.args()
        );
        push_log_line(line);
    }

    fn flush(&self) {}
}

static LOGGER: DesktopLogger = DesktopLogger;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Chat,
    Logs,
}

pub struct CalbotApp {
    state: SessionState,
    backend: BookingClient,
    chat_input: String,
    /// In-flight chat round-trip, if any. The user turn is already appended;
    /// the reply arrives here and becomes the assistant turn.
    turn_receiver: Option<mpsc::Receiver<ChatReply>>,
    /// In-flight health probe, if any.
    health_receiver: Option<mpsc::Receiver<HealthStatus>>,
    /// Last health probe result for the sidebar.
    health: Option<HealthStatus>,
    /// End of the currently shown celebration banner.
    celebration_until: Option<Instant>,
    /// When the most recent startup-error reply arrived (drives the countdown).
    startup_notice_at: Option<Instant>,
    config_error: Option<String>,
    current_screen: Screen,
}

impl CalbotApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let _ = LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()));
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);
        log::info!("desktop started");

        let (config, config_error) = match lib::config::load_config(None) {
            Ok((config, _)) => (config, None),
            Err(e) => (lib::config::Config::default(), Some(e.to_string())),
        };
        let backend = BookingClient::from_config(&config);
        let state = SessionState::new(lib::config::resolve_session_id(&config));
        log::info!("backend: {}", backend.base_url());

        Self {
            state,
            backend,
            chat_input: String::new(),
            turn_receiver: None,
            health_receiver: None,
            health: None,
            celebration_until: None,
            startup_notice_at: None,
            config_error,
            current_screen: Screen::default(),
        }
    }

    /// Poll the in-flight round-trip; on completion append the assistant turn.
    fn poll_turn_result(&mut self) {
        let Some(rx) = &self.turn_receiver else {
            return;
        };
        match rx.try_recv() {
            Ok(reply) => {
                self.turn_receiver = None;
                complete_turn(&mut self.state, &reply);
                if reply.is_startup_error {
                    self.startup_notice_at = Some(Instant::now());
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                self.turn_receiver = None;
                complete_turn(
                    &mut self.state,
                    &ChatReply::error("Request error: worker thread exited before replying"),
                );
            }
        }
    }

    /// Poll the in-flight health probe.
    fn poll_health_result(&mut self) {
        let Some(rx) = &self.health_receiver else {
            return;
        };
        match rx.try_recv() {
            Ok(status) => {
                self.health = Some(status);
                self.health_receiver = None;
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                self.health = Some(HealthStatus::Unhealthy {
                    error: "health probe thread exited".to_string(),
                });
                self.health_receiver = None;
            }
        }
    }

    /// Convert at most one pending widget click into a turn. Runs at the top
    /// of the pass, never while a round-trip is in flight.
    fn drain_pending_action(&mut self) {
        if self.turn_receiver.is_some() {
            return;
        }
        let Some(action) = self.state.pending.take_next() else {
            return;
        };
        let (content, origin) = action_turn(action);
        log::info!("draining pending {:?}: {}", origin, content);
        self.start_round_trip(content, origin);
    }

    /// Append the user turn and run the backend call on a worker thread.
    fn start_round_trip(&mut self, content: String, origin: TurnOrigin) {
        if self.turn_receiver.is_some() {
            return;
        }
        begin_turn(&mut self.state, &content, origin);
        self.startup_notice_at = None;
        let backend = self.backend.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let reply = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt.block_on(backend.send_chat(&content)),
                Err(e) => ChatReply::error(format!("Request error: {}", e)),
            };
            let _ = tx.send(reply);
        });
        self.turn_receiver = Some(rx);
    }

    fn start_health_check(&mut self) {
        if self.health_receiver.is_some() {
            return;
        }
        let backend = self.backend.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let status = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt.block_on(backend.health()),
                Err(e) => HealthStatus::Unhealthy {
                    error: e.to_string(),
                },
            };
            let _ = tx.send(status);
        });
        self.health_receiver = Some(rx);
    }

    fn send_chat_input(&mut self) {
        let message = self.chat_input.trim().to_string();
        if message.is_empty() {
            return;
        }
        self.chat_input.clear();
        self.start_round_trip(message, TurnOrigin::FreeText);
    }

    /// Clear the conversation: log, derived indices, shown-booking set, and
    /// pending slots reset together; an in-flight reply is dropped so it
    /// cannot land in the cleared log.
    fn clear_conversation(&mut self) {
        self.state.reset();
        self.turn_receiver = None;
        self.celebration_until = None;
        self.startup_notice_at = None;
        log::info!("conversation cleared");
    }

    fn ui_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.current_screen, Screen::Chat, "Chat");
            ui.selectable_value(&mut self.current_screen, Screen::Logs, "Logs");
        });
        ui.separator();

        let idle = self.turn_receiver.is_none();
        ui.heading("Quick actions");
        for (label, message) in QUICK_ACTIONS {
            if ui
                .add_enabled(idle, egui::Button::new(label).wrap(true))
                .clicked()
            {
                self.start_round_trip(message.to_string(), TurnOrigin::FreeText);
            }
        }

        ui.separator();
        ui.heading("Connection");
        if ui
            .add_enabled(self.health_receiver.is_none(), egui::Button::new("🔍 Test backend"))
            .clicked()
        {
            self.start_health_check();
        }
        if self.health_receiver.is_some() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("testing connection…");
            });
        }
        match &self.health {
            Some(HealthStatus::Healthy(report)) => {
                ui.colored_label(egui::Color32::from_rgb(80, 170, 90), "backend is healthy");
                match report.calendar_status.as_deref() {
                    Some("authenticated") => {
                        ui.label("📅 Google Calendar: connected");
                    }
                    Some("mock") => {
                        ui.label("📅 Google Calendar: not connected (mock)");
                    }
                    Some(other) => {
                        ui.label(format!("📅 Google Calendar: {}", other));
                    }
                    None => {}
                }
                if let Some(ref time) = report.server_time {
                    ui.label(format!("🕐 server time: {}", time));
                }
            }
            Some(HealthStatus::Unhealthy { error }) => {
                ui.colored_label(
                    ui.style().visuals.error_fg_color,
                    "backend connection failed",
                );
                ui.label(error);
                ui.small("If the service is starting up, wait 30-60 seconds and test again.");
            }
            None => {}
        }

        ui.separator();
        ui.heading("Conversation");
        if ui.button("🗑 Clear conversation").clicked() {
            self.clear_conversation();
        }
        let total = self.state.log.len();
        if total > 0 {
            let users = self
                .state
                .log
                .turns()
                .iter()
                .filter(|t| t.role == Role::User)
                .count();
            ui.label(format!("messages: {}", total));
            ui.label(format!("you: {}  ·  assistant: {}", users, total - users));
        }
    }

    fn ui_chat(&mut self, ui: &mut egui::Ui) {
        if let Some(ref err) = self.config_error {
            ui.colored_label(
                ui.style().visuals.error_fg_color,
                format!("config error (using defaults): {}", err),
            );
        }

        // Celebration banner, one per newly shown booking.
        if let Some(until) = self.celebration_until {
            if Instant::now() < until {
                ui.colored_label(
                    egui::Color32::from_rgb(80, 170, 90),
                    egui::RichText::new("🎉 Appointment added to your Google Calendar!").strong(),
                );
                ui.add_space(4.0);
            } else {
                self.celebration_until = None;
            }
        }

        if self.state.log.is_empty() {
            ui.label("I can help you schedule appointments, check availability, and manage your calendar.");
            ui.small("First message today? The service may take 30-60 seconds to wake up.");
            ui.add_space(8.0);
        }

        let bottom_height = CHAT_INPUT_HEIGHT + 56.0;
        let messages_height = (ui.available_height() - bottom_height).max(120.0);
        let turns: Vec<Turn> = self.state.log.turns().to_vec();
        let mut celebrate_id: Option<String> = None;

        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .max_height(messages_height)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (i, turn) in turns.iter().enumerate() {
                    self.render_turn(ui, i, turn, &mut celebrate_id);
                    ui.add_space(8.0);
                }
                if self.turn_receiver.is_some() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("contacting the calendar assistant…");
                    });
                }
            });

        if let Some(id) = celebrate_id {
            if self.state.log.celebrate(&id) {
                self.celebration_until =
                    Some(Instant::now() + Duration::from_secs(CELEBRATION_SECS));
                log::info!("celebration shown for booking {}", id);
            }
        }

        ui.add_space(8.0);
        let can_send = self.turn_receiver.is_none();
        let response = ui
            .add_enabled_ui(can_send, |ui| {
                ui.add_sized(
                    [ui.available_width(), CHAT_INPUT_HEIGHT],
                    egui::TextEdit::multiline(&mut self.chat_input)
                        .hint_text("Type your message… (e.g. \"Schedule a meeting tomorrow at 3 PM\")"),
                )
            })
            .inner;
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui.add_enabled(can_send, egui::Button::new("Send")).clicked() {
                self.send_chat_input();
            }
            if can_send && response.has_focus() {
                let modifiers = ui.input(|i| i.modifiers);
                if (modifiers.command || modifiers.ctrl)
                    && ui.input(|i| i.key_pressed(egui::Key::Enter))
                {
                    self.send_chat_input();
                }
            }
            ui.small("ctrl+enter to send");
        });
    }

    /// Render one turn: the message bubble plus whatever single affordance the
    /// display selector picks for it.
    fn render_turn(
        &mut self,
        ui: &mut egui::Ui,
        index: usize,
        turn: &Turn,
        celebrate_id: &mut Option<String>,
    ) {
        let is_user = turn.role == Role::User;
        let frame = egui::Frame::none()
            .fill(if is_user {
                ui.style().visuals.extreme_bg_color
            } else {
                ui.style().visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0));

        frame.show(ui, |ui| {
            if is_user {
                ui.label(egui::RichText::new(&turn.content).strong());
                ui.small(format!("🕐 {} IST", turn.timestamp.format("%I:%M %p")));
                return;
            }

            ui.label(&turn.content);

            if turn.is_startup_error {
                self.render_startup_guidance(ui, index);
                return;
            }
            if claims_booking_without_data(turn) {
                ui.colored_label(
                    ui.style().visuals.warn_fg_color,
                    "⚠ The reply describes a booking, but no calendar event was returned. \
                     Re-check availability before relying on it.",
                );
            }

            match select_affordance(index, turn, &self.state.log) {
                Some(Affordance::BookingConfirmation) => {
                    self.render_booking(ui, index, turn, celebrate_id);
                }
                Some(Affordance::ConfirmationPrompt) => {
                    self.render_confirmation_prompt(ui);
                }
                Some(Affordance::TimeSlotPicker) => {
                    self.render_time_slots(ui, turn);
                }
                None => {}
            }
        });
    }

    /// Countdown for the most recent startup-error reply; older ones keep the
    /// message only.
    fn render_startup_guidance(&mut self, ui: &mut egui::Ui, index: usize) {
        if index + 1 != self.state.log.len() {
            return;
        }
        let Some(at) = self.startup_notice_at else {
            return;
        };
        ui.add_space(4.0);
        let remaining = RETRY_WAIT_SECS.saturating_sub(at.elapsed().as_secs());
        if remaining > 0 {
            ui.label(format!(
                "⏳ Startup in progress… wait about {} seconds, then resend your message.",
                remaining
            ));
        } else {
            ui.colored_label(
                egui::Color32::from_rgb(80, 170, 90),
                "✅ Startup should be complete — send your message again.",
            );
        }
    }

    fn render_booking(
        &mut self,
        ui: &mut egui::Ui,
        index: usize,
        turn: &Turn,
        celebrate_id: &mut Option<String>,
    ) {
        let Some(ref booking) = turn.booking_data else {
            return;
        };
        ui.add_space(4.0);
        ui.separator();
        ui.colored_label(
            egui::Color32::from_rgb(80, 170, 90),
            egui::RichText::new("✅ Appointment booked").strong(),
        );
        egui::Grid::new(("booking_details", index))
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                ui.label("📝 Title");
                ui.label(booking.title.as_deref().unwrap_or("Meeting"));
                ui.end_row();
                if let Some(ref start) = booking.start_time {
                    ui.label("📅 When");
                    ui.label(format_booking_start(start));
                    ui.end_row();
                }
                ui.label("🆔 Event id");
                ui.label(&booking.id);
                ui.end_row();
                if let Some(ref status) = booking.status {
                    ui.label("📊 Status");
                    ui.label(status);
                    ui.end_row();
                }
            });
        if let Some(ref link) = booking.html_link {
            ui.hyperlink_to("📅 View in Google Calendar", link);
        }
        if !self.state.log.celebrated(&booking.id) && celebrate_id.is_none() {
            *celebrate_id = Some(booking.id.clone());
        }
    }

    /// Confirm/cancel buttons only record the decision; the drain at the top
    /// of the next pass turns it into a conversation turn.
    fn render_confirmation_prompt(&mut self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        ui.colored_label(
            ui.style().visuals.warn_fg_color,
            egui::RichText::new("⚠ Confirmation required").strong(),
        );
        ui.label("Proceed with this booking?");
        let idle = self.turn_receiver.is_none();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(idle, egui::Button::new("✅ Yes, book it"))
                .clicked()
            {
                self.state.pending.confirm(lib::actions::ConfirmDecision::Yes);
            }
            if ui.add_enabled(idle, egui::Button::new("❌ Cancel")).clicked() {
                self.state
                    .pending
                    .confirm(lib::actions::ConfirmDecision::NoCancel);
            }
        });
    }

    /// Time-slot buttons only record the selected slot text.
    fn render_time_slots(&mut self, ui: &mut egui::Ui, turn: &Turn) {
        ui.add_space(4.0);
        ui.label(egui::RichText::new("🕐 Available time slots").strong());
        ui.small("Click a slot to select it:");
        let idle = self.turn_receiver.is_none();
        for row in turn.suggested_times.chunks(SLOT_COLUMNS) {
            ui.horizontal(|ui| {
                for slot in row {
                    if ui
                        .add_enabled(idle, egui::Button::new(format!("📅 {}", slot)))
                        .clicked()
                    {
                        self.state.pending.select_time(slot.clone());
                    }
                }
            });
        }
    }

    fn ui_logs(&self, ui: &mut egui::Ui) {
        ui.heading("Logs");
        ui.add_space(8.0);
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if let Ok(buf) = log_buffer().lock() {
                    for line in buf.iter() {
                        ui.monospace(line.as_str());
                    }
                }
            });
    }
}

impl eframe::App for CalbotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_turn_result();
        self.poll_health_result();
        self.drain_pending_action();

        // Keep polling receivers and countdowns alive without user input.
        let counting_down = self
            .startup_notice_at
            .map(|at| at.elapsed().as_secs() <= RETRY_WAIT_SECS)
            .unwrap_or(false);
        if self.turn_receiver.is_some()
            || self.health_receiver.is_some()
            || self.celebration_until.is_some()
            || counting_down
        {
            ctx.request_repaint_after(Duration::from_millis(250));
        }

        egui::SidePanel::left("sidebar")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| self.ui_sidebar(ui));

        egui::CentralPanel::default().show(ctx, |ui| match self.current_screen {
            Screen::Chat => {
                ui.heading("🤖 Calendar booking assistant");
                ui.add_space(8.0);
                self.ui_chat(ui);
            }
            Screen::Logs => self.ui_logs(ui),
        });
    }
}
