use clap::{Parser, Subcommand};
use lib::actions::ConfirmDecision;
use lib::backend::startup::RETRY_WAIT_SECS;
use lib::backend::{BookingClient, ChatBackend, HealthStatus};
use lib::display::{claims_booking_without_data, format_booking_start, select_affordance, Affordance};
use lib::processor::{drain_pending, run_turn, TurnOrigin};
use lib::session::SessionState;

#[derive(Parser)]
#[command(name = "calbot")]
#[command(about = "Calendar booking assistant CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Check backend health (calendar connection, server time).
    Health {
        /// Config file path (default: CALBOT_CONFIG_PATH or ~/.calbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Chat with the booking assistant (interactive).
    Chat {
        /// Config file path (default: CALBOT_CONFIG_PATH or ~/.calbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Session id to use instead of the configured one.
        #[arg(long, value_name = "ID")]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("calbot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Health { config }) => {
            if let Err(e) = run_health(config).await {
                log::error!("health check failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config, session }) => {
            if let Err(e) = run_chat(config, session).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_health(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let backend = BookingClient::from_config(&config);
    print_health(&backend).await;
    Ok(())
}

async fn print_health(backend: &BookingClient) {
    println!("checking {} ...", backend.base_url());
    match backend.health().await {
        HealthStatus::Healthy(report) => {
            println!("backend is healthy");
            match report.calendar_status.as_deref() {
                Some("authenticated") => println!("google calendar: connected"),
                Some("mock") => {
                    println!("google calendar: not connected (using mock data)");
                    println!("visit {}/auth/login to connect your calendar", backend.base_url());
                }
                Some(other) => println!("google calendar: {}", other),
                None => {}
            }
            if let Some(time) = report.server_time {
                println!("server time: {}", time);
            }
        }
        HealthStatus::Unhealthy { error } => {
            println!("backend connection failed: {}", error);
            println!("if the service is starting up, wait 30-60 seconds and try again");
        }
    }
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    session: Option<String>,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, _) = lib::config::load_config(config_path)?;
    let session_id = session.unwrap_or_else(|| lib::config::resolve_session_id(&config));
    let backend = BookingClient::from_config(&config);
    let mut state = SessionState::new(session_id);

    println!("Calendar booking assistant — ask me to schedule something,");
    println!("e.g. \"book a meeting tomorrow at 3 PM\". /help for commands.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        if input.eq_ignore_ascii_case("/help") {
            println!("commands:");
            println!("  /reset   clear the conversation and start over");
            println!("  /health  check the backend and calendar connection");
            println!("  /exit    quit");
            println!("when time slots are offered, reply with the slot number;");
            println!("when confirmation is requested, reply y or n.");
            continue;
        }
        if input.eq_ignore_ascii_case("/reset") {
            state.reset();
            println!("conversation cleared");
            continue;
        }
        if input.eq_ignore_ascii_case("/health") {
            print_health(&backend).await;
            continue;
        }

        let index = match queue_affordance_input(&mut state, input) {
            InputDisposition::Queued => {
                drain_pending(&mut state, &backend).await;
                state.log.len().saturating_sub(1)
            }
            InputDisposition::Rejected => continue,
            InputDisposition::FreeText => {
                run_turn(&mut state, &backend, input, TurnOrigin::FreeText).await
            }
        };
        render_assistant_turn(&mut state, index);
    }

    Ok(())
}

enum InputDisposition {
    /// A pending action was queued for the drain.
    Queued,
    /// Input addressed an affordance but was invalid; nothing to send.
    Rejected,
    /// Not an affordance answer; send as a free-text turn.
    FreeText,
}

/// Interpret input against the affordance offered for the latest assistant
/// turn: a slot number when slots were offered, y/n when confirmation was
/// requested. Queues the matching pending action; anything else goes to the
/// backend as free text.
fn queue_affordance_input(state: &mut SessionState, input: &str) -> InputDisposition {
    let Some(index) = state.log.len().checked_sub(1) else {
        return InputDisposition::FreeText;
    };
    let turn = &state.log.turns()[index];
    match select_affordance(index, turn, &state.log) {
        Some(Affordance::TimeSlotPicker) => {
            let Ok(n) = input.parse::<usize>() else {
                return InputDisposition::FreeText;
            };
            if n == 0 || n > turn.suggested_times.len() {
                println!("pick a slot between 1 and {}", turn.suggested_times.len());
                return InputDisposition::Rejected;
            }
            let slot = turn.suggested_times[n - 1].clone();
            state.pending.select_time(slot);
            InputDisposition::Queued
        }
        Some(Affordance::ConfirmationPrompt) => {
            if input.eq_ignore_ascii_case("y") || input.eq_ignore_ascii_case("yes") {
                state.pending.confirm(ConfirmDecision::Yes);
                InputDisposition::Queued
            } else if input.eq_ignore_ascii_case("n") || input.eq_ignore_ascii_case("no") {
                state.pending.confirm(ConfirmDecision::NoCancel);
                InputDisposition::Queued
            } else {
                InputDisposition::FreeText
            }
        }
        _ => InputDisposition::FreeText,
    }
}

/// Print the assistant turn at `index` plus whatever affordance the display
/// selector picks for it.
fn render_assistant_turn(state: &mut SessionState, index: usize) {
    let Some(turn) = state.log.turns().get(index).cloned() else {
        return;
    };
    println!("< {}", turn.content.trim());

    if turn.is_startup_error {
        println!(
            "  (service starting — wait about {} seconds, then send your message again)",
            RETRY_WAIT_SECS
        );
        return;
    }
    if claims_booking_without_data(&turn) {
        println!("  warning: the reply describes a booking, but no calendar event was");
        println!("  returned. Re-check availability before relying on it.");
    }

    match select_affordance(index, &turn, &state.log) {
        Some(Affordance::BookingConfirmation) => {
            let Some(ref booking) = turn.booking_data else {
                return;
            };
            println!("  appointment booked");
            println!("    title:  {}", booking.title.as_deref().unwrap_or("Meeting"));
            if let Some(ref start) = booking.start_time {
                println!("    when:   {}", format_booking_start(start));
            }
            println!("    id:     {}", booking.id);
            if let Some(ref status) = booking.status {
                println!("    status: {}", status);
            }
            if let Some(ref link) = booking.html_link {
                println!("    link:   {}", link);
            }
            if state.log.celebrate(&booking.id) {
                println!("  🎉 added to your Google Calendar!");
            }
        }
        Some(Affordance::ConfirmationPrompt) => {
            println!("  confirm this booking? reply y to book, n to cancel");
        }
        Some(Affordance::TimeSlotPicker) => {
            println!("  available time slots:");
            for (i, slot) in turn.suggested_times.iter().enumerate() {
                println!("    {}. {}", i + 1, slot);
            }
            println!("  reply with a number to pick a slot");
        }
        None => {}
    }
}
