// UI layer: interactive menu using `dialoguer`, a progress bar from
// `indicatif` and a timestamped activity log. The form is collected here and
// handed to the `Session`; everything after that arrives as events.

use crate::api::CouponApi;
use crate::config::AppConfig;
use crate::session::{LogLevel, Session, SessionEvent};
use crate::types::AssignmentForm;
use anyhow::Result;
use chrono::Local;
use crossterm::cursor::MoveTo;
use crossterm::style::{style, Stylize};
use crossterm::terminal::{Clear, ClearType};
use dialoguer::{Confirm, Editor, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Main interactive menu. Runs a select loop until the operator picks "Exit".
pub fn main_menu<A: CouponApi + 'static>(
    config: &AppConfig,
    session: Session<A>,
    events: Receiver<SessionEvent>,
) -> Result<()> {
    println!("{}", style(&config.ui.window_title).bold());
    loop {
        let items = vec!["Assign coupons", "Show configuration", "Clear log", "Exit"];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => {
                let form = collect_form(config)?;
                run_assignment(&session, &events, form)?;
            }
            1 => show_configuration(config),
            2 => {
                clear_screen(&mut std::io::stdout())?;
                print_log(LogLevel::Info, "Fields cleared");
            }
            3 => break,
            _ => {}
        }
    }
    Ok(())
}

fn show_configuration(config: &AppConfig) {
    let enabled = |flag: bool| if flag { "Enabled" } else { "Disabled" };
    println!("{}", style("Configuration").bold());
    println!("  API: {}", config.api.base_url);
    println!("  Auth type: {}", config.api.auth_type.as_str());
    println!(
        "  Batch Processing: {}",
        enabled(config.features.enable_batch_processing)
    );
    println!(
        "  Duplicate coupons by default: {}",
        if config.features.allow_duplicate_coupons { "Yes" } else { "No" }
    );
    println!("  Max batch size: {}", config.features.max_batch_size);
}

/// Prompt for every form field. Nothing is validated here; empty answers are
/// allowed so the validator can report them.
fn collect_form(config: &AppConfig) -> Result<AssignmentForm> {
    let username: String = Input::new()
        .with_prompt("API Username")
        .allow_empty(true)
        .interact_text()?;
    // `Password` hides input in terminal for passwords.
    let password: String = Password::new()
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()?;
    let coupon_id: String = Input::new()
        .with_prompt("Coupon ID")
        .allow_empty(true)
        .interact_text()?;

    let sources = vec!["Type member IDs (comma-separated)", "Open editor (one per line)"];
    let member_ids = match Select::new()
        .with_prompt("Member IDs")
        .items(&sources)
        .default(0)
        .interact()?
    {
        0 => Input::<String>::new()
            .with_prompt("Member IDs")
            .allow_empty(true)
            .interact_text()?,
        // closing the editor without saving counts as an empty list
        _ => Editor::new().edit("")?.unwrap_or_default(),
    };

    let allow_duplicates = Confirm::new()
        .with_prompt("Allow duplicate coupons for same member?")
        .default(config.features.allow_duplicate_coupons)
        .interact()?;

    Ok(AssignmentForm {
        username,
        password,
        coupon_id,
        member_ids,
        allow_duplicates,
    })
}

/// Submit the form and render events until the attempt finishes.
fn run_assignment<A: CouponApi + 'static>(
    session: &Session<A>,
    events: &Receiver<SessionEvent>,
    form: AssignmentForm,
) -> Result<()> {
    let handle = match session.submit(form) {
        Some(h) => h,
        None => {
            print_log(LogLevel::Warning, "An assignment is already in progress");
            return Ok(());
        }
    };

    // each run starts with an empty log
    clear_screen(&mut std::io::stdout())?;
    let pb = ProgressBar::new(100);
    pb.set_style(ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")?);

    let mut outcome = None;
    while outcome.is_none() {
        match events.recv_timeout(POLL_INTERVAL) {
            Ok(event) => outcome = render_event(&pb, event),
            // a panicked worker never sends `Finished`
            Err(RecvTimeoutError::Timeout) if handle.is_finished() => {
                outcome = events.try_iter().find_map(|e| render_event(&pb, e));
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    let succeeded = outcome.unwrap_or(false);

    if succeeded {
        pb.set_position(100);
        pb.finish_with_message("Done");
    } else {
        pb.set_position(0);
        pb.abandon_with_message("Failed");
    }
    if handle.join().is_err() {
        print_log(LogLevel::Error, "Error: assignment worker panicked");
    }
    Ok(())
}

/// Draw one event. Returns `Some(success)` for the final event.
fn render_event(pb: &ProgressBar, event: SessionEvent) -> Option<bool> {
    match event {
        SessionEvent::Log { level, message } => pb.println(format_log(level, &message)),
        SessionEvent::Progress(p) => {
            pb.set_position((p.fraction.clamp(0.0, 1.0) * 100.0).round() as u64);
        }
        SessionEvent::Phase(phase) => pb.set_message(format!("{:?}", phase)),
        SessionEvent::Finished(outcome) => return Some(outcome.is_ok()),
    }
    None
}

fn clear_screen<W: Write>(out: &mut W) -> std::io::Result<()> {
    crossterm::execute!(out, Clear(ClearType::All), MoveTo(0, 0))
}

fn format_log(level: LogLevel, message: &str) -> String {
    let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
    match level {
        LogLevel::Info => line,
        LogLevel::Success => style(line).green().to_string(),
        LogLevel::Warning => style(line).yellow().to_string(),
        LogLevel::Error => style(line).red().to_string(),
    }
}

fn print_log(level: LogLevel, message: &str) {
    println!("{}", format_log(level, message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_lines_carry_a_timestamp() {
        let line = format_log(LogLevel::Info, "Authenticating...");
        assert!(line.starts_with('['));
        assert!(line.ends_with("] Authenticating..."));
        // [HH:MM:SS]
        assert_eq!(line.find(']'), Some(9));
    }

    #[test]
    fn clear_screen_wipes_and_homes_cursor() {
        let mut out = Vec::new();
        clear_screen(&mut out).unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.starts_with("\x1b[2J"));
        assert!(written.ends_with("\x1b[1;1H"));
    }
}
