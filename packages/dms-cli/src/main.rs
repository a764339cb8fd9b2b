//! `dms` — terminal composition root for the DMS session flow.
//!
//! Wires the real API client, file-backed token storage, the session
//! store and a terminal "navigator" together the same way the mobile
//! shell composes them. Useful for poking the OTP endpoints without a
//! device in hand.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dms_api::DmsClient;
use dms_auth::{
    messages, FileTokenStorage, LocationCategory, LoginFlow, Navigator, OtpFlow, ResendOutcome,
    RouteGuard, SessionStore, VerifyOutcome,
};

#[derive(Parser)]
#[command(name = "dms", about = "Session tool for the document-management service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with a mobile number and OTP
    Login,
    /// Show whether a session is persisted
    Status,
    /// Clear the persisted session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let storage = Arc::new(FileTokenStorage::new(session_path()?));
    let session = Arc::new(SessionStore::new(storage));
    session.restore().await;

    match cli.command {
        Command::Login => login(session).await,
        Command::Status => status(&session),
        Command::Logout => logout(&session).await,
    }
}

fn session_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("no config directory on this platform")?;
    Ok(dir.join("dms").join("session.json"))
}

fn status(session: &SessionStore) -> Result<()> {
    match session.token() {
        Some(_) => println!("Signed in."),
        None => println!("Signed out."),
    }
    Ok(())
}

async fn logout(session: &SessionStore) -> Result<()> {
    session
        .sign_out()
        .await
        .context("could not clear the persisted session")?;
    println!("Signed out.");
    Ok(())
}

/// Terminal stand-in for the mobile router: the "location" is which
/// prompt loop we are in.
struct TerminalNavigator {
    location: Mutex<LocationCategory>,
}

impl Navigator for TerminalNavigator {
    fn current_location(&self) -> LocationCategory {
        *self.location.lock().unwrap()
    }

    fn navigate_to(&self, target: LocationCategory) {
        *self.location.lock().unwrap() = target;
        match target {
            LocationCategory::App => println!("→ entering the app"),
            LocationCategory::Login => println!("→ back to login"),
        }
    }
}

async fn login(session: Arc<SessionStore>) -> Result<()> {
    if session.is_authenticated() {
        println!("Already signed in. Run `dms logout` first to switch numbers.");
        return Ok(());
    }

    let api = Arc::new(DmsClient::from_env());
    let navigator = Arc::new(TerminalNavigator {
        location: Mutex::new(LocationCategory::Login),
    });
    let guard = RouteGuard::new(session.subscribe(), navigator);

    let mut login = LoginFlow::new(api.clone());
    let mobile = loop {
        let number = prompt("Mobile number: ")?;
        login.set_mobile_number(number.trim());
        match login.request_otp().await {
            Some(mobile) => break mobile,
            None => {
                if let Some(message) = login.error_message() {
                    println!("{message}");
                }
            }
        }
    };

    println!("OTP sent to {mobile}.");
    let flow = OtpFlow::start(mobile, api, session.clone());
    loop {
        let entry = flow.snapshot().await;
        let hint = if entry.resend_disabled() {
            format!("resend in {}s", entry.countdown())
        } else {
            "'r' to resend".to_string()
        };
        let line = prompt(&format!("Enter the 6-digit code ({hint}): "))?;
        let line = line.trim();

        if line.eq_ignore_ascii_case("r") {
            match flow.resend().await {
                ResendOutcome::Resent => println!("{}", messages::OTP_RESENT),
                ResendOutcome::Ignored => println!("Resend is not available yet."),
                ResendOutcome::Failed => {
                    if let Some(message) = flow.snapshot().await.error_message() {
                        println!("{message}");
                    }
                }
            }
            continue;
        }

        // Feed the whole line through the entry buffer (the paste path),
        // then submit.
        flow.input(0, line).await;
        match flow.verify().await {
            VerifyOutcome::Verified => break,
            VerifyOutcome::Ignored => continue,
            VerifyOutcome::Failed => {
                if let Some(message) = flow.snapshot().await.error_message() {
                    println!("{message}");
                }
            }
        }
    }

    // The session transition drives the redirect, same as on the phone.
    guard.evaluate();
    println!("Signed in.");
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read input")?;
    Ok(line)
}
