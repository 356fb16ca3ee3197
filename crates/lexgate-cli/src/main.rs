//! lexgate - command-line client for the legal assistant API.
//!
//! Signs in, keeps the bearer credential in the configured storage backend,
//! and asks questions through the gated API client.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use lexgate_core::api::{ApiClient, ApiError, SessionLoss};
use lexgate_core::auth::{AuthSession, SystemClock, TokenStore};
use lexgate_core::models::{ChangePasswordCredentials, DayRange, Page, User, UserListPage};
use lexgate_core::Config;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: lexgate <command>

Commands:
  login [email]                         Sign in and store the session
  register <email> <username> <name..>  Create an account and sign in
  logout                                Remove the stored session
  status                                Show the stored session
  whoami                                Show the signed-in account
  passwd                                Change the account password
  ask <question..>                      Ask a legal question
  history [limit]                       List recent questions
  stats                                 Show usage statistics
  users                                 List accounts (administrators only)";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{USAGE}");
        return Ok(());
    };

    let mut config = Config::load()?;
    config.check_security_context();

    let cache_dir = config.cache_dir()?;
    let storage = config
        .storage
        .open(&cache_dir)
        .context("Failed to open credential storage")?;
    let store = Arc::new(TokenStore::new(storage, Arc::new(SystemClock)));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let api = ApiClient::new(&config, store, tx)?;
    let mut session = AuthSession::new(api);

    info!(command = command, "lexgate starting");
    let result = run(command, &args[1..], &mut config, &mut session).await;

    drain_session_events(&mut rx, &mut session);
    if let Err(e) = &result {
        if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_session_end) {
            eprintln!("Not signed in; run `lexgate login` first");
        }
    }
    result
}

async fn run(command: &str, args: &[String], config: &mut Config, session: &mut AuthSession) -> Result<()> {
    match command {
        "login" => {
            let email = match args.first().cloned().or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt("Email: ")?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            let user = session.login(&email, &password).await?;

            config.last_email = Some(email);
            if let Err(e) = config.save() {
                tracing::warn!(error = %e, "Failed to save config");
            }
            println!("Signed in as {} <{}>", user.display_name(), user.email);
        }
        "register" => {
            let [email, username, name @ ..] = args else {
                anyhow::bail!("register needs <email> <username> <full name>");
            };
            if name.is_empty() {
                anyhow::bail!("register needs a full name");
            }
            let password = rpassword::prompt_password("Password: ")?;
            let user = session
                .register(email, username, &password, &name.join(" "))
                .await?;
            println!("Account created; signed in as {}", user.display_name());
        }
        "logout" => {
            session.logout();
            println!("Signed out");
        }
        "status" => print_status(session),
        "whoami" => match session.restore().await {
            lexgate_core::AuthState::Authenticated(user) => {
                let role = user
                    .role
                    .map(|r| format!("{r:?}").to_lowercase())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("{} <{}> ({})", user.display_name(), user.email, role);
                if user.is_admin() {
                    println!("Administrator: `lexgate users` lists accounts");
                }
            }
            lexgate_core::AuthState::Anonymous => println!("Not signed in"),
        },
        "passwd" => {
            let current_password = rpassword::prompt_password("Current password: ")?;
            let new_password = rpassword::prompt_password("New password: ")?;
            let credentials = ChangePasswordCredentials {
                current_password,
                new_password,
            };
            let response = session.api().change_password(&credentials).await?;
            println!("{}", response.message);
        }
        "ask" => {
            if args.is_empty() {
                anyhow::bail!("ask needs a question");
            }
            let answer = session.api().ask(&args.join(" ")).await?;
            println!("{}\n", answer.short_conclusion);
            println!("{}\n", answer.detailed_reasoning);
            for source in &answer.sources {
                println!("  [{:.2}] {} {}", source.score, source.title, source.anchor);
            }
            println!(
                "\nconfidence {:.0}%, {} ms",
                answer.confidence * 100.0,
                answer.response_time_ms
            );
        }
        "history" => {
            let limit = match args.first() {
                Some(limit) => limit.parse().context("history limit must be a number")?,
                None => 10,
            };
            let queries = session.api().history(&Page::new(limit, 0)).await?;
            if queries.is_empty() {
                println!("No questions yet");
            }
            for query in &queries {
                let when = query.created_at.as_deref().unwrap_or("-");
                println!("{when}  {}", query.question);
                if let Some(conclusion) = &query.short_conclusion {
                    println!("    {conclusion}");
                }
            }
        }
        "stats" => {
            let dashboard = session.api().dashboard().await?;
            let chart = session.api().usage_chart(&DayRange { days: Some(30) }).await?;
            let usage = &dashboard.usage_summary;
            println!("Total questions: {}", dashboard.stats.total_queries);
            println!(
                "Today: {} used, {} remaining",
                usage.daily_queries_used, usage.daily_queries_remaining
            );
            println!(
                "This month: {} used, {} remaining",
                usage.monthly_queries_used, usage.monthly_queries_remaining
            );
            println!("Last 30 days: {}", chart.total_queries());
        }
        "users" => {
            session.restore().await;
            if !session.user().is_some_and(User::is_admin) {
                anyhow::bail!("users is only available to administrators");
            }
            let users = session.api().list_users(&UserListPage::default()).await?;
            for user in &users {
                let status = if user.is_active { "active" } else { "disabled" };
                println!(
                    "{:<10} {:<30} {:?} {status}",
                    user.username, user.email, user.role
                );
            }
        }
        _ => {
            eprintln!("{USAGE}");
            anyhow::bail!("unknown command: {command}");
        }
    }
    Ok(())
}

fn print_status(session: &AuthSession) {
    let store = session.api().store();
    if !store.is_persistent() {
        println!("Credential storage: unavailable");
    }
    match store.retrieve() {
        Some(credential) => {
            println!("Session: active");
            if let Some(subject) = credential.subject() {
                println!("Subject: {subject}");
            }
            match store.expiry_of(credential.raw()) {
                Some(expiry) => println!("Expires: {}", expiry.to_rfc3339()),
                None => println!("Expires: never"),
            }
        }
        None => println!("Session: none"),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Report every session loss the gate announced during this run.
fn drain_session_events(rx: &mut UnboundedReceiver<SessionLoss>, session: &mut AuthSession) {
    while let Ok(loss) = rx.try_recv() {
        session.on_session_lost(&loss);
        if loss.reason != lexgate_core::LossReason::Logout {
            eprintln!(
                "Session ended ({}); sign in again via {}",
                loss.reason, loss.redirect_to
            );
        }
    }
}
