//! opspanel - an interactive terminal console for the admin panel API.
//!
//! The console signs in with username, password, and this machine's
//! device identifier, then offers commands for managing administrator
//! accounts and inspecting the server's API access log.

use std::io::{self, Write};

use anyhow::Result;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use opspanel_core::auth::{LOGIN_REDIRECT_DELAY, LOGOUT_REDIRECT_DELAY, REAUTH_REDIRECT_DELAY};
use opspanel_core::models::{AdminStatus, AdministratorUpdate, LogQuery, NewAdministrator};
use opspanel_core::{
    ApiClient, ApiError, AuthFlow, Config, FingerprintProvider, MachineIdSource, SessionStore,
};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

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
    info!("opspanel console starting");

    let mut config = Config::load()?;
    let store = SessionStore::new();

    let mut api = ApiClient::new(config.api_base_url.clone(), store.clone())?;
    api.set_error_hook(|e| eprintln!("API error: {e}"));

    let fingerprint = FingerprintProvider::new(MachineIdSource);
    let flow = AuthFlow::new(api.clone(), store, fingerprint);

    println!("opspanel console - {}", api.base_url());

    // Resolve the device identifier up front so a broken capability is
    // visible before anyone types a password
    if let Err(e) = flow.fingerprint().initialize().await {
        eprintln!("Warning: {e}. Login will be refused until it is available.");
    }

    let result = run_console(&mut config, &api, &flow).await;

    info!("opspanel console shutting down");
    result
}

async fn run_console(
    config: &mut Config,
    api: &ApiClient,
    flow: &AuthFlow<MachineIdSource>,
) -> Result<()> {
    loop {
        if !flow.is_authenticated() {
            if !login(config, flow).await? {
                return Ok(());
            }
        }

        let line = prompt("opspanel> ")?;
        let mut parts = line.split_whitespace();
        let command = match parts.next() {
            Some(command) => command,
            None => continue,
        };
        let args: Vec<&str> = parts.collect();

        let outcome = match command {
            "help" => {
                print_help();
                Ok(())
            }
            "me" => show_current_admin(api).await,
            "admins" => list_admins(api, &args).await,
            "admin" => show_admin(api, &args).await,
            "create" => create_admin(api).await,
            "enable" => set_admin_status(api, &args, AdminStatus::Active).await,
            "disable" => set_admin_status(api, &args, AdminStatus::Inactive).await,
            "logs" => show_logs(api, &args).await,
            "logout" => {
                flow.logout();
                println!("Logged out.");
                sleep(LOGOUT_REDIRECT_DELAY).await;
                Ok(())
            }
            "quit" | "exit" => return Ok(()),
            other => {
                println!("Unknown command: {other} (try 'help')");
                Ok(())
            }
        };

        if let Err(e) = outcome {
            if matches!(e, ApiError::Unauthorized) {
                println!("Session invalid or expired. Returning to login...");
                sleep(REAUTH_REDIRECT_DELAY).await;
            }
            // Everything else was already surfaced through the error hook
        }
    }
}

/// Run the login prompt until a session exists. Returns false when the
/// user backs out with an empty username.
async fn login(config: &mut Config, flow: &AuthFlow<MachineIdSource>) -> Result<bool> {
    loop {
        let default = config.last_username.clone().unwrap_or_default();
        let label = if default.is_empty() {
            "Username (blank to quit): ".to_string()
        } else {
            format!("Username [{default}] (blank to quit): ")
        };

        let mut username = prompt(&label)?;
        if username.is_empty() {
            if default.is_empty() {
                return Ok(false);
            }
            username = default;
        }

        let password = rpassword::prompt_password("Password: ")?;

        match flow.submit(&username, &password).await {
            Ok(()) => {
                println!("Login successful.");
                config.last_username = Some(username);
                if let Err(e) = config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                sleep(LOGIN_REDIRECT_DELAY).await;
                return Ok(true);
            }
            Err(e) => {
                eprintln!("{e}");
            }
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  me                      show the logged-in administrator");
    println!("  admins [skip] [limit]   list administrator accounts");
    println!("  admin <id>              show one administrator");
    println!("  create                  create an administrator (interactive)");
    println!("  enable <id>             set an administrator active");
    println!("  disable <id>            set an administrator inactive");
    println!("  logs [key=value ...]    query the API access log");
    println!("                          keys: method, status, path, skip, limit");
    println!("  logout                  drop the session");
    println!("  quit                    leave the console");
}

async fn show_current_admin(api: &ApiClient) -> Result<(), ApiError> {
    let admin = api.fetch_current_admin().await?;
    println!(
        "{} ({}) status={}",
        admin.username,
        admin.short_id(),
        admin.status.display_name()
    );
    if let Some(last_login) = admin.last_login_at {
        println!("  last login: {last_login}");
    }
    Ok(())
}

async fn list_admins(api: &ApiClient, args: &[&str]) -> Result<(), ApiError> {
    let skip = args.first().and_then(|s| s.parse().ok()).unwrap_or(0);
    let limit = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(20);

    let admins = api.list_administrators(skip, limit).await?;
    if admins.is_empty() {
        println!("No administrators found.");
        return Ok(());
    }
    for admin in &admins {
        println!(
            "{:<12} {:<24} status={:<8} hwid={}",
            admin.short_id(),
            admin.username,
            admin.status.display_name(),
            if admin.has_device_binding() { "bound" } else { "-" }
        );
    }
    Ok(())
}

async fn show_admin(api: &ApiClient, args: &[&str]) -> Result<(), ApiError> {
    let Some(id) = args.first() else {
        println!("Usage: admin <id>");
        return Ok(());
    };
    let admin = api.fetch_administrator(id).await?;
    println!("id:         {}", admin.id);
    println!("username:   {}", admin.username);
    println!("status:     {}", admin.status.display_name());
    if let Some(created) = admin.created_at {
        println!("created:    {created}");
    }
    if let Some(hash) = &admin.client_hwid_identifier_hash {
        println!("hwid hash:  {hash}");
    }
    Ok(())
}

async fn create_admin(api: &ApiClient) -> Result<(), ApiError> {
    let username = match prompt("New username: ") {
        Ok(u) if !u.is_empty() => u,
        _ => {
            println!("Username and password are required.");
            return Ok(());
        }
    };
    let password = match rpassword::prompt_password("New password: ") {
        Ok(p) if !p.is_empty() => p,
        _ => {
            println!("Username and password are required.");
            return Ok(());
        }
    };
    let hwid = prompt("Device identifier (blank for none): ").unwrap_or_default();

    let new_admin = NewAdministrator {
        username,
        password,
        client_hwid_identifier: if hwid.is_empty() { None } else { Some(hwid) },
    };

    let created = api.create_administrator(&new_admin).await?;
    println!("Created administrator {} ({})", created.username, created.short_id());
    Ok(())
}

async fn set_admin_status(
    api: &ApiClient,
    args: &[&str],
    status: AdminStatus,
) -> Result<(), ApiError> {
    let Some(id) = args.first() else {
        println!("Usage: enable|disable <id>");
        return Ok(());
    };
    let updated = api
        .update_administrator(id, &AdministratorUpdate::status_only(status))
        .await?;
    println!(
        "{} is now {}",
        updated.username,
        updated.status.display_name()
    );
    Ok(())
}

async fn show_logs(api: &ApiClient, args: &[&str]) -> Result<(), ApiError> {
    let mut query = LogQuery::default();
    for arg in args {
        match arg.split_once('=') {
            Some(("method", v)) => query.method = Some(v.to_string()),
            Some(("status", v)) => query.status_code = v.parse().ok(),
            Some(("path", v)) => query.path_contains = Some(v.to_string()),
            Some(("skip", v)) => query.skip = v.parse().unwrap_or(0),
            Some(("limit", v)) => query.limit = v.parse().unwrap_or(50),
            _ => {
                println!("Ignoring unrecognized filter: {arg}");
            }
        }
    }

    let entries = api.fetch_api_logs(&query).await?;
    if entries.is_empty() {
        println!("No log entries matched.");
        return Ok(());
    }
    for entry in &entries {
        let timestamp = entry
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let who = entry
            .admin_id
            .as_deref()
            .or(entry.user_id.as_deref())
            .unwrap_or("-");
        println!(
            "{timestamp}  {:>3}  {:<6} {:<40} {}",
            entry.status_code, entry.method, entry.path, who
        );
    }
    println!("({} entries)", entries.len());
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        anyhow::bail!("input closed");
    }
    Ok(line.trim().to_string())
}
