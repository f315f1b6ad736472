//! CLI command implementations.

use lakehouse_session::{
    AppContext, ApiError, AuthError, ClientConfig, Decision, FileQuery, Route, Screen,
    SessionStatus, StatsKind,
};
use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Auth(String),

    #[error("not signed in. Use 'lakehouse login <username>' first")]
    NotSignedIn,

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Message shown for a failed login. Deliberately generic.
fn login_failure_message(err: &AuthError) -> String {
    if err.is_transport() {
        "Login failed: could not reach the server".to_string()
    } else {
        "Login failed: invalid username or password".to_string()
    }
}

/// Message shown for a failed registration.
fn register_failure_message(err: &AuthError) -> String {
    match err {
        AuthError::Conflict(_) => "Registration failed: username already taken".to_string(),
        e if e.is_transport() => "Registration failed: could not reach the server".to_string(),
        _ => "Registration failed".to_string(),
    }
}

fn screen_name(screen: Screen) -> String {
    match screen {
        Screen::Waiting => "waiting".to_string(),
        Screen::Login => "login".to_string(),
        Screen::Register => "register".to_string(),
        Screen::AdminDashboard => "admin dashboard".to_string(),
        Screen::UserDashboard => "user dashboard".to_string(),
        Screen::Page(page) => page.as_str().to_string(),
    }
}

fn describe_decision(decision: Decision) -> String {
    match decision {
        Decision::Render(screen) => format!("render {}", screen_name(screen)),
        Decision::Redirect(screen) => format!("redirect -> {}", screen_name(screen)),
    }
}

fn read_secret(prompt: &str) -> Result<String> {
    eprint!("{prompt}: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

fn require_session(ctx: &AppContext) -> Result<()> {
    match ctx.session.status() {
        SessionStatus::Authenticated(_) => Ok(()),
        _ => Err(CliError::NotSignedIn),
    }
}

/// Sign in.
pub async fn login(ctx: &AppContext, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_secret("Password")?,
    };

    match ctx.gateway.try_login(username, &password).await {
        Ok(claims) => {
            println!("Signed in as {} ({})", claims.subject, claims.role);
            println!("{}", describe_decision(ctx.decide(Route::Dashboard)));
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = %e, "Login error detail");
            Err(CliError::Auth(login_failure_message(&e)))
        }
    }
}

/// Create an account.
pub async fn register(ctx: &AppContext, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_secret("Password")?,
    };

    match ctx.gateway.try_register(username, &password).await {
        Ok(()) => {
            println!("Account '{username}' created. Sign in with 'lakehouse login {username}'.");
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = %e, "Registration error detail");
            Err(CliError::Auth(register_failure_message(&e)))
        }
    }
}

/// Sign out.
pub fn logout(ctx: &AppContext) {
    ctx.gateway.logout();
    println!("Signed out.");
}

fn session_summary(ctx: &AppContext) -> Vec<String> {
    let Some(claims) = ctx.session.claims() else {
        return vec!["Not signed in.".to_string()];
    };

    let mut lines = vec![
        format!("User:    {}", claims.subject),
        format!("Role:    {}", claims.role),
    ];
    if let Some(id) = claims.user_id {
        lines.push(format!("User ID: {id}"));
    }
    lines.push(format!(
        "Expires: {} (unix time, not verified locally)",
        claims.expiry
    ));
    lines
}

/// Show the current session.
pub fn whoami(ctx: &AppContext) {
    for line in session_summary(ctx) {
        println!("{line}");
    }
}

/// Show the route guard decision for `path`.
pub fn route(ctx: &AppContext, path: &str) {
    println!("{}", describe_decision(ctx.decide(Route::from_path(path))));
}

/// Show the config stored at `path`, applying and saving any changes.
pub fn config(path: &Path, api_url: Option<String>, timeout: Option<u64>) -> Result<ClientConfig> {
    let mut config = ClientConfig::load_from(path);
    let changed = api_url.is_some() || timeout.is_some();

    if let Some(url) = api_url {
        config.api_url = url;
    }
    if let Some(secs) = timeout {
        config.request_timeout_secs = secs;
    }
    if changed {
        config.save_to(path).map_err(CliError::Config)?;
        println!("Saved {}", path.display());
    }

    match serde_json::to_string_pretty(&config) {
        Ok(text) => println!("{text}"),
        Err(e) => return Err(CliError::Config(e.to_string())),
    }
    Ok(config)
}

/// Dashboard metric cards.
pub async fn metrics(ctx: &AppContext) -> Result<()> {
    require_session(ctx)?;
    print_json(&ctx.dashboard.metrics().await?);
    Ok(())
}

/// List catalog files.
pub async fn files(ctx: &AppContext, query: &FileQuery) -> Result<()> {
    require_session(ctx)?;
    print_json(&ctx.dashboard.list_files(query).await?);
    Ok(())
}

/// Show one catalog entry.
pub async fn file(ctx: &AppContext, id: i64) -> Result<()> {
    require_session(ctx)?;
    print_json(&ctx.dashboard.file_details(id).await?);
    Ok(())
}

/// Delete a catalog entry.
pub async fn delete(ctx: &AppContext, id: i64) -> Result<()> {
    require_session(ctx)?;
    print_json(&ctx.dashboard.delete_file(id).await?);
    Ok(())
}

/// Upload a local file.
pub async fn upload(ctx: &AppContext, path: &Path) -> Result<()> {
    require_session(ctx)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let contents = std::fs::read(path)?;

    tracing::info!(file = %file_name, bytes = contents.len(), "Uploading");
    print_json(&ctx.dashboard.upload(&file_name, contents).await?);
    Ok(())
}

/// Search documents.
pub async fn search(ctx: &AppContext, query: &str, limit: u32) -> Result<()> {
    print_json(&ctx.dashboard.search(query, limit).await?);
    Ok(())
}

/// Storage or processing statistics.
pub async fn stats(ctx: &AppContext, kind: StatsKind) -> Result<()> {
    require_session(ctx)?;
    print_json(&ctx.dashboard.stats(kind).await?);
    Ok(())
}

/// Check API health.
pub async fn health(ctx: &AppContext) -> Result<()> {
    let healthy = ctx.dashboard.health().await?;
    println!("API:     {}", ctx.api.base_url());
    println!("Healthy: {}", if healthy { "yes" } else { "no" });
    Ok(())
}

/// Change the signed-in user's password.
pub async fn change_password(
    ctx: &AppContext,
    old: Option<String>,
    new: Option<String>,
) -> Result<()> {
    require_session(ctx)?;

    let old = match old {
        Some(p) => p,
        None => read_secret("Current password")?,
    };
    let new = match new {
        Some(p) => p,
        None => read_secret("New password")?,
    };

    match ctx.gateway.change_password(&old, &new).await {
        Ok(()) => {
            println!("Password changed.");
            Ok(())
        }
        Err(AuthError::NotAuthenticated) => Err(CliError::NotSignedIn),
        Err(AuthError::Rejected { message, .. }) => {
            Err(CliError::Auth(format!("Password change failed: {message}")))
        }
        Err(e) => Err(CliError::Auth(format!("Password change failed: {e}"))),
    }
}
