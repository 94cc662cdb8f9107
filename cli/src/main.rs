use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use provider_gateway::auth::{AuthApi, Credentials};
use provider_gateway::notify::{Navigator, Notification, NotificationSink};
use provider_gateway::resources::{Page, ResourceClient, ResourceGroup};
use provider_gateway::types::{ApiRequest, ApiResponse, ResponseBody};
use provider_gateway::{ApiGateway, FileStorage, GatewayConfig, GatewayError, RefreshFailure, RefreshOutcome};
use reqwest::Method;
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid header `{0}`; expected NAME=VALUE")]
    InvalidHeader(String),
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },
    #[error("no refresh token in session; run `provider-cli login` first")]
    NotSignedIn,
    #[error("token refresh failed: {0}")]
    Refresh(#[from] RefreshFailure),
}

#[derive(Parser, Debug)]
#[command(name = "provider-cli", about = "Service-provider dashboard API CLI")]
struct Cli {
    /// Backend base URL; overrides COMMON_API_URL / VITE_COMMON_API_URL.
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long, env = "PROVIDER_SESSION_FILE", default_value = ".provider-session.json")]
    session_file: PathBuf,

    /// Extra global header, repeatable.
    #[arg(long = "header", value_name = "NAME=VALUE")]
    headers: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PROVIDER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        /// Registration profile as a JSON object.
        #[arg(long)]
        data: String,
    },
    Logout,
    Whoami,
    CheckUser,
    Refresh,
    Request {
        method: String,
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    Resource(ResourceCommand),
}

#[derive(Args, Debug)]
struct ResourceCommand {
    group: GroupArg,
    #[command(subcommand)]
    action: ResourceAction,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GroupArg {
    Trips,
    Vehicles,
    Warehouses,
    Freight,
    Cha,
}

impl From<GroupArg> for ResourceGroup {
    fn from(group: GroupArg) -> Self {
        match group {
            GroupArg::Trips => Self::Trips,
            GroupArg::Vehicles => Self::Vehicles,
            GroupArg::Warehouses => Self::Warehouses,
            GroupArg::Freight => Self::Freight,
            GroupArg::Cha => Self::Cha,
        }
    }
}

#[derive(Subcommand, Debug)]
enum ResourceAction {
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Get {
        id: String,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        id: String,
    },
    Status {
        id: String,
        status: String,
    },
}

/// Prints notifications to stderr.
struct StderrSink;

impl NotificationSink for StderrSink {
    fn notify(&self, notification: Notification) {
        eprintln!("[{}] {}", notification.severity.as_str(), notification.message);
    }
}

/// A terminal has no current page; a redirect means the session is over.
struct StderrNavigator;

impl Navigator for StderrNavigator {
    fn current_path(&self) -> String {
        String::new()
    }

    fn navigate(&self, target: &str) {
        eprintln!("session ended; sign in again ({target})");
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn,provider_gateway=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let gateway = build_gateway(&cli)?;

    match cli.command {
        Command::Login { email, password } => run_login(&gateway, email, password).await,
        Command::Register { data } => run_register(&gateway, &data).await,
        Command::Logout => {
            AuthApi::new(gateway).logout();
            eprintln!("signed out");
            Ok(())
        }
        Command::Whoami => print_json(&AuthApi::new(gateway).me().await?),
        Command::CheckUser => print_json(&AuthApi::new(gateway).check_user().await?),
        Command::Refresh => run_refresh(&gateway).await,
        Command::Request { method, path, data } => run_request(&gateway, &method, path, data.as_deref()).await,
        Command::Resource(command) => run_resource(&gateway, command).await,
    }
}

fn build_gateway(cli: &Cli) -> Result<ApiGateway, CliError> {
    // Zero delay: the process exits right after the command, so a deferred
    // redirect would never fire.
    let mut config = GatewayConfig::from_env()?;
    config.redirect_delay = std::time::Duration::ZERO;
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url)?;
    }

    let gateway = ApiGateway::builder(config)
        .storage(Arc::new(FileStorage::new(&cli.session_file)))
        .notification_sink(Arc::new(StderrSink))
        .navigator(Arc::new(StderrNavigator))
        .build()?;

    for raw in &cli.headers {
        let (name, value) = parse_header(raw)?;
        gateway.headers().add(name, value);
    }
    Ok(gateway)
}

async fn run_login(gateway: &ApiGateway, email: String, password: String) -> Result<(), CliError> {
    let data = AuthApi::new(gateway.clone()).login(&Credentials { email, password }).await?;
    eprintln!("signed in as {} ({})", data.user.id, data.user.role);
    Ok(())
}

async fn run_register(gateway: &ApiGateway, data: &str) -> Result<(), CliError> {
    let profile = serde_json::from_str::<Value>(data)?;
    let registered = AuthApi::new(gateway.clone()).register(&profile).await?;
    if registered.tokens().is_some() {
        eprintln!("registered and signed in");
    } else {
        eprintln!("registered; sign in to continue");
    }
    Ok(())
}

async fn run_refresh(gateway: &ApiGateway) -> Result<(), CliError> {
    match gateway.refresh_session().await {
        RefreshOutcome::Refreshed(_) => {
            eprintln!("tokens refreshed");
            Ok(())
        }
        RefreshOutcome::NoRefreshToken => Err(CliError::NotSignedIn),
        RefreshOutcome::Failed { failure, .. } => Err(failure.into()),
    }
}

async fn run_request(gateway: &ApiGateway, method: &str, path: String, data: Option<&str>) -> Result<(), CliError> {
    let mut request = ApiRequest::new(parse_method(method)?, path);
    if let Some(data) = data {
        request = request.with_body(serde_json::from_str(data)?);
    }

    let response = gateway.request(request).await?;
    print_body(&response.body)?;
    ensure_success(&response)
}

async fn run_resource(gateway: &ApiGateway, command: ResourceCommand) -> Result<(), CliError> {
    let client = ResourceClient::new(gateway.clone(), command.group.into());
    let value = match command.action {
        ResourceAction::List { page, limit } => {
            let Page { items, pagination } = client.list::<Value>(page, limit).await?;
            if let Some(p) = pagination {
                eprintln!("page {} of {} ({} total)", p.page, p.total_pages, p.total);
            }
            Value::Array(items)
        }
        ResourceAction::Get { id } => client.get(&id).await?,
        ResourceAction::Create { data } => client.create(&serde_json::from_str::<Value>(&data)?).await?,
        ResourceAction::Update { id, data } => client.update(&id, &serde_json::from_str::<Value>(&data)?).await?,
        ResourceAction::Delete { id } => {
            client.delete(&id).await?;
            eprintln!("deleted {id}");
            return Ok(());
        }
        ResourceAction::Status { id, status } => client.update_status(&id, &status).await?,
    };
    print_json(&value)
}

fn parse_header(raw: &str) -> Result<(&str, &str), CliError> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => Err(CliError::InvalidHeader(raw.to_owned())),
    }
}

fn parse_method(raw: &str) -> Result<Method, CliError> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(|_| CliError::InvalidMethod(raw.to_owned()))
}

fn ensure_success(response: &ApiResponse) -> Result<(), CliError> {
    if response.is_success() {
        return Ok(());
    }
    Err(CliError::RequestFailed { status: response.status, message: response.failure_message() })
}

fn print_body(body: &ResponseBody) -> Result<(), CliError> {
    match body {
        ResponseBody::Empty => Ok(()),
        ResponseBody::Json(value) => print_json(value),
        ResponseBody::Text(text) => {
            println!("{text}");
            Ok(())
        }
        ResponseBody::Binary(bytes) => {
            eprintln!("<{} bytes of binary body>", bytes.len());
            Ok(())
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
