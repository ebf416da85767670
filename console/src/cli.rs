//! Command-line front end
//!
//! Every command drives the same stores the interactive console uses, so
//! validation, pricing, confirmation, and cache invalidation behave the same
//! way. Read-only listings that no screen owns go straight to the client.

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use ticket_verifier_api::{
    ApiClient, ApiConfig, FileStore, LocalStore, LoginRequest, Order, OrderStatus, OrderUpdate,
    SearchFilters, SessionEvents, TicketApi, TransactionKind, Wave,
};
use ticket_verifier_core::environment::SystemClock;
use ticket_verifier_core::reducer::Reducer;
use ticket_verifier_runtime::Store;

use crate::app::Console;
use crate::auth::{AuthAction, LoginStatus, PasswordChangeStatus, PasswordForm};
use crate::config::Config;
use crate::dashboard::{DashboardAction, DashboardState, Notice, OrderStats, WaveField};
use crate::environment::ConsoleEnvironment;
use crate::order_form::{OrderFormAction, Submission, WaveAvailability};
use crate::pricing::{Money, PriceSource, Quote};
use crate::query::QueryKey;
use crate::receipt::{self, Receipt};
use crate::router::Route;
use crate::validation;

/// Upper bound for one command's requests
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Ticket Verifier console
#[derive(Parser, Debug)]
#[command(name = "ticket-verifier", version)]
#[command(about = "Order tickets and administer the Ticket Verifier backend", long_about = None)]
pub struct Cli {
    /// Backend base URL (overrides `TICKET_VERIFIER_API_URL`)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(flatten)]
    pub credentials: Credentials,

    #[command(subcommand)]
    pub command: Command,
}

/// Admin credentials for commands that need a session
#[derive(Args, Clone, Default)]
pub struct Credentials {
    /// Admin username
    #[arg(long, env = "TICKET_VERIFIER_USERNAME", global = true)]
    pub username: Option<String>,

    /// Admin password
    #[arg(long, env = "TICKET_VERIFIER_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    fn login_request(&self) -> anyhow::Result<LoginRequest> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(LoginRequest {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => bail!(
                "This command needs an admin session: pass --username and --password \
                 or set TICKET_VERIFIER_USERNAME and TICKET_VERIFIER_PASSWORD"
            ),
        }
    }
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Price a ticket request against the active wave
    Quote {
        /// Boys' tickets
        #[arg(long, default_value_t = 0)]
        boys: i32,
        /// Girls' tickets
        #[arg(long, default_value_t = 0)]
        girls: i32,
    },
    /// The wave currently on sale
    Wave {
        #[command(subcommand)]
        command: WaveCommand,
    },
    /// Submit an order with a payment receipt
    Submit {
        /// Name on the order
        #[arg(long)]
        name: String,
        /// Contact email
        #[arg(long)]
        email: String,
        /// Boys' tickets
        #[arg(long, default_value_t = 0)]
        boys: i32,
        /// Girls' tickets
        #[arg(long, default_value_t = 0)]
        girls: i32,
        /// Receipt image (JPG, PNG) or PDF
        #[arg(long)]
        receipt: Option<PathBuf>,
    },
    /// Review orders (admin)
    Orders {
        #[command(subcommand)]
        command: OrdersCommand,
    },
    /// Manage pricing waves (admin)
    Waves {
        #[command(subcommand)]
        command: WavesCommand,
    },
    /// Import payment-app exports (admin)
    Csv {
        #[command(subcommand)]
        command: CsvCommand,
    },
    /// Imported payment transactions (admin)
    Transactions {
        /// Ledger to read
        #[arg(value_enum)]
        ledger: Ledger,
        /// Print the backend's CSV export instead of a table
        #[arg(long)]
        export: bool,
    },
    /// Order and revenue aggregates (admin)
    Analytics,
    /// Change the admin password; the current one comes from --password
    ChangePassword {
        /// New password
        #[arg(long)]
        new_password: String,
        /// New password again
        #[arg(long)]
        confirm_password: String,
    },
}

/// `wave` subcommands
#[derive(Subcommand, Debug)]
pub enum WaveCommand {
    /// Show the active wave and its prices
    Current,
    /// Keep polling the active wave and print every change
    Watch,
}

/// `orders` subcommands
#[derive(Subcommand, Debug)]
pub enum OrdersCommand {
    /// List orders
    List {
        /// Only this status
        #[arg(long, value_parser = parse_status)]
        status: Option<OrderStatus>,
        /// Only this wave
        #[arg(long)]
        wave: Option<i64>,
        /// Free-text search over name and email
        #[arg(long)]
        search: Option<String>,
        /// Created on or after
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Created on or before
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Page number
        #[arg(long)]
        page: Option<u32>,
        /// Orders per page
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Show one order
    Show {
        /// Order id
        id: i64,
    },
    /// Change an order's details or status
    Update {
        /// Order id
        id: i64,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Contact email
        #[arg(long)]
        email: Option<String>,
        /// New status
        #[arg(long, value_parser = parse_status)]
        status: Option<OrderStatus>,
        /// Administrator notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete an order
    Delete {
        /// Order id
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Approve an order
    Approve {
        /// Order id
        id: i64,
    },
    /// Reject an order
    Reject {
        /// Order id
        id: i64,
    },
    /// Print the URL of an order's receipt
    Receipt {
        /// Order id
        id: i64,
    },
    /// Print the backend's CSV export of all orders
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print verified emails for the ticketing tool
    ExportEmails {
        /// One line joined with `, ` instead of one address per line
        #[arg(long)]
        comma: bool,
    },
    /// Re-run payment matching over every order
    RerunMatching,
}

/// `waves` subcommands
#[derive(Subcommand, Debug)]
pub enum WavesCommand {
    /// List every wave
    List,
    /// Create a wave
    Create {
        /// Display name
        #[arg(long)]
        name: String,
        /// First day of sales (default today)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day of sales (default three days after the start)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Boys' ticket price in dollars
        #[arg(long)]
        boys_price: Option<f64>,
        /// Girls' ticket price in dollars
        #[arg(long)]
        girls_price: Option<f64>,
        /// Start selling immediately
        #[arg(long)]
        active: bool,
    },
    /// Change a wave
    Update {
        /// Wave id
        id: i64,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// First day of sales
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day of sales
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Boys' ticket price in dollars
        #[arg(long)]
        boys_price: Option<f64>,
        /// Girls' ticket price in dollars
        #[arg(long)]
        girls_price: Option<f64>,
    },
    /// Delete a wave
    Delete {
        /// Wave id
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Make a wave the only active one
    Activate {
        /// Wave id
        id: i64,
    },
    /// Stop selling a wave
    Deactivate {
        /// Wave id
        id: i64,
    },
}

/// `csv` subcommands
#[derive(Subcommand, Debug)]
pub enum CsvCommand {
    /// Upload a Venmo or Zelle CSV export
    Upload {
        /// CSV file
        path: PathBuf,
    },
    /// Show previous uploads
    History,
}

/// Payment ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Ledger {
    /// Venmo transactions
    Venmo,
    /// Zelle transactions
    Zelle,
}

impl From<Ledger> for TransactionKind {
    fn from(ledger: Ledger) -> Self {
        match ledger {
            Ledger::Venmo => Self::Venmo,
            Ledger::Zelle => Self::Zelle,
        }
    }
}

fn parse_status(value: &str) -> Result<OrderStatus, String> {
    [
        OrderStatus::Pending,
        OrderStatus::Approved,
        OrderStatus::Rejected,
        OrderStatus::Verified,
        OrderStatus::Completed,
    ]
    .into_iter()
    .find(|status| status.as_str().eq_ignore_ascii_case(value))
    .ok_or_else(|| format!("unknown order status `{value}`"))
}

// ============================================================================
// Execution
// ============================================================================

/// Run a parsed command
///
/// # Errors
///
/// Returns an error when the backend is unreachable, rejects the request,
/// or the input fails validation.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let api_config = match &cli.api_url {
        Some(url) => ApiConfig::new(url.clone()).with_timeout(config.api.timeout),
        None => config.api.clone(),
    };
    tracing::debug!(base_url = %api_config.base_url, "Using backend");

    let session = SessionEvents::new();
    let storage: Arc<dyn LocalStore> = Arc::new(FileStore::new(&config.storage_path));
    let api = ApiClient::new(api_config, Arc::clone(&storage), session.clone())
        .context("failed to build the HTTP client")?;
    let env = ConsoleEnvironment::new(Arc::new(api), storage, Arc::new(SystemClock), session);

    match cli.command {
        Command::Quote { boys, girls } => quote(env, boys, girls).await,
        Command::Wave {
            command: WaveCommand::Current,
        } => current_wave(env).await,
        Command::Wave {
            command: WaveCommand::Watch,
        } => watch_wave(env.with_poll_interval(config.poll_interval)).await,
        Command::Submit {
            name,
            email,
            boys,
            girls,
            receipt,
        } => submit(env, name, email, boys, girls, receipt.as_deref()).await,
        Command::ChangePassword {
            new_password,
            confirm_password,
        } => {
            let console = admin(env, &cli.credentials).await?;
            change_password(&console, &cli.credentials, new_password, confirm_password).await
        }
        Command::Orders { command } => {
            let console = admin(env, &cli.credentials).await?;
            orders(&console, command).await
        }
        Command::Waves { command } => {
            let console = admin(env, &cli.credentials).await?;
            waves(&console, command).await
        }
        Command::Csv { command } => {
            let console = admin(env, &cli.credentials).await?;
            csv(&console, command).await
        }
        Command::Transactions { ledger, export } => {
            let console = admin(env, &cli.credentials).await?;
            transactions(&console, ledger.into(), export).await
        }
        Command::Analytics => {
            let console = admin(env, &cli.credentials).await?;
            analytics(&console).await
        }
    }
}

/// Send an action and wait for everything it triggers
async fn dispatch<S, A, E, R>(store: &Store<S, A, E, R>, action: A) -> anyhow::Result<()>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + 'static,
    E: Send + Sync + 'static,
{
    let mut handle = store.send(action)?;
    handle
        .wait_with_timeout(COMMAND_TIMEOUT)
        .await
        .context("the backend did not answer in time")?;
    Ok(())
}

/// Print a dashboard notice; errors become the command's error
fn report(notice: Option<Notice>) -> anyhow::Result<()> {
    match notice {
        Some(Notice::Error(message)) => bail!("{message}"),
        Some(Notice::Warning(message)) => eprintln!("warning: {message}"),
        Some(Notice::Success(message) | Notice::Info(message)) => println!("{message}"),
        None => {}
    }
    Ok(())
}

/// Ask before a destructive command; `--yes` skips the question
fn confirm(question: &str, yes: bool) -> anyhow::Result<bool> {
    if yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        bail!("{question} Pass --yes to confirm when not running interactively");
    }
    eprint!("{question} [y/N] ");
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

fn dollars(amount: f64) -> String {
    Money::from_dollars(amount).map_or_else(|| format!("{amount:.2}"), |m| m.to_string())
}

// ============================================================================
// Customer commands
// ============================================================================

async fn order_form(env: ConsoleEnvironment) -> anyhow::Result<Console> {
    let console = Console::start(env, Route::OrderForm).await?;
    dispatch(&console.order_form, OrderFormAction::Mount).await?;
    Ok(console)
}

fn print_quote(quote: &Quote) {
    match &quote.source {
        PriceSource::Wave { name, .. } => println!("Pricing: {name}"),
        PriceSource::Default => println!("Pricing: default (no active wave)"),
    }
    println!("  Boys:  {} x {}", quote.boys, quote.boys_price);
    println!("  Girls: {} x {}", quote.girls, quote.girls_price);
    match quote.total {
        Some(total) => println!("  Total: {total}"),
        None => println!("  Total: too large to price"),
    }
}

async fn quote(env: ConsoleEnvironment, boys: i32, girls: i32) -> anyhow::Result<()> {
    let console = order_form(env).await?;
    dispatch(&console.order_form, OrderFormAction::SetBoysTickets(boys)).await?;
    dispatch(&console.order_form, OrderFormAction::SetGirlsTickets(girls)).await?;
    print_quote(&console.order_form.state(|s| s.quote()));
    console.shutdown();
    Ok(())
}

fn describe_wave(wave: &Wave) -> String {
    format!(
        "#{} {} ({} to {}): boys {}, girls {}{}",
        wave.id,
        wave.name,
        wave.start_date,
        wave.end_date,
        dollars(wave.boys_price),
        dollars(wave.girls_price),
        if wave.is_active { " [active]" } else { "" }
    )
}

fn availability_line(availability: &WaveAvailability<'_>) -> String {
    match availability {
        WaveAvailability::Loading => "Loading current wave...".to_string(),
        WaveAvailability::Active(wave) => describe_wave(wave),
        WaveAvailability::NoActiveWave => "No wave is currently on sale".to_string(),
        WaveAvailability::Unavailable(error) => format!("Current wave unavailable: {error}"),
    }
}

async fn current_wave(env: ConsoleEnvironment) -> anyhow::Result<()> {
    let console = order_form(env).await?;
    let line = console
        .order_form
        .state(|s| availability_line(&s.availability()));
    println!("{line}");
    console.shutdown();
    Ok(())
}

async fn watch_wave(env: ConsoleEnvironment) -> anyhow::Result<()> {
    let console = Console::start(env, Route::OrderForm).await?;
    let mut actions = console.order_form.subscribe_actions();
    console.order_form.send(OrderFormAction::Mount)?;

    let mut last = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = actions.recv() => {
                match received {
                    Ok(OrderFormAction::WaveLoaded { .. }) => {
                        let line = console
                            .order_form
                            .state(|s| availability_line(&s.availability()));
                        if last.as_ref() != Some(&line) {
                            println!("{line}");
                            last = Some(line);
                        }
                    }
                    Ok(_) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    console.order_form.send(OrderFormAction::Unmount)?;
    console.shutdown();
    Ok(())
}

async fn submit(
    env: ConsoleEnvironment,
    name: String,
    email: String,
    boys: i32,
    girls: i32,
    receipt_path: Option<&Path>,
) -> anyhow::Result<()> {
    let files = match receipt_path {
        Some(path) => {
            let receipt = Receipt::load(path)?;
            tracing::debug!(file = receipt.file_name(), kind = ?receipt.kind, "Receipt attached");
            vec![receipt.file]
        }
        None => Vec::new(),
    };

    let console = order_form(env).await?;
    let store = &console.order_form;
    for action in [
        OrderFormAction::SetName(name),
        OrderFormAction::SetEmail(email),
        OrderFormAction::SetBoysTickets(boys),
        OrderFormAction::SetGirlsTickets(girls),
        OrderFormAction::SelectReceipt(files),
    ] {
        dispatch(store, action).await?;
    }
    print_quote(&store.state(|s| s.quote()));
    dispatch(store, OrderFormAction::Submit).await?;

    let (errors, submission) = store.state(|s| (s.errors.clone(), s.submission.clone()));
    console.shutdown();
    if !errors.is_empty() {
        bail!("{errors}");
    }
    match submission {
        Submission::Succeeded { order_id, message } => {
            match order_id {
                Some(id) => println!("{message} (order #{id})"),
                None => println!("{message}"),
            }
            Ok(())
        }
        Submission::Failed(message) => bail!("{message}"),
        Submission::Idle | Submission::Submitting => bail!("Order was not submitted"),
    }
}

// ============================================================================
// Admin commands
// ============================================================================

async fn admin(env: ConsoleEnvironment, credentials: &Credentials) -> anyhow::Result<Console> {
    let request = credentials.login_request()?;
    let console = Console::start(env, Route::Admin).await?;
    if !console.login(request).await? {
        let message = console.auth.state(|s| match &s.login {
            LoginStatus::Rejected(message) => message.clone(),
            _ => "Login failed".to_string(),
        });
        console.shutdown();
        bail!("{message}");
    }
    Ok(console)
}

async fn dashboard(console: &Console, action: DashboardAction) -> anyhow::Result<()> {
    dispatch(&console.dashboard, action).await
}

fn take_notice(console: &Console) -> Option<Notice> {
    console.dashboard.state(|s| s.notice.clone())
}

async fn load(console: &Console, key: QueryKey) -> anyhow::Result<()> {
    dashboard(console, DashboardAction::Refetch(key)).await?;
    let error = console.dashboard.state(|s| query_error(s, key));
    match error {
        Some(error) => bail!("{error}"),
        None => Ok(()),
    }
}

fn query_error(state: &DashboardState, key: QueryKey) -> Option<String> {
    let error = match key {
        QueryKey::Orders => state.orders.error(),
        QueryKey::Waves => state.waves.error(),
        QueryKey::CurrentWave => state.current_wave.error(),
        QueryKey::Analytics => state.analytics.error(),
        QueryKey::CsvUploads => state.csv_uploads.error(),
    };
    error.map(str::to_string)
}

fn describe_order(order: &Order) -> String {
    format!(
        "#{:<5} {:<9} {} <{}> boys {} girls {} expected {}{}",
        order.id,
        order.status.as_str(),
        order.name,
        order.email,
        order.boys_count,
        order.girls_count,
        dollars(order.expected_amount),
        order
            .wave_name
            .as_deref()
            .map(|w| format!(" ({w})"))
            .unwrap_or_default()
    )
}

async fn orders(console: &Console, command: OrdersCommand) -> anyhow::Result<()> {
    let api = Arc::clone(&console.dashboard.environment().api);
    match command {
        OrdersCommand::List {
            status,
            wave,
            search,
            from,
            to,
            page,
            per_page,
        } => {
            let filters = SearchFilters {
                status,
                wave_id: wave,
                date_from: from,
                date_to: to,
                search,
                page,
                per_page,
            };
            dashboard(console, DashboardAction::SetFilters(filters)).await?;
            if let Some(error) = console.dashboard.state(|s| query_error(s, QueryKey::Orders)) {
                bail!("{error}");
            }
            let (lines, stats, paging) = console.dashboard.state(|s| {
                let lines: Vec<String> = s.cached_orders().iter().map(describe_order).collect();
                let paging = s
                    .orders
                    .data()
                    .map(|p| (p.page, p.total_pages.max(1)))
                    .unwrap_or((1, 1));
                (lines, OrderStats::from_state(s), paging)
            });
            if lines.is_empty() {
                println!("No orders match.");
            }
            for line in lines {
                println!("{line}");
            }
            println!(
                "Page {} of {}: {} pending, {} approved, {} rejected on this page; {} total",
                paging.0, paging.1, stats.pending, stats.approved, stats.rejected, stats.total
            );
        }
        OrdersCommand::Show { id } => {
            let order = api.order(id).await?;
            println!("{}", describe_order(&order));
            println!("  Created:  {}", order.created_at);
            if let Some(amount) = order.ocr_amount {
                println!(
                    "  Receipt:  {} on {} from {}",
                    dollars(amount),
                    order.ocr_date.as_deref().unwrap_or("unknown date"),
                    order.ocr_name.as_deref().unwrap_or("unknown payer")
                );
            }
            if let Some(tx) = &order.matched_transaction {
                println!("  Matched:  {} from {} ({})", dollars(tx.amount), tx.from_user, tx.datetime);
            }
            if let Some(notes) = order.notes.as_deref().filter(|n| !n.is_empty()) {
                println!("  Notes:    {notes}");
            }
        }
        OrdersCommand::Update {
            id,
            name,
            email,
            status,
            notes,
        } => {
            if let Some(email) = email.as_deref().filter(|e| !validation::is_valid_email(e)) {
                bail!("Invalid email address: {email}");
            }
            let update = OrderUpdate {
                name,
                email,
                status,
                notes,
            };
            let response = api
                .update_order(id, update)
                .await?
                .into_result("Failed to update order")?;
            match response.data {
                Some(order) => println!("{}", describe_order(&order)),
                None => println!("{}", response.message.as_deref().unwrap_or("Order updated")),
            }
        }
        OrdersCommand::Delete { id, yes } => {
            if !confirm(&format!("Delete order {id}?"), yes)? {
                println!("Cancelled");
                console.shutdown();
                return Ok(());
            }
            dashboard(console, DashboardAction::RequestDeleteOrder(id)).await?;
            dashboard(console, DashboardAction::ConfirmDelete).await?;
            report(take_notice(console))?;
        }
        OrdersCommand::Approve { id } => {
            dashboard(console, DashboardAction::ApproveOrder(id)).await?;
            report(take_notice(console))?;
        }
        OrdersCommand::Reject { id } => {
            dashboard(console, DashboardAction::RejectOrder(id)).await?;
            report(take_notice(console))?;
        }
        OrdersCommand::Receipt { id } => {
            let order = api.order(id).await?;
            match order.receipt_path.as_deref().filter(|p| !p.is_empty()) {
                Some(path) => println!("{}", api.receipt_url(path)),
                None => bail!("No receipt available for this order."),
            }
        }
        OrdersCommand::Export { out } => {
            let csv = api.export_orders().await?;
            write_output(out.as_deref(), &csv)?;
        }
        OrdersCommand::ExportEmails { comma } => {
            dashboard(console, DashboardAction::ExportVerifiedEmails).await?;
            let export = console.dashboard.state(|s| s.email_export.clone());
            match export {
                Some(export) if comma => println!("{}", export.comma_separated),
                Some(export) => println!("{}", export.newline_separated),
                None => report(take_notice(console))?,
            }
        }
        OrdersCommand::RerunMatching => {
            dashboard(console, DashboardAction::RerunMatching).await?;
            report(take_notice(console))?;
        }
    }
    console.shutdown();
    Ok(())
}

fn write_output(out: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{contents}"),
    }
    Ok(())
}

async fn save_wave(console: &Console, fields: Vec<WaveField>) -> anyhow::Result<()> {
    for field in fields {
        dashboard(console, DashboardAction::EditWaveField(field)).await?;
    }
    dashboard(console, DashboardAction::SaveWave).await?;
    let errors = console
        .dashboard
        .state(|s| s.wave_editor.as_ref().map(|e| e.errors.clone()))
        .filter(|errors| !errors.is_empty());
    if let Some(errors) = errors {
        bail!("{errors}");
    }
    report(take_notice(console))
}

fn wave_fields(
    name: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    boys_price: Option<f64>,
    girls_price: Option<f64>,
) -> Vec<WaveField> {
    // Start before end so an explicit end date is not replaced by the default
    [
        name.map(WaveField::Name),
        start.map(WaveField::StartDate),
        end.map(WaveField::EndDate),
        boys_price.map(WaveField::BoysPrice),
        girls_price.map(WaveField::GirlsPrice),
    ]
    .into_iter()
    .flatten()
    .collect()
}

async fn set_active(console: &Console, id: i64, active: bool) -> anyhow::Result<()> {
    load(console, QueryKey::Waves).await?;
    let current = console
        .dashboard
        .state(|s| s.cached_waves().iter().find(|w| w.id == id).map(|w| w.is_active));
    match current {
        None => bail!("Wave {id} not found"),
        Some(is_active) if is_active == active => {
            println!(
                "Wave {id} is already {}",
                if active { "active" } else { "inactive" }
            );
            return Ok(());
        }
        Some(_) => {}
    }

    dashboard(console, DashboardAction::ToggleWave(id)).await?;
    report(take_notice(console))
}

async fn waves(console: &Console, command: WavesCommand) -> anyhow::Result<()> {
    match command {
        WavesCommand::List => {
            load(console, QueryKey::Waves).await?;
            let lines: Vec<String> = console
                .dashboard
                .state(|s| s.cached_waves().iter().map(describe_wave).collect());
            if lines.is_empty() {
                println!("No waves configured.");
            }
            for line in lines {
                println!("{line}");
            }
        }
        WavesCommand::Create {
            name,
            start,
            end,
            boys_price,
            girls_price,
            active,
        } => {
            dashboard(console, DashboardAction::NewWave).await?;
            let mut fields = wave_fields(Some(name), start, end, boys_price, girls_price);
            fields.push(WaveField::Active(active));
            save_wave(console, fields).await?;
        }
        WavesCommand::Update {
            id,
            name,
            start,
            end,
            boys_price,
            girls_price,
        } => {
            load(console, QueryKey::Waves).await?;
            dashboard(console, DashboardAction::EditWave(id)).await?;
            if console.dashboard.state(|s| s.wave_editor.is_none()) {
                bail!("Wave {id} not found");
            }
            save_wave(console, wave_fields(name, start, end, boys_price, girls_price)).await?;
        }
        WavesCommand::Delete { id, yes } => {
            if !confirm(&format!("Delete wave {id}?"), yes)? {
                println!("Cancelled");
                console.shutdown();
                return Ok(());
            }
            dashboard(console, DashboardAction::RequestDeleteWave(id)).await?;
            dashboard(console, DashboardAction::ConfirmDelete).await?;
            report(take_notice(console))?;
        }
        WavesCommand::Activate { id } => set_active(console, id, true).await?,
        WavesCommand::Deactivate { id } => set_active(console, id, false).await?,
    }
    console.shutdown();
    Ok(())
}

async fn csv(console: &Console, command: CsvCommand) -> anyhow::Result<()> {
    match command {
        CsvCommand::Upload { path } => {
            let file = receipt::read_upload(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            dashboard(console, DashboardAction::SelectCsvFile(vec![file])).await?;
            if console.dashboard.state(|s| s.csv_file.is_none()) {
                report(take_notice(console))?;
                bail!("{} was not accepted", path.display());
            }
            dashboard(console, DashboardAction::UploadCsv).await?;
            report(take_notice(console))?;
        }
        CsvCommand::History => {
            load(console, QueryKey::CsvUploads).await?;
            let uploads = console
                .dashboard
                .state(|s| s.csv_uploads.data().cloned().unwrap_or_default());
            if uploads.is_empty() {
                println!("No uploads yet.");
            }
            for upload in uploads {
                println!(
                    "#{:<4} {} {:?} {:?}: {} processed, {} new, {} updated by {} on {}{}",
                    upload.id,
                    upload.original_filename,
                    upload.upload_type,
                    upload.status,
                    upload.records_processed,
                    upload.new_records,
                    upload.updated_records,
                    upload.admin_user,
                    upload.upload_date,
                    if upload.needs_attention() { "  <- check" } else { "" }
                );
            }
        }
    }
    console.shutdown();
    Ok(())
}

async fn transactions(console: &Console, kind: TransactionKind, export: bool) -> anyhow::Result<()> {
    let api = Arc::clone(&console.dashboard.environment().api);
    if export {
        print!("{}", api.export_transactions(kind).await?);
        console.shutdown();
        return Ok(());
    }

    match kind {
        TransactionKind::Venmo => {
            for tx in api.venmo_transactions().await? {
                println!(
                    "#{:<5} {} {} -> {} {} (net {}) {}",
                    tx.id,
                    tx.datetime,
                    tx.from_user,
                    tx.to_user,
                    dollars(tx.amount),
                    dollars(tx.net_amount),
                    tx.note
                );
            }
        }
        TransactionKind::Zelle => {
            for tx in api.zelle_transactions().await? {
                println!(
                    "#{:<5} {} {} {} {}",
                    tx.id,
                    tx.date,
                    tx.payer_identifier,
                    dollars(tx.amount),
                    tx.description
                );
            }
        }
    }
    console.shutdown();
    Ok(())
}

async fn analytics(console: &Console) -> anyhow::Result<()> {
    load(console, QueryKey::Analytics).await?;
    let Some(analytics) = console.dashboard.state(|s| s.analytics.data().cloned()) else {
        bail!("Analytics unavailable");
    };
    println!("Orders:   {} total", analytics.total_orders);
    println!(
        "          {} pending, {} approved, {} rejected",
        analytics.pending_orders, analytics.approved_orders, analytics.rejected_orders
    );
    println!("Revenue:  {}", dollars(analytics.total_revenue));
    println!(
        "Imported: {} Venmo, {} Zelle transactions",
        analytics.venmo_transactions, analytics.zelle_transactions
    );
    if !analytics.orders_by_wave.is_empty() {
        println!("By wave:");
        for (wave, count) in &analytics.orders_by_wave {
            println!("  {wave}: {count}");
        }
    }
    if !analytics.orders_by_status.is_empty() {
        println!("By status:");
        for (status, count) in &analytics.orders_by_status {
            println!("  {status}: {count}");
        }
    }
    console.shutdown();
    Ok(())
}

async fn change_password(
    console: &Console,
    credentials: &Credentials,
    new_password: String,
    confirm_password: String,
) -> anyhow::Result<()> {
    let form = PasswordForm {
        old_password: credentials.password.clone().unwrap_or_default(),
        new_password,
        confirm_password,
    };
    dispatch(&console.auth, AuthAction::ChangePassword(form)).await?;
    let status = console.auth.state(|s| s.password_change.clone());
    console.shutdown();
    match status {
        PasswordChangeStatus::Changed(message) => {
            println!("{message}");
            Ok(())
        }
        PasswordChangeStatus::Invalid(errors) => bail!("{errors}"),
        PasswordChangeStatus::Failed(message) => bail!("{message}"),
        PasswordChangeStatus::Idle | PasswordChangeStatus::Pending => {
            bail!("Password was not changed")
        }
    }
}
