//! Tessera — audit ledger CLI
//!
//! Runs the booking reference scenarios, or appends to, browses, and
//! verifies a file-backed ledger.
//!
//! Usage:
//!   cargo run -p tessera -- scenario all
//!   cargo run -p tessera -- log --store ledger.jsonl --tenant T1 --actor-id usr-1 --action User.login
//!   cargo run -p tessera -- list --store ledger.jsonl --tenant T1 --limit 20
//!   cargo run -p tessera -- verify --store ledger.jsonl --tenant T1

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tessera_config::LedgerConfig;
use tessera_contracts::{
    action::ActionDescriptor,
    entry::{Actor, ActorType, TenantId},
    error::{LedgerError, LedgerResult},
    query::{AuditQuery, Pagination, TimeRange},
};
use tessera_core::AuditLedger;
use tessera_ref_booking::{
    runtime::file_ledger,
    scenarios::{append_only, concurrent_writers, employee_lifecycle},
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Tessera — tamper-evident, append-only audit ledger.
#[derive(Parser)]
#[command(
    name = "tessera",
    about = "Tamper-evident, per-tenant hash-chained audit ledger",
    long_about = "Appends audit entries to a per-tenant SHA-2 hash chain, lists them,\n\
                  and verifies chain integrity.  Set RUST_LOG=debug for verbose output."
)]
struct Cli {
    /// Ledger configuration file (TOML).  Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a booking reference scenario against an in-memory ledger.
    Scenario {
        #[arg(value_enum)]
        name: ScenarioName,
    },
    /// Append one audit entry.
    Log(LogArgs),
    /// List a tenant's entries, oldest first.
    List(ListArgs),
    /// Verify a tenant's hash chain.  Exits with status 2 on a break.
    Verify(VerifyArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioName {
    EmployeeLifecycle,
    AppendOnly,
    ConcurrentWriters,
    All,
}

#[derive(Args)]
struct StoreArgs {
    /// Ledger file (JSON Lines).  Overrides `[storage] path`.
    #[arg(long)]
    store: Option<PathBuf>,

    #[arg(long)]
    tenant: String,
}

#[derive(Args)]
struct LogArgs {
    #[command(flatten)]
    target: StoreArgs,

    #[arg(long)]
    actor_id: String,

    /// user, service_account, system, or any other label.
    #[arg(long, default_value = "user")]
    actor_type: String,

    /// Display name; defaults to the actor id.
    #[arg(long)]
    actor_name: Option<String>,

    #[arg(long)]
    actor_email: Option<String>,

    /// `<Entity>.<verb>`, e.g. `Employee.update` or `User.login`.
    #[arg(long)]
    action: String,

    #[arg(long)]
    entity: Option<String>,

    #[arg(long)]
    entity_id: Option<String>,

    /// Prior state as JSON.
    #[arg(long)]
    before: Option<String>,

    /// New state as JSON.
    #[arg(long)]
    after: Option<String>,

    /// Free-form context as JSON.
    #[arg(long)]
    metadata: Option<String>,
}

#[derive(Args)]
struct ListArgs {
    #[command(flatten)]
    target: StoreArgs,

    #[arg(long)]
    entity: Option<String>,

    #[arg(long)]
    entity_id: Option<String>,

    #[arg(long)]
    action: Option<String>,

    #[arg(long)]
    actor_id: Option<String>,

    /// Earliest `created_at` to include (RFC 3339).
    #[arg(long)]
    since: Option<DateTime<Utc>>,

    /// Exclude entries at or after this instant (RFC 3339).
    #[arg(long)]
    until: Option<DateTime<Utc>>,

    #[arg(long, default_value_t = 0)]
    offset: usize,

    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct VerifyArgs {
    #[command(flatten)]
    target: StoreArgs,

    #[arg(long, default_value_t = 1)]
    from_seq: u64,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("tessera: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Exit status on success: 0, or 2 when verification found a break.
fn run(cli: Cli) -> LedgerResult<u8> {
    let config = match &cli.config {
        Some(path) => LedgerConfig::from_file(path)?,
        None => LedgerConfig::default(),
    };

    match cli.command {
        Command::Scenario { name } => run_scenarios(name, &config).map(|()| 0),
        Command::Log(args) => log(args, config).map(|()| 0),
        Command::List(args) => list(args, config).map(|()| 0),
        Command::Verify(args) => verify(args, config),
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_scenarios(name: ScenarioName, config: &LedgerConfig) -> LedgerResult<()> {
    let all = matches!(name, ScenarioName::All);
    if all || matches!(name, ScenarioName::EmployeeLifecycle) {
        employee_lifecycle::run_scenario(config)?;
    }
    if all || matches!(name, ScenarioName::AppendOnly) {
        append_only::run_scenario(config)?;
    }
    if all || matches!(name, ScenarioName::ConcurrentWriters) {
        concurrent_writers::run_scenario(config, concurrent_writers::DEFAULT_WRITERS)?;
    }
    println!("All selected scenarios completed.");
    Ok(())
}

// ── Ledger commands ───────────────────────────────────────────────────────────

fn open_ledger(target: &StoreArgs, mut config: LedgerConfig) -> LedgerResult<(TenantId, AuditLedger)> {
    if let Some(store) = &target.store {
        config.storage.path = Some(store.clone());
    }
    debug!(path = ?config.storage.path, tenant_id = %target.tenant, "opening ledger");
    let (_, ledger) = file_ledger(&config)?;
    Ok((TenantId::new(target.tenant.as_str()), ledger))
}

fn parse_json(flag: &str, raw: Option<&str>) -> LedgerResult<Option<Value>> {
    raw.map(|s| {
        serde_json::from_str(s)
            .map_err(|e| LedgerError::validation(format!("--{} is not valid JSON: {}", flag, e)))
    })
    .transpose()
}

fn log(args: LogArgs, config: LedgerConfig) -> LedgerResult<()> {
    let (tenant_id, ledger) = open_ledger(&args.target, config)?;

    let mut actor = Actor {
        name: args.actor_name.unwrap_or_else(|| args.actor_id.clone()),
        id: args.actor_id,
        actor_type: ActorType::from(args.actor_type),
        email: None,
    };
    if let Some(email) = args.actor_email {
        actor = actor.with_email(email);
    }

    let mut descriptor = ActionDescriptor::new(tenant_id, actor, args.action);
    descriptor.entity = args.entity;
    descriptor.entity_id = args.entity_id;
    descriptor.before = parse_json("before", args.before.as_deref())?;
    descriptor.after = parse_json("after", args.after.as_deref())?;
    descriptor.metadata = parse_json("metadata", args.metadata.as_deref())?;

    let entry = ledger.record(descriptor)?;
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

fn list(args: ListArgs, config: LedgerConfig) -> LedgerResult<()> {
    let (tenant_id, ledger) = open_ledger(&args.target, config)?;

    let mut query = AuditQuery::for_tenant(tenant_id);
    query.entity = args.entity;
    query.entity_id = args.entity_id;
    query.action = args.action;
    query.actor_id = args.actor_id;
    if args.since.is_some() || args.until.is_some() {
        query.time_range = Some(TimeRange {
            from: args.since,
            to: args.until,
        });
    }
    let pagination = Pagination {
        offset: args.offset,
        limit: args.limit,
    };

    let page = ledger.list(&query, pagination)?;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

fn verify(args: VerifyArgs, config: LedgerConfig) -> LedgerResult<u8> {
    let (tenant_id, ledger) = open_ledger(&args.target, config)?;

    let report = ledger.verify(&tenant_id, args.from_seq)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    match &report.chain_break {
        None => Ok(0),
        Some(b) => {
            eprintln!("tessera: chain broken for tenant '{}': {}", tenant_id, b.describe());
            Ok(2)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
