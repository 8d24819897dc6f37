//! Webguard command line front end.
//!
//! - `webguard check` - evaluate one request against the configured rules
//! - `webguard rules` - print the configured rule table

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use access_decision::{AccessDecision, AccessDecisionConfig, TracingEventSink};
use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use webguard_security::Authentication;

#[derive(Parser)]
#[command(name = "webguard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file; `WEBGUARD_*` variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether a principal may access a URI.
    ///
    /// Prints `allowed` or `denied`; exits with status 1 on denial.
    Check(CheckArgs),

    /// Print the configured rules in evaluation order.
    Rules,
}

#[derive(Args)]
struct CheckArgs {
    /// Application-relative URI, query string allowed.
    #[arg(long)]
    uri: String,

    #[arg(long, default_value = "GET")]
    method: String,

    #[arg(long)]
    context_path: Option<String>,

    /// Principal to evaluate; anonymous when omitted.
    #[arg(long)]
    principal: Option<String>,

    /// Granted authority (repeatable).
    #[arg(long = "authority")]
    authorities: Vec<String>,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn check(module: &AccessDecision, args: CheckArgs) -> anyhow::Result<ExitCode> {
    let authentication = match args.principal {
        Some(principal) => Authentication::builder(principal)
            .authorities(args.authorities)
            .authenticated()
            .build(),
        None => Authentication::anonymous(),
    };

    let allowed = module
        .evaluator()
        .is_allowed_uri(
            args.context_path.as_deref(),
            &args.uri,
            Some(args.method.as_str()),
            Some(&authentication),
        )
        .with_context(|| format!("evaluating {} {}", args.method, args.uri))?;

    if allowed {
        println!("allowed");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("denied");
        Ok(ExitCode::FAILURE)
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let cfg = AccessDecisionConfig::load(cli.config.as_deref())?;
    debug!(config = ?cli.config, rules = cfg.rules.len(), "Loaded configuration");

    match cli.command {
        Commands::Check(args) => {
            let module = AccessDecision::init(&cfg, Arc::new(TracingEventSink), None)?;
            check(&module, args)
        }
        Commands::Rules => {
            println!("{}", serde_json::to_string_pretty(&cfg.rules)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
