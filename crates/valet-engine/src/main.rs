//! Valet CLI
//!
//! Runs discount submissions and session discovery from the command line,
//! using discount-type records stored as JSON files.
//!
//! Usage:
//!   valet submit --discount vip.json --plate 粤B12345 --note "vip=1"
//!   valet render --discount vip.json --plate 粤B12345
//!   valet resolve https://park.example/scan?code=9
//!   valet reconfigure --discount vip.json

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use valet_engine::config::EngineConfig;
use valet_engine::logging::init_tracing;
use valet_engine::{DiscountTypeConfig, SessionResolver, Submission, SubmissionEngine};

/// Valet - parking-discount request engine
#[derive(Parser, Debug)]
#[command(name = "valet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (YAML)
    #[arg(short, long, global = true, env = "VALET_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one submission and print the result
    Submit(SubmitArgs),
    /// Print the request a submission would send, without sending it
    Render(SubmitArgs),
    /// Discover the session behind a scan URL
    Resolve {
        /// Scan URL (the address behind the QR code)
        scan_url: String,
    },
    /// Refresh a discount type's session from its scan URL
    Reconfigure {
        /// Discount-type record (JSON)
        #[arg(short, long)]
        discount: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Discount-type record (JSON)
    #[arg(short, long)]
    discount: PathBuf,

    /// Plate number
    #[arg(short, long)]
    plate: String,

    /// Discount type code (defaults to the record's code)
    #[arg(long)]
    code: Option<String>,

    /// Guest note; may carry variables and #header{}/#body{} directives
    #[arg(short, long)]
    note: Option<String>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    /// Extra template variable, repeatable
    #[arg(short, long = "extra", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    extras: Vec<(String, String)>,
}

impl SubmitArgs {
    fn submission(&self, record: &DiscountTypeConfig) -> Submission {
        let code = self
            .code
            .clone()
            .or_else(|| record.code.clone())
            .unwrap_or_default();
        let mut submission = Submission::new(self.plate.as_str(), code);
        submission.note = self.note.clone();
        submission.name = self.name.clone();
        submission.phone = self.phone.clone();
        for (key, value) in &self.extras {
            submission
                .extra
                .insert(key.clone(), Value::String(value.clone()));
        }
        submission
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn load_discount(path: &Path) -> anyhow::Result<DiscountTypeConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading discount record {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing discount record {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    init_tracing(&config.logging.level, cli.log_json || config.logging.json);

    match cli.command {
        Command::Submit(args) => {
            let record = load_discount(&args.discount)?;
            let engine = SubmissionEngine::new(&config)?;
            let result = engine.submit(&record, &args.submission(&record)).await;
            print_json(&result)?;
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Render(args) => {
            let record = load_discount(&args.discount)?;
            let engine = SubmissionEngine::new(&config)?;
            let planned = engine.prepare(&record, &args.submission(&record))?;
            print_json(&planned.request)?;
        }
        Command::Resolve { scan_url } => {
            let resolver = SessionResolver::from_config(&config.http)?;
            match resolver.resolve(&scan_url).await {
                Some(session) => print_json(&session)?,
                None => bail!("Could not extract a session from {scan_url}, check the URL"),
            }
        }
        Command::Reconfigure { discount } => {
            let mut record = load_discount(&discount)?;
            let resolver = SessionResolver::from_config(&config.http)?;
            let update = resolver.reconfigure(&record).await?;
            update.apply_to(&mut record);
            print_json(&record)?;
        }
    }

    Ok(())
}
