use std::env;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use wayfinder_config::WayfinderConfig;
use wayfinder_runtime::{init_tracing, Pipeline, PipelineReport, RunOptions};
use wayfinder_synthesis::Language;

#[derive(Debug, Parser)]
#[command(name = "wayfinder", about = "Wayfinder trip planning CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Plan a trip from a free-text query
    Plan(PlanArgs),
    /// Run a query with environment-driven defaults, emitting JSON
    Demo(DemoArgs),
}

#[derive(Debug, Args, Clone)]
struct PlanArgs {
    /// Config file (YAML); built-in defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// IANA timezone the request is anchored in
    #[arg(long, env = "WAYFINDER_TIMEZONE", default_value = "UTC")]
    timezone: String,
    /// Force the itinerary output language
    #[arg(long, value_enum)]
    output_language: Option<LanguageArg>,
    /// Fixed reference instant (RFC 3339) for reproducible runs
    #[arg(long, env = "WAYFINDER_NOW_TS")]
    now_ts: Option<DateTime<Utc>>,
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
    #[arg(long)]
    verbose: bool,
    #[arg(value_name = "QUERY", required = true)]
    query: Vec<String>,
}

#[derive(Debug, Args, Clone)]
struct DemoArgs {
    #[arg(long)]
    verbose: bool,
    #[arg(value_name = "QUERY", required = true)]
    query: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LanguageArg {
    En,
    It,
}

impl From<LanguageArg> for Language {
    fn from(value: LanguageArg) -> Self {
        match value {
            LanguageArg::En => Language::En,
            LanguageArg::It => Language::It,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Plan(args) => plan(args).await,
            Command::Demo(args) => demo(args).await,
        }
    }
}

async fn plan(args: PlanArgs) -> anyhow::Result<()> {
    init_tracing(if args.verbose { "debug" } else { "info" });

    let pipeline = match &args.config {
        Some(path) => Pipeline::from_config_path(path)?,
        None => Pipeline::new(WayfinderConfig::default())?,
    };
    let options = RunOptions {
        now_ts: args.now_ts,
        timezone: args.timezone.clone(),
        output_language: args.output_language.map(Into::into),
    };
    let report = pipeline.run(&args.query.join(" "), &options).await?;
    emit(&report, args.format)
}

/// Same pipeline as `plan`, parameterized entirely through the
/// environment so scripted demos stay one-liners.
async fn demo(args: DemoArgs) -> anyhow::Result<()> {
    init_tracing(if args.verbose { "debug" } else { "info" });

    let now_ts = match env::var("WAYFINDER_NOW_TS") {
        Ok(raw) => Some(
            raw.parse::<DateTime<Utc>>()
                .context("WAYFINDER_NOW_TS must be an RFC 3339 timestamp")?,
        ),
        Err(_) => None,
    };
    let options = RunOptions {
        now_ts,
        timezone: env::var("WAYFINDER_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
        output_language: env::var("WAYFINDER_OUTPUT_LANGUAGE")
            .ok()
            .as_deref()
            .and_then(forced_language),
    };

    let pipeline = Pipeline::new(WayfinderConfig::default())?;
    let query = args.query.join(" ");
    let report = pipeline.run(&query, &options).await?;

    let mut value = serde_json::to_value(&report)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("query".to_string(), serde_json::Value::String(query));
    }
    println!("{value}");
    Ok(())
}

fn emit(report: &PipelineReport, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(report)?),
        Format::Text => match report {
            PipelineReport::Completed { itinerary_text, .. } => {
                println!("{}", itinerary_text.trim());
            }
            PipelineReport::ClarificationNeeded {
                clarifying_question,
                ..
            } => {
                println!("{}", clarifying_question.trim());
            }
        },
    }
    Ok(())
}

/// Only exact supported tags force the language; anything else falls
/// back to query detection.
fn forced_language(tag: &str) -> Option<Language> {
    match tag {
        "en" => Some(Language::En),
        "it" => Some(Language::It),
        _ => None,
    }
}
