use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;

use pg_plan_viz::config::Config;
use pg_plan_viz::services::plan_analyzer::{AnalysisOptions, MetricKind, analyze_plan_text};
use pg_plan_viz::utils::{PlanErrorResponse, init_logging};

/// Analyze a PostgreSQL `EXPLAIN (FORMAT JSON)` plan and print the enriched tree
#[derive(Parser)]
#[command(name = "pg-plan-viz", version, about)]
struct Cli {
    /// File holding the EXPLAIN output ("-" reads stdin)
    #[arg(value_name = "PLAN")]
    plan: PathBuf,

    /// Critical path metric; defaults to analysis.default_metric from the config
    #[arg(long, value_parser = parse_metric)]
    metric: Option<MetricKind>,

    /// Include CTE definitions and references in the output
    #[arg(long)]
    ctes: bool,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,
}

fn parse_metric(value: &str) -> Result<MetricKind, String> {
    match value.parse::<MetricKind>() {
        Ok(MetricKind::Custom) => {
            Err("custom metrics are only available through the library".to_string())
        },
        Ok(kind) => Ok(kind),
        Err(e) => Err(e.to_string()),
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            return ExitCode::FAILURE;
        },
    };

    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        },
    };

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        },
    }
}

fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let text = if cli.plan.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        fs::read_to_string(&cli.plan)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", cli.plan.display(), e))?
    };

    let mut options = AnalysisOptions::from_config(&config.analysis)?;
    if let Some(metric) = cli.metric {
        options = options.with_metric(metric);
    }
    tracing::debug!("Analyzing {} by {}", cli.plan.display(), options.metric);

    let output = match analyze_plan_text(&text, &options) {
        Ok(result) if cli.ctes => {
            let ctes = serde_json::to_value(result.cte_metadata())?;
            let mut value = serde_json::to_value(&result)?;
            value["cteMetadata"] = ctes;
            value
        },
        Ok(result) => serde_json::to_value(&result)?,
        Err(e) => {
            let body = PlanErrorResponse::from(&e);
            println!("{}", json!({ "error": body }));
            anyhow::bail!(e);
        },
    };

    let rendered = if cli.compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{}", rendered);

    Ok(())
}
