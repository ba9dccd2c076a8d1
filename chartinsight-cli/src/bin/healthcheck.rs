//! Narrative healthcheck.
//!
//! Without flags, verifies offline that the rule path and the delegating
//! path (against a canned reply) produce valid narratives. With `--live`,
//! also sends one real request to the configured provider; this requires
//! `LLM_API_KEY` (or `LLM_API_KEY_FILE`).

use anyhow::{bail, Result};
use chartinsight_runner::healthcheck::{run_live, run_offline, CheckOutcome};
use chartinsight_runner::telemetry::{init_tracing, LogFormat};
use chartinsight_runner::LlmConfig;
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "chartinsight-healthcheck",
    about = "Verify narrative generation paths"
)]
struct Cli {
    /// Also round-trip a real provider call.
    #[arg(long, default_value_t = false)]
    live: bool,

    /// Maximum alerts per narrative.
    #[arg(long, default_value_t = 5)]
    max_alerts: usize,

    /// Print results as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("warn", LogFormat::Pretty)?;

    let mut outcomes = run_offline(cli.max_alerts).await;

    if cli.live {
        let llm = LlmConfig::from_env()?;
        if !llm.has_credentials() {
            bail!("--live requires LLM_API_KEY or LLM_API_KEY_FILE");
        }
        outcomes.push(run_live(&llm, cli.max_alerts).await);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for CheckOutcome {
            name,
            passed,
            detail,
        } in &outcomes
        {
            let status = if *passed { "ok" } else { "FAIL" };
            println!("[{status:>4}] {name}: {detail}");
        }
    }

    let failed = outcomes.iter().filter(|o| !o.passed).count();
    if failed > 0 {
        bail!("{failed} healthcheck(s) failed");
    }
    Ok(())
}
