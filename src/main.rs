// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use std::env;
use std::time::Instant;
use the_rulebook::config::RuntimeBuilder;
use the_rulebook::engine::{Engine, OptionValues};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: the-rulebook <config-file> <rule|ruleset> <id> <inputs-json>
       the-rulebook --nodes
Example: the-rulebook configs/fraud-rules.yaml ruleset payment_alerts '{\"amount\": 5000, \"currency\": \"USD\"}'";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("--nodes") {
        let engine = RuntimeBuilder::new().build()?;
        let nodes = engine.export_serialized_nodes(&OptionValues::new());
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    let [config_file, target, id, inputs] = args.as_slice() else {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    };

    let inputs: serde_json::Value =
        serde_json::from_str(inputs).context("inputs must be a JSON document")?;

    let start_time = Instant::now();
    let engine = RuntimeBuilder::new()
        .from_config_file(config_file)
        .await
        .with_context(|| format!("failed to install {}", config_file))?;

    eprintln!("📋 Configuration: {} (revision {})", config_file, engine.active_config().revision);
    eprintln!(
        "🔢 Rules: {}, rule sets: {}",
        engine.catalog().rules().len(),
        engine.catalog().rule_sets().len()
    );

    let output = run(&engine, target, id, &inputs).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    eprintln!("\n⏱️  Total Time (including config load): {:?}", start_time.elapsed());
    Ok(())
}

async fn run(
    engine: &Engine,
    target: &str,
    id: &str,
    inputs: &serde_json::Value,
) -> Result<serde_json::Value> {
    match target {
        "rule" => {
            let result = engine.execute_rule(id, inputs).await?;
            eprintln!(
                "🎯 Rule '{}' {} in {:.3} ms",
                id,
                if result.outputs.triggered() { "triggered" } else { "did not trigger" },
                result.execution_time_ms
            );
            Ok(serde_json::to_value(&result)?)
        }
        "ruleset" => {
            let result = engine.execute_rule_set(id, inputs).await?;
            eprintln!(
                "🛡️  Rule set '{}' severity {} in {:.3} ms",
                id, result.outputs.severity, result.execution_time_ms
            );
            Ok(serde_json::to_value(&result)?)
        }
        other => bail!("unknown target '{}', expected 'rule' or 'ruleset'", other),
    }
}
