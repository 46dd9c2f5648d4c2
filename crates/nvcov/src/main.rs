// SPDX-License-Identifier: AGPL-3.0

//! nvcov - code coverage for NeoVM smart contracts
//!
//! Runs one coverage session over an already populated coverage directory
//! and writes the requested reports.

use anyhow::{Context, Result};
use clap::Parser;
use colored::{ColoredString, Colorize};
use nvcov_config::Config;
use nvcov_correlate::Rate;
use nvcov_report::DirectorySink;
use nvcov_session::{ContractRegistration, CoverageSession, SessionOptions};
use std::fs;
use std::time::Instant;

mod report;

use report::MainResult;

fn main() -> Result<()> {
    let result = _main()?;
    std::process::exit(result.exitcode)
}

fn _main() -> Result<MainResult> {
    let start_time = Instant::now();

    let cli = Config::parse();
    let mut config = match cli.resolve_config_path() {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };
    config.merge(cli);

    nvcov_logs::init(config.verbose);

    let sources = registrations(&config)?;
    let options = SessionOptions::new(config.coverage_path(), &config.formats()?)?
        .with_source_roots(config.source_roots.clone());

    let mut session = CoverageSession::new(options);
    let registered = session.on_session_start(&sources)?;
    println!(
        "{} {} of {} contracts from {}",
        "Collecting".green(),
        registered,
        sources.len(),
        config.coverage_path().display()
    );

    let report = session.on_session_end()?;

    let mut sink = DirectorySink::new(config.output_path());
    for artifact in &report.artifacts {
        sink.store(artifact)
            .with_context(|| format!("Failed to write {}", artifact.name))?;
    }

    let artifacts = sink
        .written()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let result = MainResult::new(&report.trees, &report.stats, artifacts, start_time.elapsed());

    print_summary(&result);

    if let Some(json_path) = &config.json_output {
        let json_str = serde_json::to_string_pretty(&result)?;
        fs::write(json_path, json_str)?;
        println!("JSON output written to: {}", json_path.display());
    }

    Ok(result)
}

/// Contracts from the config file and command line
fn registrations(config: &Config) -> Result<Vec<ContractRegistration>> {
    config
        .contract_sources()?
        .into_iter()
        .map(|source| {
            Ok(ContractRegistration {
                identity: source.identity()?,
                name: source.name,
                debug_info: source.debug_info,
            })
        })
        .collect()
}

fn colored_percent(covered: u64, total: u64) -> ColoredString {
    let rate = Rate::new(covered, total);
    let text = format!("{}%", rate.percent());
    let bp = rate.basis_points();
    if bp >= 8_000 {
        text.green()
    } else if bp >= 5_000 {
        text.yellow()
    } else {
        text.red()
    }
}

fn print_summary(result: &MainResult) {
    for contract in &result.contracts {
        println!(
            "  {} {} lines {} ({}/{}), branches {} ({}/{})",
            contract.name.bold(),
            contract.hash.dimmed(),
            colored_percent(contract.lines_covered, contract.lines_valid),
            contract.lines_covered,
            contract.lines_valid,
            colored_percent(contract.branches_covered, contract.branches_valid),
            contract.branches_covered,
            contract.branches_valid,
        );
    }

    let rejected = if result.has_rejections() {
        result.rejected_files.to_string().red()
    } else {
        result.rejected_files.to_string().green()
    };

    println!(
        "\n{} {} contracts, {} trace files ({} rejected), {} artifacts ({}ms)",
        "Summary:".yellow().bold(),
        result.contracts.len(),
        result.trace_files,
        rejected,
        result.artifacts.len(),
        result.duration.as_millis()
    );
}
