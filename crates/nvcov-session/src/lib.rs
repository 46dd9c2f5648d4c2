// SPDX-License-Identifier: AGPL-3.0

//! Coverage session lifecycle
//!
//! A session moves `Idle -> Collecting -> Finished`. The host calls
//! [`CoverageSession::on_session_start`] with the contracts to track before
//! tests run, and [`CoverageSession::on_session_end`] once every execution
//! host has written its trace files. Problems with single inputs are logged
//! and skipped so one bad file never costs the whole report.

use anyhow::{anyhow, Context, Result};
use nvcov_collector::{read_trace_file, CoverageCollector, TRACE_EXTENSION};
use nvcov_contract::{load_script_bytes, ContractIdentity, Script};
use nvcov_correlate::{build_tree, ContractCoverageTree};
use nvcov_debuginfo::load_debug_info;
use nvcov_exceptions::CoverageError;
use nvcov_logs::{warn_code, ErrorCode};
use nvcov_report::{format_by_name, Artifact, MemorySink, ReportContext, ReportFormat};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of script dumps named `<0xhash>.nef`
pub const SCRIPT_EXTENSION: &str = "nef";

/// A contract to track and where its debug info lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRegistration {
    pub name: String,
    pub debug_info: PathBuf,
    /// Expected identity, checked against the debug info
    pub identity: Option<ContractIdentity>,
}

pub struct SessionOptions {
    pub coverage_dir: PathBuf,
    pub formats: Vec<Box<dyn ReportFormat>>,
    pub source_roots: Vec<String>,
}

impl SessionOptions {
    /// Options with formats looked up by name
    pub fn new(coverage_dir: impl Into<PathBuf>, formats: &[String]) -> Result<Self> {
        let formats = formats
            .iter()
            .map(|name| format_by_name(name).ok_or_else(|| anyhow!("Unknown report format: {}", name)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            coverage_dir: coverage_dir.into(),
            formats,
            source_roots: Vec::new(),
        })
    }

    pub fn with_source_roots(mut self, source_roots: Vec<String>) -> Self {
        self.source_roots = source_roots;
        self
    }
}

/// What the consolidation step read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub contracts: usize,
    pub scripts: usize,
    pub trace_files: usize,
    pub rejected_files: usize,
    pub hits: usize,
    pub branches: usize,
    pub ignored_records: usize,
}

/// Result of a finished session
#[derive(Debug)]
pub struct SessionReport {
    pub artifacts: Vec<Artifact>,
    pub trees: Vec<ContractCoverageTree>,
    pub stats: SessionStats,
}

enum State {
    Idle,
    Collecting {
        collector: CoverageCollector,
        timestamp: u64,
    },
    Finished,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Collecting { .. } => "collecting",
            State::Finished => "finished",
        }
    }
}

pub struct CoverageSession {
    options: SessionOptions,
    state: State,
}

impl CoverageSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            state: State::Idle,
        }
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// Load debug info for every source and start collecting.
    ///
    /// Returns the number of contracts registered.
    pub fn on_session_start(&mut self, sources: &[ContractRegistration]) -> Result<usize> {
        if !matches!(self.state, State::Idle) {
            return Err(anyhow!(
                "Session cannot start while {}",
                self.state.name()
            ));
        }

        let mut collector = CoverageCollector::new();
        for source in sources {
            let symbols = match load_debug_info(&source.debug_info) {
                Ok(symbols) => symbols,
                Err(e) => {
                    warn_code(
                        ErrorCode::ParsingError,
                        &format!("Skipping contract {}: {:#}", source.name, e),
                    );
                    continue;
                }
            };

            match collector.add_contract(&source.name, symbols, source.identity) {
                Ok(identity) => {
                    tracing::info!(contract = %identity, name = %source.name, "Tracking contract")
                }
                Err(e @ CoverageError::IdentityMismatch { .. }) => warn_code(
                    ErrorCode::IdentityMismatch,
                    &format!("Skipping contract {}: {}", source.name, e),
                ),
                Err(e) => warn_code(
                    ErrorCode::InternalError,
                    &format!("Skipping contract {}: {}", source.name, e),
                ),
            }
        }

        let registered = collector.len();
        self.state = State::Collecting {
            collector,
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        };
        Ok(registered)
    }

    /// Read every script dump and trace, build the coverage trees and render
    /// every configured format.
    ///
    /// When the coverage directory cannot be listed the session stays in
    /// `collecting` and the call can be retried.
    pub fn on_session_end(&mut self) -> Result<SessionReport> {
        if !matches!(self.state, State::Collecting { .. }) {
            return Err(anyhow!("Session cannot end while {}", self.state.name()));
        }

        let files = list_files(&self.options.coverage_dir)?;

        let (mut collector, timestamp) = match std::mem::replace(&mut self.state, State::Finished)
        {
            State::Collecting {
                collector,
                timestamp,
            } => (collector, timestamp),
            other => {
                let name = other.name();
                self.state = other;
                return Err(anyhow!("Session cannot end while {}", name));
            }
        };

        let mut stats = SessionStats {
            contracts: collector.len(),
            ..SessionStats::default()
        };

        for path in files.iter().filter(|p| has_extension(p, SCRIPT_EXTENSION)) {
            if load_script(&mut collector, path) {
                stats.scripts += 1;
            }
        }

        for path in files.iter().filter(|p| has_extension(p, TRACE_EXTENSION)) {
            stats.trace_files += 1;
            let applied = read_trace_file(path).and_then(|records| {
                collector
                    .apply_trace(&records)
                    .with_context(|| format!("Failed to apply trace {}", path.display()))
            });

            match applied {
                Ok(trace) => {
                    stats.hits += trace.hits;
                    stats.branches += trace.branches;
                    stats.ignored_records += trace.ignored;
                }
                Err(e) => {
                    stats.rejected_files += 1;
                    warn_code(
                        ErrorCode::ParsingError,
                        &format!("Skipping trace file: {:#}", e),
                    );
                }
            }
        }

        let contracts: Vec<_> = collector.contracts().collect();
        let trees: Vec<ContractCoverageTree> =
            contracts.par_iter().map(|coverage| build_tree(coverage)).collect();

        let context = ReportContext {
            timestamp,
            source_roots: self.options.source_roots.clone(),
        };

        let mut sink = MemorySink::new();
        for format in &self.options.formats {
            format
                .write_report(&trees, &context, &mut sink)
                .with_context(|| format!("Failed to render {} report", format.name()))?;
        }

        tracing::info!(
            contracts = stats.contracts,
            traces = stats.trace_files,
            rejected = stats.rejected_files,
            artifacts = sink.artifacts().len(),
            "Coverage session finished"
        );

        Ok(SessionReport {
            artifacts: sink.into_artifacts(),
            trees,
            stats,
        })
    }
}

/// Files of the coverage directory in name order; a missing directory is empty
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        tracing::warn!(dir = %dir.display(), "Coverage directory does not exist");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read coverage directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

/// Register the script dump at `path`; returns true when it was attached
fn load_script(collector: &mut CoverageCollector, path: &Path) -> bool {
    let identity = match path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(ContractIdentity::parse)
    {
        Some(Ok(identity)) => identity,
        _ => {
            warn_code(
                ErrorCode::ParsingError,
                &format!("Script file name is not a contract hash: {}", path.display()),
            );
            return false;
        }
    };

    let Some(coverage) = collector.get(&identity) else {
        tracing::debug!(contract = %identity, "Ignoring script of untracked contract");
        return false;
    };
    if coverage.script().is_some() {
        warn_code(
            ErrorCode::DuplicateScript,
            &format!("Ignoring second script for {}: {}", identity, path.display()),
        );
        return false;
    }

    let script = fs::read(path)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| Ok(load_script_bytes(bytes)?))
        .and_then(|bytes| Ok(Script::new(bytes)?));

    match script {
        Ok(script) => match collector.register_script(&identity, script) {
            Ok(()) => true,
            Err(e) => {
                warn_code(ErrorCode::InternalError, &e.to_string());
                false
            }
        },
        Err(e) => {
            warn_code(
                ErrorCode::DecodeError,
                &format!(
                    "No instruction coverage for {} ({}): {:#}",
                    identity,
                    path.display(),
                    e
                ),
            );
            false
        }
    }
}
