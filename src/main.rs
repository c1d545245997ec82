#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use js_bench::engine::{register_engines, EngineSetup};
use js_bench::harness::run_benchmarks;
use js_bench::report::{build_report, render, write_json};
use js_bench::server::{materialize_default_server, NodeServer};
use js_bench::{BenchError, BenchResult};

#[derive(Parser, Debug)]
#[command(name = "js-bench")]
#[command(about = "Benchmark one JavaScript file across multiple engines", long_about = None)]
struct Cli {
    /// Path to the JavaScript file to benchmark (default: every demos/*.js)
    #[arg(long)]
    script: Option<PathBuf>,

    /// Number of measured iterations per engine
    #[arg(long, default_value_t = 5)]
    iterations: usize,

    /// Port for the persistent node server
    #[arg(long, default_value_t = 3210)]
    port: u16,

    /// Path to a custom server script (default: embedded server)
    #[arg(long)]
    server_path: Option<PathBuf>,

    /// Path to the node interpreter binary
    #[arg(long, default_value = "node")]
    node_path: String,

    /// Write machine-readable JSON report to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Enable verbose logging (or set JS_BENCH_LOG)
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("JS_BENCH_LOG").unwrap_or_else(|_| {
        if verbose {
            "js_bench=debug".to_string()
        } else {
            "js_bench=info".to_string()
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> BenchResult<()> {
    let scripts = collect_scripts(cli.script.as_deref())?;

    // The default server script lives in the binary; keep the temp dir
    // alive for the whole run.
    let _server_dir;
    let server_path = match &cli.server_path {
        Some(path) => path.clone(),
        None => {
            let dir = tempfile::tempdir()
                .map_err(|e| BenchError::Message(format!("failed to create temp dir: {e}")))?;
            let path = materialize_default_server(dir.path())?;
            _server_dir = dir;
            path
        }
    };

    let mut server = NodeServer::new(&cli.node_path, &server_path, cli.port)?;
    let server_up = if js_bench::engine::probe_node(&cli.node_path).is_some() {
        match server.start() {
            Ok(()) => true,
            Err(e) => {
                warn!("node server unavailable, skipping node-http: {e}");
                false
            }
        }
    } else {
        false
    };
    let base_url = server.base_url();

    let result = run_scripts(&cli, &scripts, server_up.then_some(base_url.as_str()));
    server.stop();
    result
}

fn run_scripts(cli: &Cli, scripts: &[PathBuf], server_url: Option<&str>) -> BenchResult<()> {
    let multi = scripts.len() > 1;
    for script_path in scripts {
        let code = std::fs::read_to_string(script_path)
            .map_err(|_| BenchError::ScriptNotFound(script_path.clone()))?;

        let setup = EngineSetup {
            script_path,
            code: &code,
            node_path: &cli.node_path,
            server_url,
        };
        let mut engines = register_engines(&setup)?;
        let outcomes = run_benchmarks(&mut engines, cli.iterations);
        let report = build_report(script_path, &code, cli.iterations, outcomes);
        print!("{}", render(&report));

        if let Some(base) = &cli.json {
            write_json(&report, &json_path_for(base, script_path, multi))?;
        }
    }
    Ok(())
}

/// Every demo script, or just the one the user asked for. Companion files
/// are bundled into their dependents, never benchmarked on their own.
fn collect_scripts(script: Option<&std::path::Path>) -> BenchResult<Vec<PathBuf>> {
    if let Some(path) = script {
        if !path.is_file() {
            return Err(BenchError::ScriptNotFound(path.to_path_buf()));
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let dir = std::path::Path::new("demos");
    let entries = std::fs::read_dir(dir)
        .map_err(|e| BenchError::Message(format!("failed to read {}: {e}", dir.display())))?;
    let mut scripts: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("js"))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |n| !n.contains("helpers"))
        })
        .collect();
    scripts.sort();
    if scripts.is_empty() {
        return Err(BenchError::Message(format!(
            "no benchmark scripts found under {}",
            dir.display()
        )));
    }
    Ok(scripts)
}

/// With several scripts and one `--json` flag, suffix each report file with
/// the script stem so reports do not overwrite each other.
fn json_path_for(base: &std::path::Path, script: &std::path::Path, multi: bool) -> PathBuf {
    if !multi {
        return base.to_path_buf();
    }
    let stem = script
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("script");
    let ext = base.extension().and_then(|e| e.to_str()).unwrap_or("json");
    let base_stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    base.with_file_name(format!("{base_stem}-{stem}.{ext}"))
}
