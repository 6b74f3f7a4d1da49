use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use stressor::config::{ConfigLoader, LoadTestConfig};
use stressor::metrics::snapshot::MetricsSnapshot;
use stressor::output::{create_output, OutputFormat};
use stressor::{Dispatcher, HttpExecutor, MetricsCollector, Report};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

#[derive(Parser)]
#[command(name = "stressor")]
#[command(version)]
#[command(about = "Fire a fixed number of GET requests at a URL with bounded concurrency", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a load test
    Run {
        /// Target URL
        #[arg(short, long)]
        url: Option<String>,

        /// Total number of requests to issue
        #[arg(short, long)]
        requests: Option<usize>,

        /// Maximum number of requests in flight at once
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Configuration file (JSON/YAML/TOML); flags take precedence
        #[arg(long)]
        config: Option<PathBuf>,

        /// Report format written to stdout
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Show a progress bar (stderr)
        #[arg(short, long)]
        progress: bool,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let multi = Arc::new(indicatif::MultiProgress::new());

    match cli.command {
        Commands::Run { url, requests, concurrency, config, format, progress } => {
            if progress {
                indicatif_log_bridge::LogWrapper::new((*multi).clone(), logger).try_init()?;
            } else {
                log::set_max_level(logger.filter());
                log::set_boxed_logger(Box::new(logger))?;
            }

            let overrides = LoadTestConfig {
                url: url.unwrap_or_default(),
                requests,
                concurrency,
                format,
            };
            let settings = ConfigLoader::resolve(config.as_ref(), overrides)?;
            let plan = settings.to_plan()?;

            log::info!("Running stress test against {}", plan.url());
            log::info!("Requests: {}", plan.requests());
            log::info!("Workers: {}", plan.workers());

            let metrics = Arc::new(MetricsCollector::new());
            let dispatcher = Dispatcher::new(Arc::new(HttpExecutor::new()?), Some(metrics));

            let mut progress_task = None;
            let mut progress_bar: Option<ProgressBar> = None;
            if progress {
                let pb = multi.add(ProgressBar::new(plan.requests() as u64));
                pb.set_style(ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                    .progress_chars("#>-"));

                let mut snapshots = WatchStream::new(dispatcher.watch_metrics());
                let pb_clone = pb.clone();
                progress_bar = Some(pb);
                progress_task = Some(tokio::spawn(async move {
                    while let Some(snapshot) = snapshots.next().await {
                        update_progress(&pb_clone, &snapshot);
                    }
                }));
            }

            let dispatch = dispatcher.dispatch(&plan).await?;

            if let Some(task) = progress_task {
                task.abort();
            }
            if let Some(pb) = progress_bar {
                update_progress(&pb, &dispatcher.get_metrics());
                pb.finish();
            }

            let report = Report::build(&dispatch.outcomes, dispatch.elapsed);
            let mut output = create_output(settings.output_format());
            output.write(&report).await?;
            output.close().await?;
        }
        Commands::Check { config } => {
            match ConfigLoader::load(&config) {
                Ok(cfg) => {
                    println!("✅ Config is valid:");
                    println!("   URL: {}", cfg.url);
                    println!("   Requests: {:?}", cfg.requests);
                    println!("   Concurrency: {:?}", cfg.concurrency);
                    println!("   Format: {:?}", cfg.output_format());
                }
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn update_progress(pb: &ProgressBar, snapshot: &MetricsSnapshot) {
    pb.set_position(snapshot.requests_completed);
    pb.set_message(format!(
        "Active: {} | 200s: {:.1}% | RPS: {:.2}",
        snapshot.active_workers,
        snapshot.success_rate,
        snapshot.requests_per_second
    ));
}
