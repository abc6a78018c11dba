use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vigil::stability::{MetricsPatch, Rect, StabilityExporter, StabilityMonitor, SystemProbe};
use vigil::{create_sample_env_file, MonitorConfig, PerformanceSampler};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Runtime stability monitor - module health, hook duplication, and layout drift")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted stability scenario and print the resulting report
    Demo {
        /// Emit the report as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Run the live monitor: background sampler plus periodic reports
    Watch {
        /// Seconds between printed reports
        #[arg(long, default_value_t = 10)]
        report_interval: u64,
        /// Dump Prometheus text exposition with each report
        #[arg(long)]
        metrics: bool,
    },
    /// Generate sample configuration file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = MonitorConfig::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Demo { json } => run_demo(&config, json),
        Commands::Watch {
            report_interval,
            metrics,
        } => run_watch(&config, report_interval, metrics).await,
        Commands::InitConfig => create_sample_env_file(),
    }
}

/// Scripted scenario covering every signal family: module errors up to
/// critical, a cross-module duplicate hook, and a drifting layout region.
fn run_demo(config: &MonitorConfig, json: bool) -> Result<()> {
    let monitor = StabilityMonitor::new(config.health_policy());

    monitor.record_render("patient_list");
    monitor.record_render("patient_detail");
    monitor.report_module_event(
        "patient_list",
        MetricsPatch {
            load_time_ms: Some(180.0),
            ..Default::default()
        },
    );

    monitor.report_hook_usage("use_session", "patient_list", Some("list/header".to_string()));
    monitor.report_hook_usage("use_session", "patient_detail", Some("detail/header".to_string()));

    monitor.report_layout("banner", Rect::new(0.0, 0.0, 960.0, 60.0));
    monitor.report_layout("banner", Rect::new(24.0, 0.0, 960.0, 60.0));

    for i in 0..6 {
        monitor.record_error("scheduler", format!("appointment fetch failed ({i})"));
    }

    let report = monitor.status_report();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

async fn run_watch(config: &MonitorConfig, report_interval: u64, metrics: bool) -> Result<()> {
    let monitor = StabilityMonitor::new(config.health_policy());
    let exporter = StabilityExporter::new()?;

    let mut sampler = None;
    if config.monitoring_enabled {
        let mut s = PerformanceSampler::new(config.sampler_config());
        s.start(monitor.clone(), Box::new(SystemProbe::new()?));
        sampler = Some(s);
    } else {
        info!("monitoring disabled, sampler not started");
    }

    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(report_interval.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = monitor.status_report();
                print!("{}", report.render());
                if metrics {
                    exporter.update(&monitor.snapshot());
                    println!("{}", exporter.gather());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    if let Some(mut s) = sampler {
        s.shutdown().await;
    }
    Ok(())
}
