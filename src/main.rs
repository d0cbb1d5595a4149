use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn, Instrument};

use dashgen::config::Config;
use dashgen::dashboards::{self, DashboardDef, DASHBOARDS};
use dashgen::grafana::{write_dashboard, GrafanaClient, WriteOutcome};
use dashgen::logging;

#[derive(Parser)]
#[command(name = "dashgen")]
#[command(about = "Generate Grafana dashboards from typed PromQL definitions")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file, `dashgen.toml` by default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the bundled dashboards
    List,
    /// Generate dashboards, write them and upload changed ones to Grafana
    Generate {
        /// Only generate these dashboards (repeatable)
        #[arg(long)]
        only: Vec<String>,
        /// Overrides `output_dir` from the config
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        no_upload: bool,
        /// Print dashboards to stdout instead of writing files
        #[arg(long)]
        stdout: bool,
    },
}

fn select(only: &[String]) -> anyhow::Result<Vec<&'static DashboardDef>> {
    if only.is_empty() {
        return Ok(DASHBOARDS.iter().collect());
    }
    only.iter()
        .map(|name| dashboards::find(name).map_err(Into::into))
        .collect()
}

async fn generate_one(
    def: &'static DashboardDef,
    output_dir: &Path,
    client: Option<&GrafanaClient>,
    to_stdout: bool,
) -> anyhow::Result<()> {
    let dashboard = (def.build)()
        .with_context(|| format!("Failed to build dashboard '{}'", def.name))?
        .build();

    if to_stdout {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    let path = output_dir.join("dashboards").join(format!("{}.json", def.name));
    let outcome = write_dashboard(&path, &dashboard)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    match (outcome, client) {
        (WriteOutcome::Unchanged, _) => info!("Dashboard unchanged, skipping upload"),
        (WriteOutcome::Written, None) => info!(path = %path.display(), "Dashboard written"),
        (WriteOutcome::Written, Some(client)) => {
            info!(path = %path.display(), "Dashboard written");
            client
                .post_dashboard(&dashboard)
                .await
                .with_context(|| format!("Failed to upload '{}' to {}", def.name, client.url()))?;
            info!("Dashboard uploaded");
        }
    }
    Ok(())
}

async fn generate(
    config: Config,
    only: Vec<String>,
    no_upload: bool,
    to_stdout: bool,
) -> anyhow::Result<()> {
    let selected = select(&only)?;
    let client = if no_upload {
        None
    } else {
        GrafanaClient::from_config(&config.grafana).map(Arc::new)
    };
    if client.is_none() && !no_upload && !to_stdout {
        warn!("No Grafana url configured, dashboards are only written to disk");
    }
    let output_dir = Arc::new(config.output_dir);

    let mut tasks = JoinSet::new();
    for def in selected {
        let output_dir = Arc::clone(&output_dir);
        let client = client.clone();
        let span = tracing::info_span!("dashboard", name = def.name);
        tasks.spawn(
            async move {
                let result = generate_one(def, &output_dir, client.as_deref(), to_stdout).await;
                (def.name, result)
            }
            .instrument(span),
        );
    }

    let mut failed = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(()))) => {}
            Ok((name, Err(e))) => {
                error!(dashboard = name, "{:#}", e);
                failed.push(name.to_string());
            }
            Err(e) => {
                error!("Generation task panicked: {}", e);
                failed.push("<task>".to_string());
            }
        }
    }

    if !failed.is_empty() {
        bail!("{} dashboard(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.json_logs);

    match cli.command {
        Commands::List => {
            for def in DASHBOARDS {
                println!("{}", def.name);
            }
        }
        Commands::Generate {
            only,
            output_dir,
            no_upload,
            stdout,
        } => {
            let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            info!(output_dir = %config.output_dir.display(), "Generating dashboards");
            generate(config, only, no_upload, stdout).await?;
        }
    }
    Ok(())
}
