use anyhow::{Context, Result};
use cardinal_grip::storage::SessionStore;
use cardinal_grip::{finalize, Classification, Config, SessionController, SessionSummary};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "cardinal-grip", version, about = "Grip-force rehab session recorder")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/cardinal-grip")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record one session and save it
    Record(RecordArgs),
    /// Print the summary of a saved session file
    Summarize(SummarizeArgs),
    /// List saved session files, newest last
    List {
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct RecordArgs {
    /// Serial device path, tcp://host:port or ws:// URL
    #[arg(long)]
    target: Option<String>,

    /// Maximum session length in seconds
    #[arg(long)]
    duration: Option<f64>,

    #[command(flatten)]
    classification: ClassificationArgs,
}

#[derive(Debug, Args)]
struct SummarizeArgs {
    file: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    classification: ClassificationArgs,
}

#[derive(Debug, Args)]
struct ClassificationArgs {
    /// Count samples where any finger reaches this ADC value
    #[arg(long, conflicts_with = "band")]
    threshold: Option<i64>,

    /// Track the share of samples with every finger inside this range
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    band: Option<Vec<i64>>,
}

impl ClassificationArgs {
    fn resolve(&self) -> Option<Classification> {
        match (&self.band, self.threshold) {
            (Some(band), _) if band.len() == 2 => Some(Classification::Band {
                min: band[0],
                max: band[1],
            }),
            (_, Some(value)) => Some(Classification::Threshold { value }),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Command::Record(args) => record(cfg, args).await,
        Command::Summarize(args) => summarize(cfg, args),
        Command::List { data_dir } => {
            let store = SessionStore::new(data_dir.unwrap_or(cfg.storage.data_dir));
            let files = store.list()?;
            if files.is_empty() {
                warn!("No session files found in {}", store.data_dir().display());
            }
            for file in files {
                println!("{}", file.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn record(cfg: Config, args: RecordArgs) -> Result<ExitCode> {
    let mut session = cfg.session.to_session_config();
    if let Some(target) = args.target {
        session.transport_target = target;
    }
    if let Some(duration) = args.duration {
        session.duration_cap_seconds = duration;
    }
    if let Some(classification) = args.classification.resolve() {
        session.classification = classification;
    }

    let controller = SessionController::new(session).context("Invalid session settings")?;

    let stop = controller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop requested");
            stop.stop();
        }
    });

    let progress = controller.subscribe();
    let reporter = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let p = progress.borrow().clone();
            if p.state.is_terminal() {
                break;
            }
            if let Some(latest) = p.latest {
                info!(
                    "Elapsed {:5.1}s | latest {:?} | {}",
                    p.elapsed_seconds, latest, p.metric
                );
            }
        }
    });

    let outcome = controller.run().await;
    reporter.abort();

    let store = SessionStore::new(&cfg.storage.data_dir);
    let report = finalize(outcome, &store, cfg.session.channel_names.as_deref())
        .context("Failed to save session")?;

    print!("{}", report.summary);

    match report.failure() {
        Some(cause) => {
            eprintln!("Session failed: {}", cause);
            Ok(ExitCode::FAILURE)
        }
        None => Ok(ExitCode::SUCCESS),
    }
}

fn summarize(cfg: Config, args: SummarizeArgs) -> Result<ExitCode> {
    let classification = args
        .classification
        .resolve()
        .unwrap_or(cfg.session.classification);

    let file = SessionStore::load_file(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    let summary = SessionSummary::compute(&file.record, classification).with_saved_path(&file.path);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Channels:   {}", file.channel_names.join(", "));
        print!("{}", summary);
    }

    Ok(ExitCode::SUCCESS)
}
