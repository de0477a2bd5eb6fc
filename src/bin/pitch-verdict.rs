#![forbid(unsafe_code)]

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pitch_verdict::gateway::OpenRouterAdapter;
use pitch_verdict::service::{InboundRequest, PitchService};
use pitch_verdict::{
    parse_stage_output, GatewayResearcher, LogMeter, PipelineConfig, PitchPipeline, StageKind,
};

#[derive(Parser)]
#[command(name = "pitch-verdict", version, about = "Adjudicated LLM verdicts on startup pitches")]
struct Cli {
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a pitch (LLM calls)
    ///
    /// Reads pitch facts as a JSON object and prints the full result, or a
    /// tagged error body with a non-zero exit code.
    Run {
        /// Pitch JSON file ("-" for stdin)
        #[arg(long, default_value = "-")]
        pitch: PathBuf,
        #[arg(long, default_value = "en")]
        locale: String,
        /// Run the research stage instead of the canned placeholder
        #[arg(long)]
        full_research: bool,
        /// Pipeline config JSON (defaults plus PITCH_* env vars otherwise)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Whole-request budget override, in seconds
        #[arg(long)]
        budget_secs: Option<u64>,
        #[arg(long)]
        subject: Option<String>,
        /// Write the response body here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Complete a raw stage answer offline (no LLM calls)
    Complete {
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Raw model output file ("-" for stdin)
        #[arg(long, default_value = "-")]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Personality,
    Adjudication,
}

impl From<KindArg> for StageKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Personality => StageKind::Personality,
            KindArg::Adjudication => StageKind::Adjudication,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            pitch,
            locale,
            full_research,
            config,
            budget_secs,
            subject,
            out,
        } => {
            let config = match config {
                Some(path) => PipelineConfig::from_path(path)?,
                None => PipelineConfig::from_env()?,
            };
            let pitch: serde_json::Value = serde_json::from_str(&read_input(&pitch)?)?;

            let gateway = Arc::new(OpenRouterAdapter::from_env()?);
            let researcher = Arc::new(GatewayResearcher::new(
                gateway.clone(),
                config.research.params(),
            ));
            let pipeline = Arc::new(PitchPipeline::new(gateway, researcher, config));

            let mut service = PitchService::new(pipeline, Arc::new(LogMeter));
            if let Some(secs) = budget_secs {
                service = service.with_budget(Duration::from_secs(secs));
            }

            let response = service
                .handle(InboundRequest {
                    pitch,
                    locale,
                    full_research,
                    subject,
                })
                .await;

            let json = serde_json::to_string_pretty(&response.body)?;
            match out {
                Some(path) => std::fs::write(path, json)?,
                None => println!("{json}"),
            }
            if !response.is_success() {
                std::process::exit(exit_code(response.status));
            }
        }
        Commands::Complete { kind, input } => {
            let raw = read_input(&input)?;
            let (value, fallback) = parse_stage_output(&raw, kind.into());
            if let Some(reason) = fallback {
                warn!(%reason, "input was unusable; printed the fallback object");
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn read_input(path: &PathBuf) -> Result<String, io::Error> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

/// 2 for caller errors, 1 for everything else.
fn exit_code(status: u16) -> i32 {
    if (400..500).contains(&status) {
        2
    } else {
        1
    }
}
