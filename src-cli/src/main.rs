use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use rqa_core::config::{load_dotenv, RqaConfig};
use rqa_core::error::AppError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use output::{emit, OutputFormat};

#[derive(Parser)]
#[command(name = "regqa")]
#[command(about = "Question answering over regulatory documents with cited, audited answers")]
#[command(version, long_version = env!("REGQA_LONG_VERSION"))]
struct Cli {
    /// JSON config file; environment variables override its values
    #[arg(long, global = true, env = "REGQA_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    output: OutputArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputArg {
    Pretty,
    Json,
}

impl From<OutputArg> for OutputFormat {
    fn from(v: OutputArg) -> Self {
        match v {
            OutputArg::Pretty => OutputFormat::Pretty,
            OutputArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk and embed documents, replacing the vector index
    BuildIndex {
        /// Documents to index (defaults to the configured document list)
        docs: Vec<PathBuf>,

        /// Fail on the first unreadable document instead of skipping it
        #[arg(long)]
        abort_on_error: bool,
    },

    /// Answer one question from the indexed documents
    Ask {
        question: String,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Do not append this query to the session logs
        #[arg(long)]
        no_log: bool,
    },

    /// Run a batch of questions and write an evaluation CSV
    Evaluate {
        /// File with one question per line
        #[arg(long)]
        queries: PathBuf,

        /// Evaluation CSV to (re)create
        #[arg(long, default_value = "evaluation_log.csv")]
        out: PathBuf,
    },

    /// Show index and provider status
    Status,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regqa=info,rqa_core=info,rqa_ai=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let dotenv = load_dotenv();
    init_tracing();
    match dotenv {
        Ok(Some(path)) => info!(path = %path.display(), "loaded .env file"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed to load .env file"),
    }
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let mut cfg = RqaConfig::load(cli.config.as_deref())?;
    let format = OutputFormat::from(cli.output);

    match &cli.command {
        Commands::BuildIndex {
            docs,
            abort_on_error,
        } => {
            cfg.require_credentials()?;
            emit(format, &commands::build_index(&cfg, docs, *abort_on_error)?)
        }
        Commands::Ask {
            question,
            top_k,
            no_log,
        } => {
            cfg.require_credentials()?;
            if let Some(k) = top_k {
                cfg.retrieval.top_k = *k;
            }
            emit(format, &commands::ask(&cfg, question, *no_log)?)
        }
        Commands::Evaluate { queries, out } => {
            cfg.require_credentials()?;
            emit(format, &commands::evaluate(&cfg, queries, out)?)
        }
        Commands::Status => emit(format, &commands::status(&cfg)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ask_with_overrides() {
        let cli = Cli::try_parse_from([
            "regqa",
            "--output",
            "json",
            "ask",
            "List Tier 1 and CET1 capital ratios.",
            "-k",
            "5",
            "--no-log",
        ])
        .expect("parse");
        assert!(matches!(cli.output, OutputArg::Json));
        match cli.command {
            Commands::Ask {
                question,
                top_k,
                no_log,
            } => {
                assert_eq!(question, "List Tier 1 and CET1 capital ratios.");
                assert_eq!(top_k, Some(5));
                assert!(no_log);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn evaluate_defaults_its_output_file() {
        let cli = Cli::try_parse_from([
            "regqa",
            "evaluate",
            "--queries",
            "fixtures/eval_queries.txt",
        ])
        .expect("parse");
        match cli.command {
            Commands::Evaluate { queries, out } => {
                assert_eq!(queries, PathBuf::from("fixtures/eval_queries.txt"));
                assert_eq!(out, PathBuf::from("evaluation_log.csv"));
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn build_index_accepts_many_documents() {
        let cli = Cli::try_parse_from([
            "regqa",
            "build-index",
            "a.pdf",
            "b.pdf",
            "--abort-on-error",
        ])
        .expect("parse");
        match cli.command {
            Commands::BuildIndex {
                docs,
                abort_on_error,
            } => {
                assert_eq!(docs, vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]);
                assert!(abort_on_error);
            }
            _ => panic!("expected build-index"),
        }
    }
}
