use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use owo_colors::OwoColorize;
use pagewalk_core::{Direction, Engine, EngineConfig};
use serde::Serialize;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extract chapter text from web pages and walk paginated documents
#[derive(Parser, Debug)]
#[command(name = "pagewalk")]
#[command(version)]
#[command(about = "Extract chapter text from web pages and walk paginated documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: Options,
}

#[derive(clap::Args, Debug)]
struct Options {
    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value_t = 20, value_name = "SECS")]
    timeout: u64,

    /// Retries after a failed attempt
    #[arg(long, global = true, default_value_t = 2, value_name = "NUM")]
    retries: u32,

    /// Custom User-Agent for HTTP requests
    #[arg(long, global = true, value_name = "UA")]
    user_agent: Option<String>,

    /// Minimum characters for the primary extractor's text to be accepted
    #[arg(long, global = true, default_value_t = 250, value_name = "NUM")]
    min_chars: usize,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the readable text of a page
    Extract {
        /// Page URL
        url: String,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Detect the chapter number of a page
    Detect {
        /// Page URL
        url: String,

        /// Expected fragment, e.g. "chapter12", used to pick among URL matches
        #[arg(short, long, value_name = "HINT")]
        pattern: Option<String>,
    },

    /// Resolve the next or previous page
    Navigate {
        /// Current page URL
        url: String,

        /// next or previous
        #[arg(default_value = "next")]
        direction: Direction,
    },

    /// Show the chapter and navigation links of a page
    Links {
        /// Page URL
        url: String,

        /// Expected fragment used to pick among URL matches
        #[arg(short, long, value_name = "HINT")]
        pattern: Option<String>,
    },

    /// Follow next links from a start page and extract every chapter
    Book {
        /// First chapter URL
        url: String,

        /// Stop after this many chapters
        #[arg(long, value_name = "NUM")]
        max_chapters: Option<usize>,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Generate a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "info,pagewalk=debug,pagewalk_core=debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

fn build_engine(options: &Options) -> anyhow::Result<Engine> {
    let mut builder = EngineConfig::builder()
        .timeout(options.timeout)
        .max_retries(options.retries)
        .min_content_chars(options.min_chars);
    if let Some(user_agent) = &options.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }

    Engine::new(builder.build()).context("Failed to build engine")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => println!("{}", content),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let options = &cli.options;

    if let Command::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "pagewalk", &mut io::stdout());
        return Ok(());
    }

    init_logging(options.verbose)?;
    if options.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    let engine = build_engine(options)?;
    let started = Instant::now();

    match cli.command {
        Command::Extract { url, output } => {
            if options.verbose {
                echo::print_step(1, 2, &format!("Fetching {}", url.bright_white().underline()));
            }
            let result = engine.extract(&url).await;
            if let Some(err) = result.to_error() {
                return Err(err).with_context(|| format!("Failed to extract {}", url));
            }

            if options.verbose {
                echo::print_extraction_details(&result);
                echo::print_step(2, 2, "Writing output");
            }
            if options.json {
                let json = serde_json::to_string_pretty(&result).context("Failed to serialize output")?;
                write_output(output.as_deref(), &json)?;
            } else {
                write_output(output.as_deref(), &result.text)?;
            }
        }
        Command::Detect { url, pattern } => {
            let info = engine
                .detect_chapter(&url, pattern.as_deref())
                .await
                .with_context(|| format!("Failed to detect a chapter for {}", url))?;

            if options.json {
                print_json(&info)?;
            } else {
                echo::print_chapter(&info);
            }
        }
        Command::Navigate { url, direction } => {
            let outcome = engine.navigate(&url, direction).await.context("Navigation failed")?;

            if options.json {
                print_json(&outcome)?;
            } else {
                echo::print_navigation(&outcome);
            }
        }
        Command::Links { url, pattern } => {
            let report = engine
                .check_lock(&url, pattern.as_deref())
                .await
                .with_context(|| format!("Failed to inspect {}", url))?;

            if options.json {
                print_json(&report)?;
            } else {
                echo::print_links(&report);
            }
        }
        Command::Book { url, max_chapters, output } => {
            if options.verbose {
                echo::print_step(1, 2, &format!("Walking chapters from {}", url.bright_white().underline()));
            }
            let chapters = engine
                .collect_book(&url, max_chapters)
                .await
                .with_context(|| format!("Failed to collect chapters from {}", url))?;
            if max_chapters.is_some_and(|cap| chapters.len() == cap) {
                echo::print_warning(&format!("Stopped at the limit of {} chapters", chapters.len()));
            }

            if options.verbose {
                echo::print_step(2, 2, &format!("Writing {} chapters", chapters.len()));
            }
            let content = if options.json {
                serde_json::to_string_pretty(&chapters).context("Failed to serialize output")?
            } else {
                echo::render_book(&chapters)
            };
            write_output(output.as_deref(), &content)?;
        }
        Command::Completions { .. } => {}
    }

    if options.verbose {
        echo::print_timing("Total", started.elapsed());
    }

    Ok(())
}
