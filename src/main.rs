use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};

use conclave_core::ConclaveConfig;
use conclave_gateway::GatewayLink;
use conclave_review::pipeline::ReviewPipeline;

#[derive(Parser)]
#[command(
    name = "conclave",
    version,
    about = "Tri-agent AI code review with majority verdicts",
    long_about = "Conclave submits code to a panel of three independent AI reviewers over a\n\
                   persistent gateway connection and renders a 2-of-3 majority verdict.\n\n\
                   Examples:\n  \
                     conclave review --file src/lib.rs      Review a source file\n  \
                     cat patch.rs | conclave review         Review code from stdin\n  \
                     conclave mcp                           Serve the code_review MCP tool\n  \
                     conclave init                          Create a .conclave.toml config file"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .conclave.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose diagnostics
    #[arg(long, short, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Submit code for review and print the panel's verdicts
    #[command(long_about = "Submit code for review and print the panel's verdicts.\n\n\
        Reads the submission from --file or stdin, sends it to the review gateway,\n\
        and waits for all three reviewers. If the deadline passes with at least one\n\
        verdict, a partial majority is reported; with none, the review fails.\n\n\
        Examples:\n  conclave review --file src/lib.rs\n  git show HEAD:src/lib.rs | conclave review --context 'refactored parser'")]
    Review {
        /// Read code from file instead of stdin
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// What the code is supposed to do; shown to the reviewers
        #[arg(long)]
        context: Option<String>,

        /// Review gateway WebSocket URL (overrides config)
        #[arg(long)]
        gateway_url: Option<String>,

        /// Per-review deadline in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,

        /// Save the full verdict as JSON to this file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Exit with non-zero status if the panel rejects the code
        #[arg(long)]
        fail_on_negative: bool,
    },
    /// Run the MCP server on stdio
    #[command(long_about = "Run the MCP server on stdio.\n\n\
        Connects to the review gateway once at startup and exposes the code_review\n\
        tool until the MCP client closes stdin. Logs go to stderr.")]
    Mcp,
    /// Create a default configuration file
    Init,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Conclave configuration

[gateway]
# WebSocket endpoint of the review gateway.
url = "ws://127.0.0.1:8000/ws"
# Uncomment to authenticate with your own application identity.
# app_id = ""
# app_secret = ""

[review]
# Deadline for a single review request, in seconds.
timeout_secs = 300
debug = false
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let mut config = match &cli.config {
        Some(path) => ConclaveConfig::from_file(path).into_diagnostic()?,
        None => {
            let default_path = std::path::Path::new(".conclave.toml");
            if default_path.exists() {
                ConclaveConfig::from_file(default_path).into_diagnostic()?
            } else {
                ConclaveConfig::default()
            }
        }
    }
    .with_env();
    if cli.debug {
        config.review.debug = true;
    }

    match cli.command {
        None => {
            Cli::command().print_help().into_diagnostic()?;
            Ok(())
        }
        Some(Command::Review {
            ref file,
            ref context,
            ref gateway_url,
            timeout,
            ref output,
            fail_on_negative,
        }) => {
            if let Some(url) = gateway_url {
                config.gateway.url = url.clone();
            }
            if let Some(timeout) = timeout {
                config.review.timeout_secs = timeout;
            }

            let code = read_code_input(file)?;
            if code.trim().is_empty() {
                miette::bail!(miette::miette!(
                    help = "Pipe code to conclave, e.g.: cat src/lib.rs | conclave review\n       Or use --file <path>",
                    "Empty code input"
                ));
            }

            let context = context.clone().unwrap_or_else(|| match file {
                Some(path) => format!("Please review this code: {}", path.display()),
                None => conclave_review::prompt::DEFAULT_CONTEXT.to_string(),
            });

            let spinner = start_spinner("Consulting the reviewer panel...");

            let link = Arc::new(GatewayLink::connect(&config.gateway).await.into_diagnostic()?);
            let pipeline = ReviewPipeline::new(link, config.review.clone());
            let outcome = pipeline.submit(&code, &context).await;

            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            let verdict = outcome.into_diagnostic()?;
            pipeline.link().shutdown().await;

            print_verdict(&verdict);

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&verdict).into_diagnostic()?;
                std::fs::write(path, json).into_diagnostic()?;
                println!("\nResults saved to: {}", path.display());
            }

            if fail_on_negative && !verdict.passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Mcp) => {
            conclave_mcp::server::run_server(config).await.into_diagnostic()?;
            Ok(())
        }
        Some(Command::Init) => {
            let path = std::path::Path::new(".conclave.toml");
            if path.exists() {
                miette::bail!(".conclave.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG_TEMPLATE).into_diagnostic()?;
            println!("Created .conclave.toml");
            Ok(())
        }
        Some(Command::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "conclave",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if debug { "debug" } else { "warn" })
    });
    // Logs go to stderr; the MCP transport owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_code_input(file: &Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .into_diagnostic()?;
            Ok(buffer)
        }
    }
}

fn start_spinner(message: &'static str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})").unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

fn print_verdict(verdict: &conclave_core::ReviewVerdict) {
    println!("==================================================");
    println!(" CONCLAVE CODE REVIEW");
    println!("==================================================");
    println!("Final decision: {}", verdict.final_decision);
    println!("Passed: {}", verdict.passed);
    if verdict.partial {
        println!(
            "Partial verdict: only {} reviewer(s) answered before the deadline.",
            verdict.verdicts.len()
        );
    }
    println!("\nReviews:");
    println!("--------------------------------------------------");
    for v in &verdict.verdicts {
        println!("\n[{}] {}", v.agent, v.decision);
        println!("{}", v.narrative);
    }
}
