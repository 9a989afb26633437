use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use miette::Severity;
use owo_colors::OwoColorize;
use supports_color::Stream;
use tagcheck::diagnostic::CompilerDiagnostic;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod command;

const INTROSPECTION_HEADING: &str = "Introspection";

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(long, env = "TAGCHECK_COLOR", default_value_t = Color::Auto)]
    color: Color,
    #[clap(subcommand)]
    command: Commands,
    #[clap(
        long,
        env = "TAGCHECK_CONFIG",
        global = true,
        help = "The configuration file to use. Defaults to `tagcheck.toml`, if it exists."
    )]
    config: Option<PathBuf>,
    #[clap(
        long,
        env = "TAGCHECK_DEBUG",
        help = "tagcheck will expose the full error chain when reporting diagnostics.",
        long_help = "tagcheck will expose the full error chain when reporting diagnostics.\nSet `TAGCHECK_DEBUG=1` to enable this option."
    )]
    pub debug: bool,
    #[clap(
        long,
        env = "TAGCHECK_LOG",
        help_heading = Some(INTROSPECTION_HEADING),
        hide_short_help = true,
        hide_env = true,
        long_help = "tagcheck will emit internal logs to stderr.\nSet `TAGCHECK_LOG=true` to enable this option using an environment variable."
    )]
    pub log: bool,
    #[clap(
        long,
        env = "TAGCHECK_LOG_FILTER",
        help_heading = Some(INTROSPECTION_HEADING),
        hide_short_help = true,
        hide_env = true,
        long_help = "Control which logs are emitted if `--log` is enabled.\nIf no filter is specified, tagcheck will default to `info,tagcheck=trace`."
    )]
    pub log_filter: Option<String>,
}

#[derive(Copy, Clone, Debug)]
enum Color {
    Auto,
    Always,
    Never,
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Auto => write!(f, "auto"),
            Color::Always => write!(f, "always"),
            Color::Never => write!(f, "never"),
        }
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Color::Auto),
            "always" => Ok(Color::Always),
            "never" => Ok(Color::Never),
            s => Err(anyhow::anyhow!("Invalid color setting: {}", s)),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
enum MessageFormat {
    /// Annotated diagnostics on stderr.
    Human,
    /// A JSON array of findings on stdout.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that records passed to serialization functions tag all their exported fields.
    ///
    /// The exit code is non-zero if any finding is reported or any unit fails to load.
    Check {
        /// The serialized compilation units to check.
        #[arg(required = true)]
        units: Vec<PathBuf>,
        /// Relative source paths are resolved against this directory when
        /// a unit doesn't embed the contents of its files.
        #[clap(long, value_parser)]
        source_root: Option<PathBuf>,
        #[clap(long, value_enum, default_value_t = MessageFormat::Human)]
        message_format: MessageFormat,
    },
    /// Print the effective rule table, in the configuration file format.
    Rules,
}

fn init_telemetry(log_filter: Option<String>, color: Color) -> Result<(), anyhow::Error> {
    let filter_layer = EnvFilter::try_new(log_filter.as_deref().unwrap_or("info,tagcheck=trace"))
        .map_err(|e| anyhow::anyhow!(e).context("Invalid log filter configuration"))?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_color_on_stderr(color))
        .with_file(false)
        .with_target(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_timer(tracing_subscriber::fmt::time::uptime());
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug = cli.debug;
    let color = cli.color;
    let hook = miette::set_hook(Box::new(move |_| {
        let mut handler = miette::MietteHandlerOpts::new();
        if debug {
            handler = handler.with_cause_chain()
        } else {
            handler = handler.without_cause_chain()
        };
        // Force the width of the terminal as seen by the graphical handler.
        // Useful to get stable output in tests.
        if let Ok(width) = std::env::var("TAGCHECK_TTY_WIDTH") {
            if let Ok(width) = width.parse::<usize>() {
                handler = handler.width(width);
            }
        }
        match color {
            Color::Auto => {}
            Color::Always => {
                handler = handler.color(true);
            }
            Color::Never => {
                handler = handler.color(false);
            }
        }
        Box::new(handler.build())
    }));
    if let Err(e) = hook {
        eprintln!("Failed to install the diagnostic handler: {e}");
    }

    better_panic::install();
    if cli.log {
        if let Err(e) = init_telemetry(cli.log_filter, cli.color) {
            report_error(e, cli.color);
            return ExitCode::FAILURE;
        }
    }
    let outcome = match cli.command {
        Commands::Check {
            units,
            source_root,
            message_format,
        } => command::check(
            &units,
            cli.config.as_deref(),
            source_root.as_deref(),
            message_format,
            cli.color,
        ),
        Commands::Rules => command::rules(cli.config.as_deref()),
    };
    match outcome {
        Ok(code) => code,
        Err(e) => {
            report_error(e, cli.color);
            ExitCode::FAILURE
        }
    }
}

/// Report an error that prevents tagcheck from completing (part of) its work.
///
/// The whole cause chain is included in the message.
fn report_error(e: anyhow::Error, color_profile: Color) {
    let diagnostic = CompilerDiagnostic::builder(anyhow::anyhow!("{e:#}")).build();
    print_report(&miette::Report::new(diagnostic), color_profile);
}

fn print_report(e: &miette::Report, color_profile: Color) {
    let use_color = use_color_on_stderr(color_profile);
    match e.severity() {
        None | Some(Severity::Error) => {
            if use_color {
                eprintln!("{}: {e:?}", "ERROR".bold().red());
            } else {
                eprintln!("ERROR: {e:?}");
            }
        }
        Some(_) => {
            if use_color {
                eprintln!("{}: {e:?}", "WARNING".bold().yellow());
            } else {
                eprintln!("WARNING: {e:?}");
            }
        }
    }
}

fn use_color_on_stderr(color_profile: Color) -> bool {
    match color_profile {
        Color::Auto => supports_color::on(Stream::Stderr).is_some(),
        Color::Always => true,
        Color::Never => false,
    }
}
