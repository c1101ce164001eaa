mod commands;
mod input;
mod manifest;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::input::ConfigArgs;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Snapshot layout for `build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LayoutArg {
    Tree,
    Flat,
}

/// Upline reference field accepted by `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum FieldArg {
    LicensingNumber,
    SecondaryProducerId,
    Email,
}

impl From<FieldArg> for upline_core::UplineField {
    fn from(f: FieldArg) -> Self {
        match f {
            FieldArg::LicensingNumber => upline_core::UplineField::LicensingNumber,
            FieldArg::SecondaryProducerId => upline_core::UplineField::SecondaryProducerId,
            FieldArg::Email => upline_core::UplineField::Email,
        }
    }
}

/// Upline hierarchy resolver.
#[derive(Parser)]
#[command(name = "upline", version, about = "Upline hierarchy resolver")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a contact file into a snapshot and print it as JSON
    Build {
        /// Path to the contacts JSON file
        contacts: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
        /// Snapshot layout
        #[arg(long, default_value = "tree", value_enum)]
        layout: LayoutArg,
        /// Replace synthetic group nodes by promoting their children to roots
        #[arg(long)]
        flatten_synthetic: bool,
        /// Leave out opportunity-pipeline payloads
        #[arg(long)]
        omit_pipeline: bool,
        /// Wrap the snapshot in an envelope with its etag
        #[arg(long)]
        manifest: bool,
    },

    /// Print the issues report and stats for a contact file
    Check {
        /// Path to the contacts JSON file
        contacts: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
        /// Exit 1 when any issue is found
        #[arg(long)]
        strict: bool,
    },

    /// Validate a contact file against the contact JSON Schema
    Validate {
        /// Path to the contacts JSON file
        contacts: PathBuf,
    },

    /// Change one contact's upline reference and rebuild
    Update {
        /// Path to the contacts JSON file
        contacts: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
        /// Contact id to update
        #[arg(long)]
        contact: String,
        /// Upline field to rewrite
        #[arg(long, value_enum)]
        field: FieldArg,
        /// New value; an empty string clears the reference
        #[arg(long)]
        value: String,
        /// Save the updated contact list back to the file
        #[arg(long)]
        write: bool,
    },

    /// Compare the hierarchies built from two contact files
    Diff {
        /// Contacts before the change
        before: PathBuf,
        /// Contacts after the change
        after: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Start the upline HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
        /// Path to the contacts JSON file to load at startup
        contacts: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "upline=warn" } else { "upline=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match cli.command {
        Commands::Build {
            contacts,
            config,
            layout,
            flatten_synthetic,
            omit_pipeline,
            manifest,
        } => {
            commands::build::cmd_build(
                &contacts,
                &config,
                commands::build::BuildOptions {
                    layout,
                    flatten_synthetic,
                    omit_pipeline,
                    manifest,
                },
                cli.output,
                cli.quiet,
            );
        }
        Commands::Check {
            contacts,
            config,
            strict,
        } => {
            commands::check::cmd_check(&contacts, &config, strict, cli.output, cli.quiet);
        }
        Commands::Validate { contacts } => {
            commands::validate::cmd_validate(&contacts, cli.output, cli.quiet);
        }
        Commands::Update {
            contacts,
            config,
            contact,
            field,
            value,
            write,
        } => {
            commands::update::cmd_update(
                &contacts,
                &config,
                commands::update::UpdateRequest {
                    contact: &contact,
                    field: field.into(),
                    value: &value,
                    write,
                },
                cli.output,
                cli.quiet,
            );
        }
        Commands::Diff {
            before,
            after,
            config,
        } => {
            commands::diff::cmd_diff(&before, &after, &config, cli.output, cli.quiet);
        }
        Commands::Serve {
            port,
            contacts,
            config,
        } => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    let msg = format!("failed to create tokio runtime: {}", e);
                    report_error(&msg, cli.output, cli.quiet);
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(port, contacts, config)) {
                report_error(&format!("server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Report and exit on `Err`.
pub(crate) fn or_exit<T>(result: Result<T, String>, output: OutputFormat, quiet: bool) -> T {
    match result {
        Ok(v) => v,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}
