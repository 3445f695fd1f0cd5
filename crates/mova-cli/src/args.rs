use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mova")]
#[command(author, version, about = "Execute canonical MOVA plan documents")]
pub struct Cli {
    #[arg(short, long, global = true, help = "Verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run a plan document")]
    Run {
        #[arg(help = "Path to a canonical plan file")]
        plan: PathBuf,

        #[arg(
            short = 'p',
            long = "param",
            value_name = "KEY=VALUE",
            help = "Initial parameter; the value parses as JSON when possible, else as a string"
        )]
        params: Vec<String>,

        #[arg(
            long,
            value_name = "FILE|JSON",
            help = "Initial parameters as a JSON object, inline or from a file"
        )]
        params_json: Option<String>,

        #[arg(
            long,
            value_name = "FILE",
            help = "Manifest registry for flow:invoke references (defaults to manifest.json next to the plan)"
        )]
        manifest: Option<PathBuf>,

        #[arg(long, help = "Skip network calls and delays")]
        dry_run: bool,
    },

    #[command(about = "Check plan documents for structural problems (dry run)")]
    Check {
        #[arg(required = true, num_args = 1..)]
        plans: Vec<PathBuf>,
    },
}
