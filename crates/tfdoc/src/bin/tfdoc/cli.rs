//! tfdoc cli interface

use clap::{Parser, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; tfdoc ... }
    #[clap(short = 'C', long = "directory")]
    pub directory: Vec<PathBuf>,

    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Log at debug level (unless TFDOC_LOG says otherwise) and report expressions that were not evaluated
    #[clap(long)]
    pub debug: bool,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Directory of the root module
    #[clap(default_value = ".")]
    pub path: PathBuf,

    /// Fail on files that are not valid HCL instead of skipping them
    #[clap(long)]
    pub stop_on_hcl_error: bool,

    /// Allow remote modules to be downloaded
    ///
    /// Downloading is not implemented, remote modules are only found when `terraform init` already fetched them.
    #[clap(long)]
    pub allow_downloads: bool,

    /// Variable file (*.tfvars) for the root module
    ///
    /// Can be specified multiple times, later files win.
    #[clap(long = "var-file")]
    pub var_files: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,

    /// Write JSON on a single line
    #[clap(long)]
    pub compact: bool,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
