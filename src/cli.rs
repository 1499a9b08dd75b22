use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Medium;

#[derive(Parser, Debug)]
#[command(name = "fsjson")]
#[command(about = "Read, write and list device storage as JSON", long_about = None)]
pub struct Cli {
    /// Storage medium the root directory stands in for
    #[arg(long, value_enum, default_value_t = Medium::Flash, global = true)]
    pub medium: Medium,

    /// Host directory holding the medium's contents
    #[arg(long, env = "FSJSON_ROOT", default_value = ".", global = true)]
    pub root: PathBuf,

    /// Offset applied to modification times, e.g. -03:00
    #[arg(
        long,
        env = "FSJSON_UTC_OFFSET",
        default_value = "+00:00",
        allow_hyphen_values = true,
        global = true
    )]
    pub utc_offset: String,

    /// Fail instead of creating a missing flash root
    #[arg(long, global = true)]
    pub no_format: bool,

    /// Reported flash capacity in bytes
    #[arg(long, global = true)]
    pub capacity: Option<u64>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Enumerate a directory tree with file metadata
    Tree {
        path: PathBuf,
        /// Directory levels to descend below PATH (0 lists PATH only)
        #[arg(short = 'L', long = "level", default_value_t = 0)]
        level: u32,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List the file names directly inside a directory
    Ls {
        path: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Count the files directly inside a directory
    Count { path: PathBuf },
    /// Print a file's content
    Cat { path: PathBuf },
    /// Write content to a file
    Write {
        path: PathBuf,
        content: String,
        /// Create missing parent directories
        #[arg(long)]
        create: bool,
        /// Append instead of replacing
        #[arg(long, conflicts_with = "create")]
        append: bool,
    },
    /// Create a directory
    Mkdir { path: PathBuf },
    /// Remove a file, or every file directly inside a directory
    Rm { path: PathBuf },
    /// Report flash capacity, used and free bytes
    Df,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
