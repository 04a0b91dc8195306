use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gcsb",
    about = "Browse and edit objects in a storage bucket as folders and files",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Bucket to browse (overrides the configuration)
    #[arg(short, long, global = true)]
    pub bucket: Option<String>,

    /// Bearer token (defaults to $GCSB_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// API endpoint root, e.g. an emulator URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the buckets of a project
    Buckets(BucketsArgs),
    /// List a folder
    Ls(LsArgs),
    /// Show object metadata
    Stat(KeyArgs),
    /// Print a text object
    Cat(KeyArgs),
    /// Upload a local file
    Put(PutArgs),
    /// Create a folder
    Mkdir(MkdirArgs),
    /// Move or rename an object
    Mv(TransferArgs),
    /// Copy an object
    Cp(TransferArgs),
    /// Delete objects or folders
    Rm(RmArgs),
    /// Download an object
    Get(GetArgs),
    /// Replace a text object's content with stdin
    Edit(KeyArgs),
}

#[derive(Args)]
pub struct BucketsArgs {
    /// Project to list (overrides the configuration)
    #[arg(short, long)]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct LsArgs {
    /// Folder path, e.g. `photos/2024/`
    pub path: Option<String>,
}

#[derive(Args)]
pub struct KeyArgs {
    pub key: String,
}

#[derive(Args)]
pub struct PutArgs {
    pub local: PathBuf,
    /// Destination key, or a folder ending in `/`
    pub key: Option<String>,
}

#[derive(Args)]
pub struct MkdirArgs {
    pub path: String,
}

#[derive(Args)]
pub struct TransferArgs {
    pub source: String,
    /// Destination key, or a folder ending in `/`
    pub destination: String,
}

#[derive(Args)]
pub struct RmArgs {
    #[arg(required = true)]
    pub keys: Vec<String>,
    /// Delete folders with everything below them
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Args)]
pub struct GetArgs {
    pub key: String,
    pub local: Option<PathBuf>,
}
