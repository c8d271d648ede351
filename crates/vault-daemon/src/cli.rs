use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vaultkeep")]
#[command(about = "Semantic document vault: watch, chunk, archive, index, embed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (defaults to ./vault.toml)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the daemon: watcher, processing worker, embedding sync worker,
    /// and the WebDAV front end, until interrupted.
    Serve,

    /// Ingest one or more files directly, bypassing the watcher and queue.
    File {
        /// Paths to ingest
        paths: Vec<PathBuf>,

        /// Where archived chunks and the index are written (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reprocess even if the version map says this file is current
        #[arg(short, long)]
        force: bool,

        /// Similarity threshold below which a chunk boundary is placed
        #[arg(short = 't', long)]
        threshold: Option<f32>,

        /// Minimum chunk size in characters
        #[arg(long = "min-chunk")]
        min_chunk: Option<usize>,

        /// Maximum chunk size in characters
        #[arg(long = "max-chunk")]
        max_chunk: Option<usize>,
    },

    /// Ingest every matching file under one or more directories.
    Dir {
        /// Directories to ingest
        paths: Vec<PathBuf>,

        /// Recurse into subdirectories
        #[arg(short = 'r', long)]
        recursive: bool,

        /// Only ingest files matching this glob pattern
        #[arg(short = 'p', long = "pattern")]
        pattern: Option<String>,

        /// Where archived chunks and the index are written (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reprocess even if the version map says a file is current
        #[arg(short, long)]
        force: bool,
    },

    /// Not implemented: downloading and ingesting remote URLs is an
    /// external collaborator this repo does not provide.
    Url {
        /// URLs that would be downloaded and ingested
        urls: Vec<String>,
    },
}
