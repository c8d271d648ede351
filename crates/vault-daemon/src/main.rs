use clap::Parser;

use vault_daemon::app::App;
use vault_daemon::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = format!("vault_daemon={log_level},vault_queue={log_level},vault_watch={log_level}");
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .init();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "vaultkeep exited with an error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = vault_config::VaultConfig::load(cli.config.as_deref())?;

    // `file`/`dir` ingest directly against the processor, bypassing the
    // queue and its version map entirely, so `--force` is implicit and
    // `--output`/`--min-chunk`/`--max-chunk`/`--threshold` are the only
    // per-invocation overrides worth honoring here.
    match &cli.command {
        Commands::File { output, threshold, min_chunk, max_chunk, .. } => {
            if let Some(output) = output {
                config.data_path = output.clone();
            }
            if let Some(threshold) = threshold {
                config.chunking.similarity_threshold = *threshold;
            }
            if let Some(min_chunk) = min_chunk {
                config.chunking.min_chunk_size = *min_chunk;
            }
            if let Some(max_chunk) = max_chunk {
                config.chunking.max_chunk_size = *max_chunk;
            }
        }
        Commands::Dir { output, .. } => {
            if let Some(output) = output {
                config.data_path = output.clone();
            }
        }
        _ => {}
    }

    let app = App::bootstrap(config)?;

    match cli.command {
        Commands::Serve => app.serve().await,
        Commands::File { paths, .. } => {
            let mut failures = 0;
            for path in paths {
                if let Err(e) = app.ingest_file(&path).await {
                    failures += 1;
                    tracing::error!(path = %path.display(), error = %e, "failed to ingest file");
                }
            }
            if failures > 0 {
                anyhow::bail!("{failures} file(s) failed to ingest");
            }
            Ok(())
        }
        Commands::Dir { paths, recursive, pattern, .. } => {
            let mut total = 0;
            for path in paths {
                total += app.ingest_dir(&path, recursive, pattern.as_deref()).await?;
            }
            tracing::info!(count = total, "ingestion complete");
            Ok(())
        }
        Commands::Url { urls } => {
            anyhow::bail!(
                "downloading URLs is not supported by this build ({} url(s) given); fetch the content and use `file` instead",
                urls.len()
            )
        }
    }
}
