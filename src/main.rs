mod cli;

use crate::cli::{Cli, Command, RepoCommand};
use clap::Parser;
use exn::ResultExt;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use tracker::error::{ErrorKind, Result};
use tracker::{database, worker};
use tracker_config::Config;
use tracker_dispatch::{Context, Dispatcher, RateLimiter};
use tracker_index::loader::HttpIndexLoader;
use tracker_store::{RepositoryDirectory, SqliteStore};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    config.database.dry_run |= cli.dry_run;
    init_logging(&config)?;

    let db = database::open(&config).await?;
    let store = SqliteStore::new(db.pool().clone(), config.database.dry_run);

    let result = match cli.command {
        Command::Run { repositories } => run(&config, store, repositories).await,
        Command::Repo(command) => repo(&store, command).await,
    };
    db.close().await;
    result
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log.filter).or_raise(|| ErrorKind::Logging)?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .or_raise(|| ErrorKind::Logging)
}

async fn run(config: &Config, store: SqliteStore, repositories: Vec<String>) -> Result<ExitCode> {
    let loader = HttpIndexLoader::new(config.index.timeout(), &config.index.user_agent).or_raise(|| ErrorKind::Index)?;
    let limiter = RateLimiter::new(config.dispatcher.scans_per_second).or_raise(|| ErrorKind::Dispatch)?;
    let shared = Arc::new(store.clone());
    let ctx = Context {
        directory: shared.clone(),
        digests: shared,
        loader: Arc::new(loader),
    };
    let (dispatcher, queue) = Dispatcher::new(ctx, Arc::new(limiter), config.dispatcher.queue_capacity);

    let cancel = CancellationToken::new();
    let signal = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; finishing in-flight work");
                cancel.cancel();
            }
        })
    };

    let dispatch = dispatcher.spawn(repositories, cancel);
    let drained = worker::drain(queue, &store, config.workers.count).await;
    let report = dispatch.await.or_raise(|| ErrorKind::Dispatch)?.or_raise(|| ErrorKind::Dispatch);
    signal.abort();
    let report = report?;

    tracing::info!(
        repositories = report.repositories,
        jobs = report.jobs(),
        processed = drained.processed,
        failed = drained.failed,
        retryable = report.retryable(),
        "Run finished"
    );
    let clean = report.failed() == 0 && report.panicked == 0 && drained.failed == 0 && !report.cancelled;
    Ok(if clean { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn repo(store: &SqliteStore, command: RepoCommand) -> Result<ExitCode> {
    match command {
        RepoCommand::Add { name, url } => {
            HttpIndexLoader::index_url(&url).or_raise(|| ErrorKind::Index)?;
            let repository = store.register_repository(&name, &url).await.or_raise(|| ErrorKind::Store)?;
            tracing::info!(repo = %repository.name, id = %repository.id, url = %repository.url, "Repository registered");
        },
        RepoCommand::Remove { name } => {
            if store.remove_repository(&name).await.or_raise(|| ErrorKind::Store)? {
                tracing::info!(repo = %name, "Repository removed");
            } else {
                tracing::warn!(repo = %name, "No such repository");
                return Ok(ExitCode::FAILURE);
            }
        },
        RepoCommand::List => {
            for repository in store.get_all_repositories().await.or_raise(|| ErrorKind::Store)? {
                println!("{}\t{}\t{}", repository.name, repository.url, repository.id);
            }
        },
    }
    Ok(ExitCode::SUCCESS)
}
