use clap::Parser;
use keyhole_core::{Repository, TrustedSubnet};
use keyhole_gateway::cli::{StorageBackendArg, CLI};
use keyhole_gateway::{App, AppState};
use keyhole_generator::RandomGenerator;
use keyhole_shortener::ShortenerService;
use keyhole_storage::{FileRepository, MemoryRepository, PostgresRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = CLI::try_parse()?;

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        "starting gateway server"
    );

    let trusted_subnet = config
        .trusted_subnet
        .as_deref()
        .map(TrustedSubnet::parse)
        .transpose()?;

    match config.storage {
        StorageBackendArg::InMemory => {
            run_server(&config, trusted_subnet, MemoryRepository::new()).await?;
        }
        StorageBackendArg::File => {
            let file_path = config
                .file_path
                .clone()
                .ok_or("file path is required when storage backend is file")?;
            let repository = FileRepository::open(&file_path).await?;
            run_server(&config, trusted_subnet, repository).await?;
        }
        StorageBackendArg::Postgres => {
            let postgres_dsn = config
                .postgres_dsn
                .clone()
                .ok_or("postgres dsn is required when storage backend is postgres")?;
            let repository = PostgresRepository::connect(&postgres_dsn).await?;
            run_server(&config, trusted_subnet, repository).await?;
        }
    }

    Ok(())
}

async fn run_server<R: Repository>(
    config: &CLI,
    trusted_subnet: Option<TrustedSubnet>,
    repository: R,
) -> Result<(), Box<dyn std::error::Error>> {
    let repository = Arc::new(repository);
    let (service, pipeline) = ShortenerService::new(
        Arc::clone(&repository),
        Arc::new(RandomGenerator::new()),
        config.base_url.clone(),
    );
    let pipeline_handle = tokio::spawn(pipeline.run());

    // `serve` owns the last service clone, so whichever way it exits the
    // deletion channel closes and the pipeline drains out.
    let served = serve(config.listen_addr, trusted_subnet, service).await;
    let pipeline_joined = pipeline_handle.await;

    // The repository shuts down on every exit path, serve failures
    // included, before either error propagates.
    if let Err(err) = repository.shutdown().await {
        error!(%err, "repository shutdown failed");
    }
    served?;
    pipeline_joined?;
    info!("gateway server stopped");
    Ok(())
}

async fn serve<R: Repository>(
    listen_addr: SocketAddr,
    trusted_subnet: Option<TrustedSubnet>,
    service: ShortenerService<R>,
) -> std::io::Result<()> {
    let app = App::router(AppState::new(service, trusted_subnet));
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for the shutdown signal");
        return;
    }
    info!("shutdown signal received, stopping gateway server");
}
