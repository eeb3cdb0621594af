use anyhow::Result;
use clap::Parser;

use ingestd::config::{Args, Config};
use ingestd::routes::build_router;
use ingestd::ws::ServerState;

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args)?;

    ingest_common::logger::init_logger(config.log_level, None)?;
    log::info!("configure: bind={} data_dir={:?}", config.bind_addr, config.data_dir);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let state = ServerState::new(config.data_dir, config.rotation_interval, config.upload).await;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    log::info!("ingest server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
