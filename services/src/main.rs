use product_tables_services::{
    catalogue::PgCatalogueStorage, config::Config, database, routes, telemetry, version_info,
};
use std::net::{IpAddr, SocketAddr};
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config: Config = Config::init()?;

    telemetry::init_tracing(&config)?;

    print_build_info();

    info!(
        environment = %config.environment(),
        server_addr = %config.server_addr(),
        port = %config.port(),
        page_size = config.page_size(),
        attached_fields = ?config.attached_product_fields(),
        disabled_plugins = ?config.disabled_plugins(),
        read_only_plugins = ?config.read_only_plugins(),
        "Configuration loaded"
    );

    let pool = database::create_pool(&config).await?;
    database::run_migrations(&pool).await?;

    let route = routes(PgCatalogueStorage::new(pool), config.clone()).await;

    let addr = SocketAddr::from((config.server_addr().parse::<IpAddr>()?, config.port()));

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, route).await?;

    Ok(())
}

fn print_build_info() {
    info!("===========================================");
    info!("  Product Tables Services");
    info!("===========================================");
    info!("Version:      {}", version_info::build_version());
    info!("Build Date:   {}", version_info::build_date());
    info!("Build Commit: {}", version_info::build_commit());
    info!("Build Branch: {}", version_info::build_branch());
    info!("===========================================");
}
