//! `naming-server`: the directory tree, locking discipline, and
//! storage-server registry, reachable over the `Service` and
//! `Registration` RMI interfaces (spec.md §4.5, §6).

use std::net::SocketAddr;
use std::sync::Arc;

use dfs::naming::{NamingServer, RegistrationDispatch, ServiceDispatch};
use dfs::rmi::Skeleton;
use dfs::config::NamingServerArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = NamingServerArgs::load()?;
    let server = Arc::new(NamingServer::new());

    let service = Skeleton::new(
        ServiceDispatch(Arc::clone(&server)),
        SocketAddr::new(args.bind, args.client_port),
    );
    let registration = Skeleton::new(
        RegistrationDispatch(Arc::clone(&server)),
        SocketAddr::new(args.bind, args.registration_port),
    );

    let service_addr = service.start().await?;
    let registration_addr = registration.start().await?;
    tracing::info!(%service_addr, %registration_addr, "naming server ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    service.stop();
    registration.stop();
    Ok(())
}
