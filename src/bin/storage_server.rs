//! `storage-server`: bytes on local disk, reachable over the `Client`
//! and `Command` RMI interfaces, registering itself with a naming
//! server once at startup (spec.md §4.3, §6).

use std::net::SocketAddr;
use std::sync::Arc;

use dfs::config::StorageServerArgs;
use dfs::rmi::{Endpoint, NamingRegistrationStub, Skeleton, StorageClientStub, StorageCommandStub};
use dfs::storage::{ClientDispatch, CommandDispatch, StorageServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = StorageServerArgs::load()?;
    let server = Arc::new(StorageServer::new(args.root));

    let client_skeleton = Skeleton::new(ClientDispatch(Arc::clone(&server)), SocketAddr::new(args.bind, 0));
    let command_skeleton =
        Skeleton::new(CommandDispatch(Arc::clone(&server)), SocketAddr::new(args.bind, 0));
    let client_addr = client_skeleton.start().await?;
    let command_addr = command_skeleton.start().await?;

    let client_stub = StorageClientStub::new(Endpoint::new(args.advertise_host.clone(), client_addr.port()));
    let command_stub = StorageCommandStub::new(Endpoint::new(args.advertise_host, command_addr.port()));
    let naming = NamingRegistrationStub::new(Endpoint::new(
        args.naming_host,
        args.naming_registration_port,
    ));

    server.register(client_stub, command_stub, &naming).await?;
    tracing::info!(%client_addr, %command_addr, root = %server.root().display(), "storage server registered");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    client_skeleton.stop();
    command_skeleton.stop();
    Ok(())
}
