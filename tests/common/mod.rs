use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use dfs::naming::{NamingServer, RegistrationDispatch, ServiceDispatch};
use dfs::path::Path;
use dfs::rmi::{
    Endpoint, NamingRegistrationStub, NamingServiceStub, Skeleton, StorageClientStub,
    StorageCommandStub,
};
use dfs::storage::{ClientDispatch, CommandDispatch, StorageServer};
use tempfile::TempDir;

fn local(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

/// A naming server bound to OS-assigned loopback ports, reachable
/// through real RMI calls for the lifetime of the test process.
pub struct Fixture {
    pub service: NamingServiceStub,
    pub registration: NamingRegistrationStub,
}

impl Fixture {
    pub async fn new() -> Self {
        let naming = Arc::new(NamingServer::new());

        let service_skeleton = Skeleton::new(ServiceDispatch(Arc::clone(&naming)), local(0));
        let registration_skeleton =
            Skeleton::new(RegistrationDispatch(Arc::clone(&naming)), local(0));
        let service_addr = service_skeleton.start().await.expect("start service skeleton");
        let registration_addr =
            registration_skeleton.start().await.expect("start registration skeleton");

        // Skeletons serve for as long as their Arc lives; leaking keeps
        // them alive for the rest of the test process without the
        // fixture needing to track join handles.
        std::mem::forget(service_skeleton);
        std::mem::forget(registration_skeleton);

        Fixture {
            service: NamingServiceStub::new(Endpoint::new("127.0.0.1", service_addr.port())),
            registration: NamingRegistrationStub::new(Endpoint::new(
                "127.0.0.1",
                registration_addr.port(),
            )),
        }
    }
}

/// A storage server running against a fresh temp directory, reachable
/// through real RMI calls, not yet registered with any naming server.
pub struct Storage {
    pub dir: TempDir,
    pub server: Arc<StorageServer>,
    pub client: StorageClientStub,
    pub command: StorageCommandStub,
}

impl Storage {
    /// Registers `files` (synthetic paths, not necessarily present on
    /// disk) under this server's stub pair and returns the duplicates
    /// the naming server reports.
    pub async fn register(&self, fixture: &Fixture, files: Vec<Path>) -> Vec<Path> {
        fixture.registration.register(&self.client, &self.command, &files).await.expect("registration RPC")
    }

    /// Runs the full startup registration handshake: lists this
    /// server's (possibly empty) local directory and registers it with
    /// `fixture`'s naming server.
    pub async fn join(&self, fixture: &Fixture) {
        self.server
            .register(self.client.clone(), self.command.clone(), &fixture.registration)
            .await
            .expect("startup registration");
    }
}

/// Starts a fresh storage server and its two skeletons, without
/// registering it anywhere.
pub async fn start_storage(_fixture: &Fixture) -> Storage {
    let dir = TempDir::new().expect("create storage temp dir");
    let server = Arc::new(StorageServer::new(dir.path().to_path_buf()));

    let client_skeleton = Skeleton::new(ClientDispatch(Arc::clone(&server)), local(0));
    let command_skeleton = Skeleton::new(CommandDispatch(Arc::clone(&server)), local(0));
    let client_addr = client_skeleton.start().await.expect("start client skeleton");
    let command_addr = command_skeleton.start().await.expect("start command skeleton");
    std::mem::forget(client_skeleton);
    std::mem::forget(command_skeleton);

    let client = StorageClientStub::new(Endpoint::new("127.0.0.1", client_addr.port()));
    let command = StorageCommandStub::new(Endpoint::new("127.0.0.1", command_addr.port()));
    Storage { dir, server, client, command }
}

pub fn path(s: &str) -> Path {
    Path::parse(s).expect("valid path")
}
