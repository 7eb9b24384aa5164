//! Client proxies for the naming server's two remote interfaces
//! (spec.md §6): the `Service` interface used by clients, and the
//! `Registration` interface used once by each storage server at
//! startup.

use crate::error::RemoteResult;
use crate::path::Path;
use crate::wire;

use super::storage_stub::{decode_storage_client, encode_storage_client};
use super::{call, Endpoint, StorageClientStub, StorageCommandStub};

/// Proxy for the naming server's client-facing `Service` interface.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NamingServiceStub {
    endpoint: Endpoint,
}

impl NamingServiceStub {
    pub fn new(endpoint: Endpoint) -> Self {
        NamingServiceStub { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub async fn lock(&self, path: &Path, exclusive: bool) -> RemoteResult<()> {
        let mut args = Vec::new();
        path.encode(&mut args);
        wire::write_bool(&mut args, exclusive);
        call(&self.endpoint, "lock", &["Path", "bool"], args).await?;
        Ok(())
    }

    pub async fn unlock(&self, path: &Path, exclusive: bool) -> RemoteResult<()> {
        let mut args = Vec::new();
        path.encode(&mut args);
        wire::write_bool(&mut args, exclusive);
        call(&self.endpoint, "unlock", &["Path", "bool"], args).await?;
        Ok(())
    }

    pub async fn is_directory(&self, path: &Path) -> RemoteResult<bool> {
        let mut args = Vec::new();
        path.encode(&mut args);
        let reply = call(&self.endpoint, "isDirectory", &["Path"], args).await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        wire::read_bool(&mut cur)
    }

    pub async fn list(&self, dir: &Path) -> RemoteResult<Vec<String>> {
        let mut args = Vec::new();
        dir.encode(&mut args);
        let reply = call(&self.endpoint, "list", &["Path"], args).await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        wire::read_vec(&mut cur, |d| wire::read_string(d))
    }

    pub async fn create_file(&self, path: &Path) -> RemoteResult<bool> {
        let mut args = Vec::new();
        path.encode(&mut args);
        let reply = call(&self.endpoint, "createFile", &["Path"], args).await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        wire::read_bool(&mut cur)
    }

    pub async fn create_directory(&self, path: &Path) -> RemoteResult<bool> {
        let mut args = Vec::new();
        path.encode(&mut args);
        let reply = call(&self.endpoint, "createDirectory", &["Path"], args).await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        wire::read_bool(&mut cur)
    }

    pub async fn delete(&self, path: &Path) -> RemoteResult<bool> {
        let mut args = Vec::new();
        path.encode(&mut args);
        let reply = call(&self.endpoint, "delete", &["Path"], args).await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        wire::read_bool(&mut cur)
    }

    pub async fn get_storage(&self, path: &Path) -> RemoteResult<StorageClientStub> {
        let mut args = Vec::new();
        path.encode(&mut args);
        let reply = call(&self.endpoint, "getStorage", &["Path"], args).await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        decode_storage_client(&mut cur)
    }
}

/// Proxy for the naming server's `Registration` interface, called
/// exactly once by each storage server on startup.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NamingRegistrationStub {
    endpoint: Endpoint,
}

impl NamingRegistrationStub {
    pub fn new(endpoint: Endpoint) -> Self {
        NamingRegistrationStub { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Registers a storage server's client/command stubs and the
    /// files it hosts. Returns the subset of `files` that duplicate an
    /// already-registered path; the caller must delete those locally.
    pub async fn register(
        &self,
        client: &StorageClientStub,
        command: &StorageCommandStub,
        files: &[Path],
    ) -> RemoteResult<Vec<Path>> {
        let mut args = Vec::new();
        encode_storage_client(client, &mut args);
        command.encode(&mut args);
        wire::write_vec(&mut args, files, |d, p| p.encode(d));
        let reply = call(
            &self.endpoint,
            "register",
            &["StorageClientStub", "StorageCommandStub", "Vec<Path>"],
            args,
        )
        .await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        wire::read_vec(&mut cur, |d| Path::decode(d))
    }
}
