//! Client proxies for the storage server's two remote interfaces
//! (spec.md §4.3, §6): the client surface (`size`/`read`/`write`) and
//! the command surface (`create`/`delete`/`copy`), issued by the
//! naming server.

use crate::error::RemoteResult;
use crate::path::Path;
use crate::wire;

use super::{call, Endpoint};

/// Proxy for a storage server's client-facing surface.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageClientStub {
    endpoint: Endpoint,
}

impl StorageClientStub {
    pub fn new(endpoint: Endpoint) -> Self {
        StorageClientStub { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) fn encode(&self, dest: &mut Vec<u8>) {
        wire::write_string(dest, &self.endpoint.host);
        wire::write_u32(dest, self.endpoint.port as u32);
    }

    pub(crate) fn decode(src: &mut wire::Decoder) -> RemoteResult<Self> {
        let host = wire::read_string(src)?;
        let port = wire::read_u32(src)? as u16;
        Ok(StorageClientStub::new(Endpoint::new(host, port)))
    }

    /// Returns the length of the file at `path`. `FileNotFound` if
    /// absent or a directory.
    pub async fn size(&self, path: &Path) -> RemoteResult<u64> {
        let mut args = Vec::new();
        path.encode(&mut args);
        let reply = call(&self.endpoint, "size", &["Path"], args).await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        wire::read_u64(&mut cur)
    }

    /// Reads exactly `length` bytes starting at `offset`.
    pub async fn read(&self, path: &Path, offset: i64, length: i64) -> RemoteResult<Vec<u8>> {
        let mut args = Vec::new();
        path.encode(&mut args);
        wire::write_i64(&mut args, offset);
        wire::write_i64(&mut args, length);
        let reply = call(&self.endpoint, "read", &["Path", "i64", "i64"], args).await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        wire::read_bytes(&mut cur)
    }

    /// Writes `data` at `offset`, extending (with zero-filled holes) as
    /// needed.
    pub async fn write(&self, path: &Path, offset: i64, data: &[u8]) -> RemoteResult<()> {
        let mut args = Vec::new();
        path.encode(&mut args);
        wire::write_i64(&mut args, offset);
        wire::write_bytes(&mut args, data);
        call(&self.endpoint, "write", &["Path", "i64", "bytes"], args).await?;
        Ok(())
    }
}

/// Proxy for a storage server's administrative command surface, used
/// only by the naming server.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageCommandStub {
    endpoint: Endpoint,
}

impl StorageCommandStub {
    pub fn new(endpoint: Endpoint) -> Self {
        StorageCommandStub { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) fn encode(&self, dest: &mut Vec<u8>) {
        wire::write_string(dest, &self.endpoint.host);
        wire::write_u32(dest, self.endpoint.port as u32);
    }

    pub(crate) fn decode(src: &mut wire::Decoder) -> RemoteResult<Self> {
        let host = wire::read_string(src)?;
        let port = wire::read_u32(src)? as u16;
        Ok(StorageCommandStub::new(Endpoint::new(host, port)))
    }

    /// Creates an empty file at `path`, making parent directories as
    /// needed. Rejects the root path. `true` on success, `false` on a
    /// pre-existing conflict or I/O failure.
    pub async fn create(&self, path: &Path) -> RemoteResult<bool> {
        let mut args = Vec::new();
        path.encode(&mut args);
        let reply = call(&self.endpoint, "create", &["Path"], args).await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        wire::read_bool(&mut cur)
    }

    /// Deletes a file, or recursively deletes a directory. Rejects the
    /// root. `true` iff the target existed and was fully removed.
    pub async fn delete(&self, path: &Path) -> RemoteResult<bool> {
        let mut args = Vec::new();
        path.encode(&mut args);
        let reply = call(&self.endpoint, "delete", &["Path"], args).await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        wire::read_bool(&mut cur)
    }

    /// Fetches the full contents of `path` from `peer` and writes it
    /// locally, creating parent directories and truncating any
    /// existing file as needed.
    pub async fn copy(&self, path: &Path, peer: &StorageClientStub) -> RemoteResult<bool> {
        let mut args = Vec::new();
        path.encode(&mut args);
        peer.encode(&mut args);
        let reply = call(&self.endpoint, "copy", &["Path", "StorageClientStub"], args).await?;
        let mut cur = wire::Decoder::new(reply.as_slice());
        wire::read_bool(&mut cur)
    }
}

pub(crate) fn decode_storage_client(src: &mut wire::Decoder) -> RemoteResult<StorageClientStub> {
    StorageClientStub::decode(src)
}

pub(crate) fn decode_storage_command(src: &mut wire::Decoder) -> RemoteResult<StorageCommandStub> {
    StorageCommandStub::decode(src)
}

pub(crate) fn encode_storage_client(stub: &StorageClientStub, dest: &mut Vec<u8>) {
    stub.encode(dest);
}
