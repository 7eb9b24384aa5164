//! Dispatch adaptors plugging [`StorageServer`] into the RMI skeleton
//! for its two declared interfaces (spec.md §4.3, §6): the client
//! surface and the naming-server-only command surface.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::path::Path;
use crate::rmi::{Dispatch, StorageClientStub};
use crate::wire;

use super::server::StorageServer;

/// Adaptor for `size`/`read`/`write`, bound to an OS-assigned port.
pub struct ClientDispatch(pub Arc<StorageServer>);

#[async_trait]
impl Dispatch for ClientDispatch {
    async fn dispatch(
        &self,
        method: &str,
        param_types: &[String],
        args: &[u8],
    ) -> Result<Vec<u8>, RemoteError> {
        let mut cur = wire::Decoder::new(args);
        match (method, param_types) {
            ("size", [a]) if a == "Path" => {
                let path = Path::decode(&mut cur)?;
                let result = self.0.size(&path).await?;
                let mut out = Vec::new();
                wire::write_u64(&mut out, result);
                Ok(out)
            }
            ("read", [a, b, c]) if a == "Path" && b == "i64" && c == "i64" => {
                let path = Path::decode(&mut cur)?;
                let offset = wire::read_i64(&mut cur)?;
                let length = wire::read_i64(&mut cur)?;
                let result = self.0.read(&path, offset, length).await?;
                let mut out = Vec::new();
                wire::write_bytes(&mut out, &result);
                Ok(out)
            }
            ("write", [a, b, c]) if a == "Path" && b == "i64" && c == "bytes" => {
                let path = Path::decode(&mut cur)?;
                let offset = wire::read_i64(&mut cur)?;
                let data = wire::read_bytes(&mut cur)?;
                self.0.write(&path, offset, &data).await?;
                Ok(Vec::new())
            }
            _ => Err(RemoteError::MethodNotFound(format!("Storage.{method}({param_types:?})"))),
        }
    }
}

/// Adaptor for `create`/`delete`/`copy`, called only by the naming
/// server.
pub struct CommandDispatch(pub Arc<StorageServer>);

#[async_trait]
impl Dispatch for CommandDispatch {
    async fn dispatch(
        &self,
        method: &str,
        param_types: &[String],
        args: &[u8],
    ) -> Result<Vec<u8>, RemoteError> {
        let mut cur = wire::Decoder::new(args);
        match (method, param_types) {
            ("create", [a]) if a == "Path" => {
                let path = Path::decode(&mut cur)?;
                let result = self.0.create(&path).await?;
                let mut out = Vec::new();
                wire::write_bool(&mut out, result);
                Ok(out)
            }
            ("delete", [a]) if a == "Path" => {
                let path = Path::decode(&mut cur)?;
                let result = self.0.delete(&path).await?;
                let mut out = Vec::new();
                wire::write_bool(&mut out, result);
                Ok(out)
            }
            ("copy", [a, b]) if a == "Path" && b == "StorageClientStub" => {
                let path = Path::decode(&mut cur)?;
                let peer = StorageClientStub::decode(&mut cur)?;
                let result = self.0.copy(&path, &peer).await?;
                let mut out = Vec::new();
                wire::write_bool(&mut out, result);
                Ok(out)
            }
            _ => Err(RemoteError::MethodNotFound(format!("Command.{method}({param_types:?})"))),
        }
    }
}
