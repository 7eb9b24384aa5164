//! Hand-written dispatch adaptors plugging [`NamingServer`] into the
//! RMI skeleton for its two declared interfaces (spec.md §6): the
//! client-facing `Service` interface and the storage-server-only
//! `Registration` interface. Rust has no runtime reflection to match
//! the source's dynamic proxies, so each interface resolves
//! `(method, parameter_types)` by hand (spec.md §9).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::path::Path;
use crate::rmi::{Dispatch, ServerStubs};
use crate::wire;

use super::server::NamingServer;

fn method_not_found(method: &str, param_types: &[String]) -> RemoteError {
    RemoteError::MethodNotFound(format!("Service.{method}({param_types:?})"))
}

/// Adaptor for the naming server's client-facing `Service` interface,
/// bound to the well-known client port (6000 by default).
pub struct ServiceDispatch(pub Arc<NamingServer>);

#[async_trait]
impl Dispatch for ServiceDispatch {
    async fn dispatch(
        &self,
        method: &str,
        param_types: &[String],
        args: &[u8],
    ) -> Result<Vec<u8>, RemoteError> {
        let mut cur = wire::Decoder::new(args);
        match (method, param_types) {
            ("lock", [a, b]) if a == "Path" && b == "bool" => {
                let path = Path::decode(&mut cur)?;
                let exclusive = wire::read_bool(&mut cur)?;
                self.0.lock(&path, exclusive).await?;
                Ok(Vec::new())
            }
            ("unlock", [a, b]) if a == "Path" && b == "bool" => {
                let path = Path::decode(&mut cur)?;
                let exclusive = wire::read_bool(&mut cur)?;
                self.0.unlock(&path, exclusive).await?;
                Ok(Vec::new())
            }
            ("isDirectory", [a]) if a == "Path" => {
                let path = Path::decode(&mut cur)?;
                let result = self.0.is_directory(&path).await?;
                let mut out = Vec::new();
                wire::write_bool(&mut out, result);
                Ok(out)
            }
            ("list", [a]) if a == "Path" => {
                let path = Path::decode(&mut cur)?;
                let result = self.0.list(&path).await?;
                let mut out = Vec::new();
                wire::write_vec(&mut out, &result, |d, s| wire::write_string(d, s));
                Ok(out)
            }
            ("createFile", [a]) if a == "Path" => {
                let path = Path::decode(&mut cur)?;
                let result = self.0.create_file(&path).await?;
                let mut out = Vec::new();
                wire::write_bool(&mut out, result);
                Ok(out)
            }
            ("createDirectory", [a]) if a == "Path" => {
                let path = Path::decode(&mut cur)?;
                let result = self.0.create_directory(&path).await?;
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
            ("getStorage", [a]) if a == "Path" => {
                let path = Path::decode(&mut cur)?;
                let result = self.0.get_storage(&path).await?;
                let mut out = Vec::new();
                wire::write_string(&mut out, &result.endpoint().host);
                wire::write_u32(&mut out, result.endpoint().port as u32);
                Ok(out)
            }
            _ => Err(method_not_found(method, param_types)),
        }
    }
}

/// Adaptor for the `Registration` interface, bound to the well-known
/// registration port (6001 by default) and called exactly once by each
/// storage server at startup.
pub struct RegistrationDispatch(pub Arc<NamingServer>);

#[async_trait]
impl Dispatch for RegistrationDispatch {
    async fn dispatch(
        &self,
        method: &str,
        param_types: &[String],
        args: &[u8],
    ) -> Result<Vec<u8>, RemoteError> {
        let mut cur = wire::Decoder::new(args);
        match (method, param_types) {
            ("register", [a, b, c])
                if a == "StorageClientStub" && b == "StorageCommandStub" && c == "Vec<Path>" =>
            {
                let stubs = ServerStubs::decode(&mut cur)?;
                let files = wire::read_vec(&mut cur, |d| Path::decode(d))?;
                let duplicates = self.0.register(stubs.client, stubs.command, files).await?;
                let mut out = Vec::new();
                wire::write_vec(&mut out, &duplicates, |d, p| p.encode(d));
                Ok(out)
            }
            _ => Err(RemoteError::MethodNotFound(format!(
                "Registration.{method}({param_types:?})"
            ))),
        }
    }
}
