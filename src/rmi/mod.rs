//! A minimal remote-method-invocation transport: dynamically usable
//! client proxies ("stubs") and multithreaded servers ("skeletons")
//! over a single TCP connection per call (spec.md §4.2).
//!
//! Every call frames three values onto the wire: the method name, its
//! parameter-type tokens, and the pre-encoded argument bytes. The
//! server resolves `(method name, parameter types)` against its
//! declared interface, invokes the matching handler, and frames back
//! either the encoded result or a [`RemoteError`].
//!
//! Generic reflection like the source's dynamic proxies has no
//! equivalent in Rust; per spec.md §9 ("Design Notes", "Dynamic proxies
//! for stubs") each interface gets its stub and skeleton dispatch
//! written by hand (`naming_stub.rs`, `storage_stub.rs`,
//! `naming::service::ServiceDispatch`, ...). Equality/hash/printable
//! form for a stub never touch the network: they compare the declared
//! interface (the stub's Rust type) and the endpoint only.

pub mod skeleton;
pub mod stub_pair;

mod naming_stub;
mod storage_stub;

pub use naming_stub::{NamingRegistrationStub, NamingServiceStub};
pub use skeleton::{Dispatch, Skeleton};
pub use storage_stub::{StorageClientStub, StorageCommandStub};
pub use stub_pair::ServerStubs;

use std::fmt;

use tokio::net::TcpStream;
use tracing::instrument;

use crate::error::{RemoteError, RemoteErrorTag, RemoteResult};
use crate::wire;

/// A `host:port` pair identifying a remote skeleton. Two stubs are
/// equal iff their endpoints are equal and they share a declared
/// interface (i.e. are the same Rust stub type), per spec.md §4.2.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Endpoint { host: host.into(), port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Performs one RMI call: connects, sends `(method, param_types, args)`,
/// reads back the reply, and returns the decoded result payload or the
/// [`RemoteError`] the server raised (declared or transport-level).
///
/// `args` must already hold the concatenation of each argument encoded
/// in declaration order; the callee knows how to decode them because
/// `(method, param_types)` uniquely identifies which handler applies.
#[instrument(level = "debug", skip(args))]
pub async fn call(
    endpoint: &Endpoint,
    method: &str,
    param_types: &[&str],
    args: Vec<u8>,
) -> RemoteResult<Vec<u8>> {
    let mut request = Vec::new();
    wire::write_string(&mut request, method);
    wire::write_vec(&mut request, param_types, |d, t| wire::write_string(d, t));
    request.extend_from_slice(&args);

    let mut stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|e| RemoteError::NetworkError(format!("connect to {endpoint}: {e}")))?;
    stream.set_nodelay(true).ok();

    wire::write_frame(&mut stream, &request)
        .await
        .map_err(|e| RemoteError::NetworkError(format!("write to {endpoint}: {e}")))?;

    let reply = wire::read_frame(&mut stream, wire::MAX_FRAME_LEN)
        .await
        .map_err(|e| RemoteError::NetworkError(format!("read from {endpoint}: {e}")))?;

    let mut cur = wire::Decoder::new(reply.as_slice());
    let ok = wire::read_bool(&mut cur)?;
    if ok {
        let rest = &reply[cur.position() as usize..];
        Ok(rest.to_vec())
    } else {
        let tag_num = wire::read_u32(&mut cur)?;
        let tag: RemoteErrorTag = num_traits::FromPrimitive::from_u32(tag_num)
            .ok_or_else(|| RemoteError::NetworkError("unknown error tag on wire".into()))?;
        let message = wire::read_string(&mut cur)?;
        Err(RemoteError::from_tag(tag, message))
    }
}

/// Encodes a successful reply payload: a leading `true` followed by the
/// already-encoded result bytes.
pub(crate) fn encode_ok(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    wire::write_bool(&mut out, true);
    out.extend_from_slice(payload);
    out
}

/// Encodes a failed reply: a leading `false`, the error tag, and its
/// message.
pub(crate) fn encode_err(err: &RemoteError) -> Vec<u8> {
    let mut out = Vec::new();
    wire::write_bool(&mut out, false);
    let tag_num: u32 = num_traits::ToPrimitive::to_u32(&err.tag()).unwrap();
    wire::write_u32(&mut out, tag_num);
    wire::write_string(&mut out, err.message());
    out
}
