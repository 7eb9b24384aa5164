//! The server side of the RMI transport: a listening socket plus one
//! fresh worker per accepted connection (spec.md §4.2).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::error::RemoteError;
use crate::wire;

use super::{encode_err, encode_ok};

/// Implemented by a server's per-interface dispatch adaptor. Resolves
/// `(method, parameter_types)` against the declared interface and runs
/// the matching handler, returning its encoded result.
///
/// A request whose `(method, parameter_types)` does not match any
/// declared method must return `Err(RemoteError::MethodNotFound(..))`.
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    async fn dispatch(
        &self,
        method: &str,
        param_types: &[String],
        args: &[u8],
    ) -> Result<Vec<u8>, RemoteError>;
}

/// Hooks a skeleton invokes on listener/service/stop events. Default
/// hooks just log through `tracing`; callers may override any subset
/// with [`Skeleton::with_listen_error_hook`] and friends before
/// [`Skeleton::start`].
pub struct Hooks {
    /// Called when `accept` fails. Returns `true` to keep listening,
    /// `false` to give up and stop the skeleton.
    pub listen_error: Box<dyn Fn(&std::io::Error) -> bool + Send + Sync>,
    /// Called when a single request/reply exchange fails.
    pub service_error: Box<dyn Fn(&RemoteError) + Send + Sync>,
    /// Called once, when the skeleton has fully stopped. `None` for a
    /// normal (requested) stop, `Some(cause)` for a fatal listener
    /// error.
    pub stopped: Box<dyn Fn(Option<String>) + Send + Sync>,
}

impl Default for Hooks {
    fn default() -> Self {
        Hooks {
            listen_error: Box::new(|e| {
                warn!(error = %e, "RMI accept failed, continuing to listen");
                true
            }),
            service_error: Box::new(|e| {
                warn!(error = %e, "RMI call failed");
            }),
            stopped: Box::new(|cause| match cause {
                Some(cause) => warn!(%cause, "RMI skeleton stopped"),
                None => info!("RMI skeleton stopped"),
            }),
        }
    }
}

/// The server side of one remote interface. May be started at most
/// once; once stopped (or once a start attempt fails) it cannot be
/// restarted (spec.md §4.2, §4.6).
pub struct Skeleton<D: Dispatch> {
    dispatcher: Arc<D>,
    bind_addr: SocketAddr,
    hooks: Hooks,
    started: AtomicBool,
    unrestartable: AtomicBool,
    stop_signal: Notify,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl<D: Dispatch> Skeleton<D> {
    /// Builds a skeleton bound to `bind_addr` (use port `0` for an
    /// OS-assigned port, as storage servers do), with default hooks.
    pub fn new(dispatcher: D, bind_addr: SocketAddr) -> Arc<Self> {
        Self::with_hooks(dispatcher, bind_addr, Hooks::default())
    }

    /// Builds a skeleton with explicit listen-error/service-error/
    /// stopped hooks.
    pub fn with_hooks(dispatcher: D, bind_addr: SocketAddr, hooks: Hooks) -> Arc<Self> {
        Arc::new(Skeleton {
            dispatcher: Arc::new(dispatcher),
            bind_addr,
            hooks,
            started: AtomicBool::new(false),
            unrestartable: AtomicBool::new(false),
            stop_signal: Notify::new(),
            local_addr: Mutex::new(None),
        })
    }

    /// Starts listening and spawns the accept loop. Returns the actual
    /// bound address (useful when `bind_addr`'s port was `0`).
    pub async fn start(self: &Arc<Self>) -> Result<SocketAddr, RemoteError> {
        if self.unrestartable.load(Ordering::SeqCst) {
            return Err(RemoteError::ServerState(
                "skeleton previously failed to start or was stopped; cannot restart".into(),
            ));
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(RemoteError::ServerState("skeleton already started".into()));
        }

        let listener = match TcpListener::bind(self.bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.unrestartable.store(true, Ordering::SeqCst);
                return Err(RemoteError::ServerState(format!(
                    "failed to bind {}: {e}",
                    self.bind_addr
                )));
            }
        };
        let local_addr = listener.local_addr().map_err(|e| {
            RemoteError::ServerState(format!("failed to read bound address: {e}"))
        })?;
        *self.local_addr.lock().await = Some(local_addr);
        info!(addr = %local_addr, "RMI skeleton listening");

        let this = Arc::clone(self);
        tokio::spawn(async move { this.accept_loop(listener).await });

        Ok(local_addr)
    }

    /// The address actually bound by [`Skeleton::start`], once known.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Requests the skeleton stop. Idempotent; in-flight workers finish
    /// their current exchange.
    pub fn stop(&self) {
        self.unrestartable.store(true, Ordering::SeqCst);
        self.stop_signal.notify_one();
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            tokio::select! {
                _ = self.stop_signal.notified() => {
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((socket, peer)) => {
                            let this = Arc::clone(&self);
                            tokio::spawn(async move { this.serve_one(socket, peer).await });
                        }
                        Err(e) => {
                            if !(self.hooks.listen_error)(&e) {
                                self.unrestartable.store(true, Ordering::SeqCst);
                                (self.hooks.stopped)(Some(e.to_string()));
                                return;
                            }
                        }
                    }
                }
            }
        }
        (self.hooks.stopped)(None);
    }

    async fn serve_one(self: Arc<Self>, mut socket: TcpStream, peer: SocketAddr) {
        socket.set_nodelay(true).ok();

        let request = match wire::read_frame(&mut socket, wire::MAX_FRAME_LEN).await {
            Ok(bytes) => bytes,
            Err(e) => {
                (self.hooks.service_error)(&RemoteError::NetworkError(format!(
                    "reading request from {peer}: {e}"
                )));
                return;
            }
        };

        let mut cur = wire::Decoder::new(request.as_slice());
        let method = match wire::read_string(&mut cur) {
            Ok(m) => m,
            Err(e) => {
                (self.hooks.service_error)(&e);
                return;
            }
        };
        let param_types = match wire::read_vec(&mut cur, |d| wire::read_string(d)) {
            Ok(p) => p,
            Err(e) => {
                (self.hooks.service_error)(&e);
                return;
            }
        };
        let args = &request[cur.position() as usize..];

        debug!(%peer, %method, ?param_types, "RMI dispatch");
        let reply = match self.dispatcher.dispatch(&method, &param_types, args).await {
            Ok(payload) => encode_ok(&payload),
            Err(e) => {
                (self.hooks.service_error)(&e);
                encode_err(&e)
            }
        };

        if let Err(e) = wire::write_frame(&mut socket, &reply).await {
            (self.hooks.service_error)(&RemoteError::NetworkError(format!(
                "writing reply to {peer}: {e}"
            )));
        }
    }
}
