//! A storage server: file bytes on local disk, exposed over RMI, plus
//! the one-time startup registration handshake (spec.md §4.3).

mod dispatch;
mod server;

pub use dispatch::{ClientDispatch, CommandDispatch};
pub use server::StorageServer;
