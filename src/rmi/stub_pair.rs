//! A storage server's stub pair: its client-facing stub and its
//! command stub, identifying one remote storage-server process
//! (spec.md §3 "Server stub pair"). Equality is structural on both
//! stubs; no local state, no network access.

use crate::error::RemoteResult;
use crate::wire;

use super::storage_stub::{
    decode_storage_client, decode_storage_command, encode_storage_client,
};
use super::{StorageClientStub, StorageCommandStub};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerStubs {
    pub client: StorageClientStub,
    pub command: StorageCommandStub,
}

impl ServerStubs {
    pub fn new(client: StorageClientStub, command: StorageCommandStub) -> Self {
        ServerStubs { client, command }
    }

    pub fn encode(&self, dest: &mut Vec<u8>) {
        encode_storage_client(&self.client, dest);
        self.command.encode(dest);
    }

    pub fn decode(src: &mut wire::Decoder) -> RemoteResult<Self> {
        let client = decode_storage_client(src)?;
        let command = decode_storage_command(src)?;
        Ok(ServerStubs::new(client, command))
    }
}
