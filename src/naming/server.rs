//! The naming server's core: hierarchical locking discipline, the
//! service and registration operations, and the registered
//! storage-server set (spec.md §4.5).

use std::collections::HashSet;

use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use crate::error::{RemoteError, RemoteResult};
use crate::path::Path;
use crate::rmi::{ServerStubs, StorageClientStub, StorageCommandStub};
use crate::tree::Tree;

use super::policy;

/// Insertion-ordered registered-server set plus a hash index for
/// membership checks (spec.md §9 "Registration set as insertion-
/// ordered").
#[derive(Default)]
struct Registered {
    order: Vec<ServerStubs>,
    index: HashSet<ServerStubs>,
}

pub struct NamingServer {
    tree: Tree,
    registered: Mutex<Registered>,
}

impl Default for NamingServer {
    fn default() -> Self {
        Self::new()
    }
}

impl NamingServer {
    pub fn new() -> Self {
        NamingServer { tree: Tree::new(), registered: Mutex::new(Registered::default()) }
    }

    /// Ancestors of `path` in root-to-leaf order, `path` itself last.
    fn ancestry(path: &Path) -> RemoteResult<Vec<Path>> {
        let mut chain = Vec::new();
        let mut prefix = Path::root();
        chain.push(prefix.clone());
        for component in path.components() {
            prefix = prefix.child(component)?;
            chain.push(prefix.clone());
        }
        Ok(chain)
    }

    async fn release_all(&self, acquired: &[(Path, bool)]) {
        for (p, mode) in acquired.iter().rev() {
            let lock = self.tree.lock_for(p).await;
            lock.release(*mode).await;
        }
    }

    async fn registered_snapshot(&self) -> Vec<ServerStubs> {
        self.registered.lock().await.order.clone()
    }

    /// Acquires locks from root down to `path` in the requested mode,
    /// all intermediate ancestors shared (spec.md §4.5 "Hierarchical
    /// locking discipline"), running the replication/invalidation
    /// policy once `path` itself is acquired.
    pub async fn lock(&self, path: &Path, exclusive: bool) -> RemoteResult<()> {
        let ancestry = Self::ancestry(path)?;
        let target_index = ancestry.len() - 1;
        let mut acquired: Vec<(Path, bool)> = Vec::with_capacity(ancestry.len());

        for (i, p) in ancestry.iter().enumerate() {
            let is_target = i == target_index;
            if !self.tree.contains(p).await {
                self.release_all(&acquired).await;
                return Err(RemoteError::FileNotFound(path.to_string()));
            }
            let mode = is_target && exclusive;
            let path_lock = self.tree.lock_for(p).await;
            path_lock.acquire(mode).await;
            acquired.push((p.clone(), mode));

            if is_target {
                if mode {
                    if let Err(e) = policy::on_exclusive_access(&self.tree, p).await {
                        self.release_all(&acquired).await;
                        return Err(e);
                    }
                } else {
                    let registered = self.registered_snapshot().await;
                    policy::on_shared_access(&self.tree, &registered, p).await;
                }
            }
        }
        Ok(())
    }

    /// Releases from `path` up to root, mirroring [`NamingServer::lock`].
    pub async fn unlock(&self, path: &Path, exclusive: bool) -> RemoteResult<()> {
        if !self.tree.contains(path).await {
            return Err(RemoteError::InvalidArgument(format!("unknown path: {path}")));
        }
        let ancestry = Self::ancestry(path)?;
        let target_index = ancestry.len() - 1;
        for (i, p) in ancestry.iter().enumerate().rev() {
            let mode = i == target_index && exclusive;
            let path_lock = self.tree.lock_for(p).await;
            path_lock.release(mode).await;
        }
        Ok(())
    }

    pub async fn is_directory(&self, path: &Path) -> RemoteResult<bool> {
        self.tree.is_directory(path).await
    }

    pub async fn list(&self, dir: &Path) -> RemoteResult<Vec<String>> {
        self.tree.list(dir).await
    }

    pub async fn create_file(&self, path: &Path) -> RemoteResult<bool> {
        if !self.tree.prepare_create_file(path).await? {
            return Ok(false);
        }
        let candidate = {
            let registered = self.registered.lock().await;
            registered.order.choose(&mut rand::thread_rng()).cloned()
        };
        let target = candidate
            .ok_or_else(|| RemoteError::ServerState("no registered storage servers".into()))?;
        let created = target.command.create(path).await?;
        if created {
            self.tree.insert_file(path, target).await?;
        }
        Ok(created)
    }

    pub async fn create_directory(&self, path: &Path) -> RemoteResult<bool> {
        self.tree.create_directory(path).await
    }

    /// Deletes every file under `path` (and `path` itself, if it is a
    /// file) from its owner and all replicas, then removes the subtree.
    /// Rejects the root. Returns `true` only if every owner/replica
    /// delete RPC succeeded; the subtree is removed from the tree
    /// either way, so a failed remote delete never leaves a replica
    /// with no local record of it.
    pub async fn delete(&self, path: &Path) -> RemoteResult<bool> {
        if path.is_root() {
            return Err(RemoteError::FileNotFound(path.to_string()));
        }
        let files = self.tree.file_descendants(path).await?;
        let mut all_succeeded = true;
        for (file_path, owner, replicas) in &files {
            if owner.command.delete(file_path).await.is_err() {
                all_succeeded = false;
            }
            for replica in replicas {
                if replica.command.delete(file_path).await.is_err() {
                    all_succeeded = false;
                }
            }
        }
        self.tree.remove_subtree(path).await?;
        Ok(all_succeeded)
    }

    pub async fn get_storage(&self, path: &Path) -> RemoteResult<StorageClientStub> {
        Ok(self.tree.owner(path).await?.client)
    }

    /// Registers a storage server's stub pair and the files it hosts.
    /// Rejects a stub pair already registered.
    pub async fn register(
        &self,
        client: StorageClientStub,
        command: StorageCommandStub,
        files: Vec<Path>,
    ) -> RemoteResult<Vec<Path>> {
        let stubs = ServerStubs::new(client, command);
        {
            let mut registered = self.registered.lock().await;
            if registered.index.contains(&stubs) {
                return Err(RemoteError::AlreadyRegistered(format!(
                    "{}",
                    stubs.client.endpoint()
                )));
            }
            registered.index.insert(stubs.clone());
            registered.order.push(stubs.clone());
        }
        Ok(self.tree.register_files(stubs, &files).await)
    }
}
