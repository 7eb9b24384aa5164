//! The naming server's in-memory directory tree (spec.md §3, §4.5).
//!
//! The tree itself only knows about nodes, ownership, replicas, and
//! access counters; it has no opinion on which storage server to pick
//! for a new file or on replication/invalidation policy; those live
//! in `crate::naming`. Structural reads and mutations are serialized by
//! a single short-held mutex over the whole tree, independent of the
//! per-path reader/writer locks handed out by [`Tree::lock_for`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use whirlwind::ShardMap;

use crate::error::{RemoteError, RemoteResult};
use crate::lock::PathLock;
use crate::path::Path;
use crate::rmi::ServerStubs;

enum NodeKind {
    Directory { children: HashMap<String, Node> },
    File { owner: ServerStubs, replicas: Vec<ServerStubs>, access_counter: u32 },
}

struct Node {
    path: Path,
    kind: NodeKind,
}

impl Node {
    fn directory(path: Path) -> Self {
        Node { path, kind: NodeKind::Directory { children: HashMap::new() } }
    }

    fn file(path: Path, owner: ServerStubs) -> Self {
        Node { path, kind: NodeKind::File { owner, replicas: Vec::new(), access_counter: 0 } }
    }

    fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }
}

fn find<'a>(node: &'a Node, path: &Path) -> Option<&'a Node> {
    let mut current = node;
    for component in path.components() {
        let children = match &current.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => return None,
        };
        current = children.get(component)?;
    }
    Some(current)
}

fn find_mut<'a>(node: &'a mut Node, path: &Path) -> Option<&'a mut Node> {
    let mut current = node;
    for component in path.components() {
        let children = match &mut current.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => return None,
        };
        current = children.get_mut(component)?;
    }
    Some(current)
}

/// Descends from `node` to `target`, creating directory nodes for any
/// missing component. Fails if an existing component along the way is
/// a file rather than a directory.
fn walk_create_dirs<'a>(node: &'a mut Node, target: &Path) -> Result<&'a mut Node, ()> {
    let mut current = node;
    let mut built = Path::root();
    for component in target.components() {
        built = built.child(component).map_err(|_| ())?;
        let children = match &mut current.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => return Err(()),
        };
        let next_path = built.clone();
        current = children.entry(component.to_owned()).or_insert_with(|| Node::directory(next_path));
    }
    Ok(current)
}

fn collect_files(node: &Node, out: &mut Vec<(Path, ServerStubs, Vec<ServerStubs>)>) {
    match &node.kind {
        NodeKind::File { owner, replicas, .. } => {
            out.push((node.path.clone(), owner.clone(), replicas.clone()));
        }
        NodeKind::Directory { children } => {
            for child in children.values() {
                collect_files(child, out);
            }
        }
    }
}

fn not_found(path: &Path) -> RemoteError {
    RemoteError::FileNotFound(path.to_string())
}

/// The naming server's directory tree plus its lazily-populated table
/// of per-path locks (spec.md §4.5 "State").
pub struct Tree {
    root: Mutex<Node>,
    locks: ShardMap<Path, Arc<PathLock>>,
    lock_creation: Mutex<()>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            root: Mutex::new(Node::directory(Path::root())),
            locks: ShardMap::new(),
            lock_creation: Mutex::new(()),
        }
    }

    /// Returns the lock for `path`, creating it on first use. The same
    /// path always maps to the same lock object for the life of the
    /// process (spec.md §3 invariant 7).
    pub async fn lock_for(&self, path: &Path) -> Arc<PathLock> {
        if let Some(existing) = self.locks.get(path).await {
            return existing;
        }
        let _guard = self.lock_creation.lock().await;
        if let Some(existing) = self.locks.get(path).await {
            return existing;
        }
        let created = Arc::new(PathLock::new());
        self.locks.insert(path.clone(), Arc::clone(&created)).await;
        created
    }

    /// Whether any node (file or directory) exists at `path`.
    pub async fn contains(&self, path: &Path) -> bool {
        let root = self.root.lock().await;
        find(&root, path).is_some()
    }

    pub async fn is_directory(&self, path: &Path) -> RemoteResult<bool> {
        let root = self.root.lock().await;
        let node = find(&root, path).ok_or_else(|| not_found(path))?;
        Ok(node.is_directory())
    }

    pub async fn list(&self, dir: &Path) -> RemoteResult<Vec<String>> {
        let root = self.root.lock().await;
        let node = find(&root, dir).ok_or_else(|| not_found(dir))?;
        match &node.kind {
            NodeKind::Directory { children } => Ok(children.keys().cloned().collect()),
            NodeKind::File { .. } => Err(not_found(dir)),
        }
    }

    /// Checks whether `path` may be created as a file: `Ok(false)`
    /// means root or already present (no storage RPC needed). Does not
    /// mutate the tree; the caller issues the storage server's
    /// `create` RPC before calling [`Tree::insert_file`].
    pub async fn prepare_create_file(&self, path: &Path) -> RemoteResult<bool> {
        if path.is_root() {
            return Ok(false);
        }
        let root = self.root.lock().await;
        let parent_path = path.parent().expect("non-root has a parent");
        let parent = find(&root, &parent_path).ok_or_else(|| not_found(path))?;
        let children = match &parent.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => return Err(not_found(path)),
        };
        let last = path.last().expect("non-root has a last component");
        Ok(!children.contains_key(last))
    }

    /// Inserts a file node at `path` owned by `owner`. Assumes
    /// [`Tree::prepare_create_file`] most recently returned `Ok(true)`
    /// for this path.
    pub async fn insert_file(&self, path: &Path, owner: ServerStubs) -> RemoteResult<()> {
        let mut root = self.root.lock().await;
        let parent_path = path.parent().expect("non-root has a parent");
        let last = path.last().expect("non-root has a last component").to_owned();
        let parent = find_mut(&mut root, &parent_path).ok_or_else(|| not_found(path))?;
        let children = match &mut parent.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => return Err(not_found(path)),
        };
        children.insert(last, Node::file(path.clone(), owner));
        Ok(())
    }

    /// Creates a directory node at `path`. `Ok(false)` for root or an
    /// already-existing entry; `Err(FileNotFound)` if the parent is
    /// missing or is a file.
    pub async fn create_directory(&self, path: &Path) -> RemoteResult<bool> {
        if path.is_root() {
            return Ok(false);
        }
        let mut root = self.root.lock().await;
        let parent_path = path.parent().expect("non-root has a parent");
        let last = path.last().expect("non-root has a last component").to_owned();
        let parent = find_mut(&mut root, &parent_path).ok_or_else(|| not_found(path))?;
        let children = match &mut parent.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => return Err(not_found(path)),
        };
        if children.contains_key(&last) {
            return Ok(false);
        }
        children.insert(last, Node::directory(path.clone()));
        Ok(true)
    }

    /// Every file under `path`, `path` included if it names a file
    /// itself, each with its current owner and replica set. Read-only;
    /// pair with [`Tree::remove_subtree`] once the caller has issued
    /// the matching `delete` RPCs.
    pub async fn file_descendants(
        &self,
        path: &Path,
    ) -> RemoteResult<Vec<(Path, ServerStubs, Vec<ServerStubs>)>> {
        let root = self.root.lock().await;
        let node = find(&root, path).ok_or_else(|| not_found(path))?;
        let mut out = Vec::new();
        collect_files(node, &mut out);
        Ok(out)
    }

    /// Removes `path` (file or directory, with its whole subtree) from
    /// its parent.
    pub async fn remove_subtree(&self, path: &Path) -> RemoteResult<()> {
        let mut root = self.root.lock().await;
        let parent_path = path.parent().expect("non-root has a parent");
        let last = path.last().expect("non-root has a last component").to_owned();
        let parent = find_mut(&mut root, &parent_path).ok_or_else(|| not_found(path))?;
        let children = match &mut parent.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => return Err(not_found(path)),
        };
        children.remove(&last).ok_or_else(|| not_found(path))?;
        Ok(())
    }

    /// The owning stub pair of the file at `path`.
    pub async fn owner(&self, path: &Path) -> RemoteResult<ServerStubs> {
        let root = self.root.lock().await;
        let node = find(&root, path).ok_or_else(|| not_found(path))?;
        match &node.kind {
            NodeKind::File { owner, .. } => Ok(owner.clone()),
            NodeKind::Directory { .. } => Err(not_found(path)),
        }
    }

    /// The current replica set of the file at `path`.
    pub async fn replicas(&self, path: &Path) -> RemoteResult<Vec<ServerStubs>> {
        let root = self.root.lock().await;
        let node = find(&root, path).ok_or_else(|| not_found(path))?;
        match &node.kind {
            NodeKind::File { replicas, .. } => Ok(replicas.clone()),
            NodeKind::Directory { .. } => Err(not_found(path)),
        }
    }

    pub async fn add_replica(&self, path: &Path, stub: ServerStubs) -> RemoteResult<()> {
        let mut root = self.root.lock().await;
        let node = find_mut(&mut root, path).ok_or_else(|| not_found(path))?;
        match &mut node.kind {
            NodeKind::File { owner, replicas, .. } => {
                if *owner != stub && !replicas.contains(&stub) {
                    replicas.push(stub);
                }
                Ok(())
            }
            NodeKind::Directory { .. } => Err(not_found(path)),
        }
    }

    pub async fn remove_replica(&self, path: &Path, stub: &ServerStubs) -> RemoteResult<()> {
        let mut root = self.root.lock().await;
        let node = find_mut(&mut root, path).ok_or_else(|| not_found(path))?;
        if let NodeKind::File { replicas, .. } = &mut node.kind {
            replicas.retain(|r| r != stub);
        }
        Ok(())
    }

    /// Increments `path`'s access counter if it names a file; a no-op
    /// on directories. Returns `true`, resetting the counter to zero,
    /// if the increment crossed `threshold`.
    pub async fn note_shared_access(&self, path: &Path, threshold: u32) -> RemoteResult<bool> {
        let mut root = self.root.lock().await;
        let node = find_mut(&mut root, path).ok_or_else(|| not_found(path))?;
        if let NodeKind::File { access_counter, .. } = &mut node.kind {
            *access_counter += 1;
            if *access_counter >= threshold {
                *access_counter = 0;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Resets `path`'s access counter if it names a file; a no-op on
    /// directories. Returns whether `path` names a file, so the caller
    /// knows whether replica invalidation applies.
    pub async fn note_exclusive_access(&self, path: &Path) -> RemoteResult<bool> {
        let mut root = self.root.lock().await;
        let node = find_mut(&mut root, path).ok_or_else(|| not_found(path))?;
        if let NodeKind::File { access_counter, .. } = &mut node.kind {
            *access_counter = 0;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Registers the files a storage server reports hosting. Returns
    /// the subset that collide with an existing path; the tree is left
    /// unaltered for those. Input order is preserved in the result.
    /// The root path is skipped silently.
    pub async fn register_files(&self, owner: ServerStubs, files: &[Path]) -> Vec<Path> {
        let mut root = self.root.lock().await;
        let mut duplicates = Vec::new();
        for path in files {
            if path.is_root() {
                continue;
            }
            let parent_path = path.parent().expect("non-root has a parent");
            let last = path.last().expect("non-root has a last component").to_owned();

            let parent = match walk_create_dirs(&mut root, &parent_path) {
                Ok(node) => node,
                Err(()) => {
                    duplicates.push(path.clone());
                    continue;
                }
            };
            let children = match &mut parent.kind {
                NodeKind::Directory { children } => children,
                NodeKind::File { .. } => {
                    duplicates.push(path.clone());
                    continue;
                }
            };
            if children.contains_key(&last) {
                duplicates.push(path.clone());
                continue;
            }
            children.insert(last, Node::file(path.clone(), owner.clone()));
        }
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rmi::{Endpoint, StorageClientStub, StorageCommandStub};

    fn stubs(port: u16) -> ServerStubs {
        ServerStubs::new(
            StorageClientStub::new(Endpoint::new("127.0.0.1".into(), port)),
            StorageCommandStub::new(Endpoint::new("127.0.0.1".into(), port + 1)),
        )
    }

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[tokio::test]
    async fn register_scenario_one() {
        let tree = Tree::new();
        let a = stubs(7000);
        let dup = tree
            .register_files(
                a.clone(),
                &[
                    path("/file"),
                    path("/directory/file"),
                    path("/directory/another_file"),
                    path("/another_directory/file"),
                ],
            )
            .await;
        assert!(dup.is_empty());

        let b = stubs(7100);
        let dup = tree
            .register_files(
                b,
                &[path("/file"), path("/directory/file"), path("/another_directory/another_file")],
            )
            .await;
        assert_eq!(dup, vec![path("/file"), path("/directory/file")]);
    }

    #[tokio::test]
    async fn register_shadow_rejection() {
        let tree = Tree::new();
        let a = stubs(7000);
        tree.register_files(a.clone(), &[path("/directory/file")]).await;

        let c = stubs(7200);
        let dup = tree.register_files(c, &[path("/directory"), path("/another_file")]).await;
        assert_eq!(dup, vec![path("/directory")]);
    }

    #[tokio::test]
    async fn register_root_is_ignored() {
        let tree = Tree::new();
        let d = stubs(7300);
        let dup = tree.register_files(d, &[path("/")]).await;
        assert!(dup.is_empty());
        assert!(tree.is_directory(&Path::root()).await.unwrap());
        assert!(tree.list(&Path::root()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_file_then_directory_check() {
        let tree = Tree::new();
        let owner = stubs(7400);
        assert!(tree.prepare_create_file(&path("/f")).await.unwrap());
        tree.insert_file(&path("/f"), owner).await.unwrap();
        assert!(!tree.is_directory(&path("/f")).await.unwrap());
        assert!(!tree.prepare_create_file(&path("/f")).await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_subtree() {
        let tree = Tree::new();
        let owner = stubs(7500);
        tree.register_files(owner, &[path("/dir/a"), path("/dir/b")]).await;
        let files = tree.file_descendants(&path("/dir")).await.unwrap();
        assert_eq!(files.len(), 2);
        tree.remove_subtree(&path("/dir")).await.unwrap();
        assert!(tree.is_directory(&path("/dir")).await.is_err());
    }

    #[tokio::test]
    async fn lock_for_is_stable_per_path() {
        let tree = Tree::new();
        let a = tree.lock_for(&path("/x")).await;
        let b = tree.lock_for(&path("/x")).await;
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn access_counter_crosses_threshold() {
        let tree = Tree::new();
        let owner = stubs(7600);
        tree.insert_file(&path("/f"), owner).await.unwrap();
        assert!(!tree.note_shared_access(&path("/f"), 2).await.unwrap());
        assert!(tree.note_shared_access(&path("/f"), 2).await.unwrap());
    }
}
