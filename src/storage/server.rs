//! The storage server's file-access and command surface, and its
//! startup registration sequence (spec.md §4.3).

use std::path::PathBuf;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::{RemoteError, RemoteResult};
use crate::path::Path;
use crate::rmi::{NamingRegistrationStub, StorageClientStub, StorageCommandStub};

/// A storage server's local state: the filesystem root it serves and
/// the stub pair clients/the naming server address it by, once known.
pub struct StorageServer {
    root: PathBuf,
}

impl StorageServer {
    /// Builds a server rooted at `root`. Does not touch the disk; call
    /// [`StorageServer::start`] to validate the root and register.
    pub fn new(root: PathBuf) -> Self {
        StorageServer { root }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Returns the length of the file at `path`.
    pub async fn size(&self, path: &Path) -> RemoteResult<u64> {
        let disk_path = path.to_file(&self.root);
        let metadata = fs::metadata(&disk_path)
            .await
            .map_err(|_| RemoteError::FileNotFound(path.to_string()))?;
        if metadata.is_dir() {
            return Err(RemoteError::FileNotFound(path.to_string()));
        }
        Ok(metadata.len())
    }

    /// Reads exactly `length` bytes starting at `offset`.
    pub async fn read(&self, path: &Path, offset: i64, length: i64) -> RemoteResult<Vec<u8>> {
        if offset < 0 || length < 0 {
            return Err(RemoteError::OutOfBounds(format!(
                "negative offset or length: offset={offset}, length={length}"
            )));
        }
        let size = self.size(path).await?;
        let end = offset as u64 + length as u64;
        if end > size {
            return Err(RemoteError::OutOfBounds(format!(
                "read [{offset}, {end}) exceeds size {size} of {path}"
            )));
        }

        let disk_path = path.to_file(&self.root);
        let mut file = fs::File::open(&disk_path).await.map_err(RemoteError::from)?;
        file.seek(std::io::SeekFrom::Start(offset as u64)).await.map_err(RemoteError::from)?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).await.map_err(RemoteError::from)?;
        Ok(buf)
    }

    /// Writes `data` at `offset`, extending the file (with zero-filled
    /// holes) if needed.
    pub async fn write(&self, path: &Path, offset: i64, data: &[u8]) -> RemoteResult<()> {
        if offset < 0 {
            return Err(RemoteError::OutOfBounds(format!("negative offset: {offset}")));
        }
        // size() also validates the path exists and is a file.
        self.size(path).await?;

        let disk_path = path.to_file(&self.root);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .open(&disk_path)
            .await
            .map_err(RemoteError::from)?;
        file.seek(std::io::SeekFrom::Start(offset as u64)).await.map_err(RemoteError::from)?;
        file.write_all(data).await.map_err(RemoteError::from)?;
        Ok(())
    }

    /// Creates an empty file at `path`, making parent directories as
    /// needed. Rejects the root path.
    pub async fn create(&self, path: &Path) -> RemoteResult<bool> {
        if path.is_root() {
            return Ok(false);
        }
        let disk_path = path.to_file(&self.root);
        if disk_path.exists() {
            return Ok(false);
        }
        if let Some(parent) = disk_path.parent() {
            if fs::create_dir_all(parent).await.is_err() {
                return Ok(false);
            }
        }
        match fs::OpenOptions::new().write(true).create_new(true).open(&disk_path).await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    /// Deletes a file, or recursively deletes a directory. Rejects the
    /// root.
    pub async fn delete(&self, path: &Path) -> RemoteResult<bool> {
        if path.is_root() {
            return Ok(false);
        }
        let disk_path = path.to_file(&self.root);
        let metadata = match fs::metadata(&disk_path).await {
            Ok(m) => m,
            Err(_) => return Ok(false),
        };
        let result = if metadata.is_dir() {
            fs::remove_dir_all(&disk_path).await
        } else {
            fs::remove_file(&disk_path).await
        };
        Ok(result.is_ok())
    }

    /// Fetches the full contents of `path` from `peer` and writes it
    /// locally, creating parent directories and truncating any
    /// existing file as needed.
    pub async fn copy(&self, path: &Path, peer: &StorageClientStub) -> RemoteResult<bool> {
        let size = peer.size(path).await?;
        let data = if size == 0 { Vec::new() } else { peer.read(path, 0, size as i64).await? };

        let disk_path = path.to_file(&self.root);
        if let Some(parent) = disk_path.parent() {
            fs::create_dir_all(parent).await.map_err(RemoteError::from)?;
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&disk_path)
            .await
            .map_err(RemoteError::from)?;
        file.write_all(&data).await.map_err(RemoteError::from)?;
        Ok(true)
    }

    /// Validates the local root, lists its current contents, and
    /// registers with the naming server. Deletes any path the naming
    /// server reports as a duplicate, then prunes the empty ancestor
    /// directories left behind (spec.md §4.3 "Registration startup").
    pub async fn register(
        &self,
        client: StorageClientStub,
        command: StorageCommandStub,
        naming: &NamingRegistrationStub,
    ) -> RemoteResult<()> {
        let metadata = fs::metadata(&self.root)
            .await
            .map_err(|_| RemoteError::FileNotFound(format!("local root {}", self.root.display())))?;
        if !metadata.is_dir() {
            return Err(RemoteError::FileNotFound(format!(
                "local root {} is not a directory",
                self.root.display()
            )));
        }

        let files = Path::list(&self.root).map_err(RemoteError::from)?;
        let duplicates = naming.register(&client, &command, &files).await?;

        for dup in duplicates {
            let disk_path = dup.to_file(&self.root);
            let _ = fs::remove_file(&disk_path).await;
            self.prune_ancestors(&disk_path).await;
        }
        Ok(())
    }

    /// Removes empty ancestor directories of `disk_path`, bottom-up, up
    /// to but not past the local root.
    async fn prune_ancestors(&self, disk_path: &std::path::Path) {
        let mut dir = disk_path.parent().map(|p| p.to_path_buf());
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(_) => break,
            };
            let is_empty = entries.next_entry().await.ok().flatten().is_none();
            if !is_empty || fs::remove_dir(&current).await.is_err() {
                break;
            }
            dir = current.parent().map(|p| p.to_path_buf());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[tokio::test]
    async fn create_then_size_and_read_write() {
        let dir = TempDir::new().unwrap();
        let server = StorageServer::new(dir.path().to_path_buf());

        assert!(server.create(&path("/f")).await.unwrap());
        assert!(!server.create(&path("/f")).await.unwrap());
        assert_eq!(server.size(&path("/f")).await.unwrap(), 0);

        server.write(&path("/f"), 0, b"test data").await.unwrap();
        assert_eq!(server.read(&path("/f"), 0, 9).await.unwrap(), b"test data");
        assert_eq!(server.size(&path("/f")).await.unwrap(), 9);

        server.write(&path("/f"), 10, b"test data").await.unwrap();
        assert_eq!(server.size(&path("/f")).await.unwrap(), 19);
    }

    #[tokio::test]
    async fn read_zero_length_on_empty_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let server = StorageServer::new(dir.path().to_path_buf());
        server.create(&path("/empty")).await.unwrap();
        assert_eq!(server.read(&path("/empty"), 0, 0).await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn read_past_eof_is_out_of_bounds() {
        let dir = TempDir::new().unwrap();
        let server = StorageServer::new(dir.path().to_path_buf());
        server.create(&path("/f")).await.unwrap();
        server.write(&path("/f"), 0, b"abc").await.unwrap();
        assert!(matches!(
            server.read(&path("/f"), 0, 10).await,
            Err(RemoteError::OutOfBounds(_))
        ));
    }

    #[tokio::test]
    async fn create_makes_parent_directories() {
        let dir = TempDir::new().unwrap();
        let server = StorageServer::new(dir.path().to_path_buf());
        assert!(server.create(&path("/a/b/c")).await.unwrap());
        assert!(dir.path().join("a").join("b").join("c").is_file());
    }

    #[tokio::test]
    async fn create_rejects_root() {
        let dir = TempDir::new().unwrap();
        let server = StorageServer::new(dir.path().to_path_buf());
        assert!(!server.create(&Path::root()).await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let server = StorageServer::new(dir.path().to_path_buf());
        server.create(&path("/a/b")).await.unwrap();
        assert!(server.delete(&path("/a")).await.unwrap());
        assert!(!dir.path().join("a").exists());
    }

    #[tokio::test]
    async fn prune_ancestors_stops_at_root() {
        let dir = TempDir::new().unwrap();
        let server = StorageServer::new(dir.path().to_path_buf());
        server.create(&path("/a/b/c")).await.unwrap();
        let disk_path = path("/a/b/c").to_file(&server.root);
        tokio::fs::remove_file(&disk_path).await.unwrap();
        server.prune_ancestors(&disk_path).await;
        assert!(!dir.path().join("a").exists());
        assert!(dir.path().exists());
    }
}
