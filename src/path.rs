//! Immutable absolute POSIX-style path values.
//!
//! A [`Path`] is an ordered sequence of non-empty components, none of
//! which contain `/` or `:`. It never retains a leading-slash string
//! directly; the string form is rebuilt on demand from the component
//! list so that two paths with equal components always compare equal.

use std::fmt;
use std::path::PathBuf;

use crate::error::{RemoteError, RemoteResult};
use crate::wire::{self, Decoder};

/// An absolute path in the naming server's logical directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    components: Vec<String>,
}

impl Path {
    /// The root path `/`.
    pub fn root() -> Self {
        Path { components: Vec::new() }
    }

    /// Parses a string beginning with `/`. Collapses runs of `/`.
    /// Rejects empty strings, strings containing `:`, and strings that
    /// do not start with `/`.
    pub fn parse(s: &str) -> RemoteResult<Self> {
        if s.is_empty() || !s.starts_with('/') {
            return Err(RemoteError::InvalidArgument(format!(
                "path must start with '/': {s:?}"
            )));
        }
        if s.contains(':') {
            return Err(RemoteError::InvalidArgument(format!(
                "path must not contain ':': {s:?}"
            )));
        }
        let components =
            s.split('/').filter(|c| !c.is_empty()).map(str::to_owned).collect::<Vec<_>>();
        Ok(Path { components })
    }

    /// Builds `parent / component`, rejecting an empty component or one
    /// containing `/` or `:`.
    pub fn child(&self, component: &str) -> RemoteResult<Self> {
        if component.is_empty() || component.contains('/') || component.contains(':') {
            return Err(RemoteError::InvalidArgument(format!(
                "invalid path component: {component:?}"
            )));
        }
        let mut components = self.components.clone();
        components.push(component.to_owned());
        Ok(Path { components })
    }

    /// True iff this is the root path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// The parent path. Fails with `InvalidArgument` on root.
    pub fn parent(&self) -> RemoteResult<Self> {
        if self.is_root() {
            return Err(RemoteError::InvalidArgument("root has no parent".into()));
        }
        let mut components = self.components.clone();
        components.pop();
        Ok(Path { components })
    }

    /// The last component. Fails with `InvalidArgument` on root.
    pub fn last(&self) -> RemoteResult<&str> {
        self.components.last().map(String::as_str).ok_or_else(|| {
            RemoteError::InvalidArgument("root has no last component".into())
        })
    }

    /// Iterates over the path's components in root-to-leaf order.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    /// True iff `other` is a prefix of `self` (including equality and
    /// `other` being root).
    pub fn is_subpath(&self, other: &Path) -> bool {
        other.components.len() <= self.components.len()
            && other.components.iter().zip(self.components.iter()).all(|(a, b)| a == b)
    }

    /// Maps this path to a host-filesystem path rooted under `root`.
    pub fn to_file(&self, root: &std::path::Path) -> PathBuf {
        let mut buf = root.to_path_buf();
        for component in &self.components {
            buf.push(component);
        }
        buf
    }

    /// Returns the set of paths to every regular file in the local
    /// directory tree rooted at `root`, each expressed as an absolute
    /// path in the logical tree. Traversal order is unspecified.
    pub fn list(root: &std::path::Path) -> std::io::Result<Vec<Path>> {
        let mut out = Vec::new();
        Self::list_into(root, &Path::root(), &mut out)?;
        Ok(out)
    }

    fn list_into(
        disk_dir: &std::path::Path,
        logical_dir: &Path,
        out: &mut Vec<Path>,
    ) -> std::io::Result<()> {
        let mut entries = std::fs::read_dir(disk_dir)?;
        while let Some(entry) = entries.next().transpose()? {
            let file_type = entry.file_type()?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let logical_child = logical_dir.child(&name).map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::InvalidData, "non-utf8 path component")
            })?;
            if file_type.is_dir() {
                Self::list_into(&entry.path(), &logical_child, out)?;
            } else if file_type.is_file() {
                out.push(logical_child);
            }
        }
        Ok(())
    }
}

impl Path {
    /// Encodes the path as its string form, length-prefixed.
    pub fn encode(&self, dest: &mut Vec<u8>) {
        wire::write_string(dest, &self.to_string());
    }

    /// Decodes a path previously written with [`Path::encode`].
    pub fn decode(src: &mut Decoder) -> RemoteResult<Path> {
        Path::parse(&wire::read_string(src)?)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_root() {
        let p = Path::parse("/").unwrap();
        assert!(p.is_root());
        assert_eq!(p.to_string(), "/");
    }

    #[test]
    fn collapses_repeated_slashes() {
        let a = Path::parse("/a//b///c").unwrap();
        let b = Path::parse("/a/b/c").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "/a/b/c");
    }

    #[test]
    fn rejects_missing_leading_slash() {
        assert!(Path::parse("a/b").is_err());
        assert!(Path::parse("").is_err());
    }

    #[test]
    fn rejects_colon() {
        assert!(Path::parse("/a:b").is_err());
    }

    #[test]
    fn parent_and_last() {
        let p = Path::parse("/a/b/c").unwrap();
        assert_eq!(p.last().unwrap(), "c");
        assert_eq!(p.parent().unwrap(), Path::parse("/a/b").unwrap());
        assert!(Path::root().parent().is_err());
        assert!(Path::root().last().is_err());
    }

    #[test]
    fn child_rejects_invalid_components() {
        let root = Path::root();
        assert!(root.child("").is_err());
        assert!(root.child("a/b").is_err());
        assert!(root.child("a:b").is_err());
        assert_eq!(root.child("a").unwrap(), Path::parse("/a").unwrap());
    }

    #[test]
    fn is_subpath() {
        let root = Path::root();
        let a = Path::parse("/a").unwrap();
        let ab = Path::parse("/a/b").unwrap();
        let ac = Path::parse("/a/c").unwrap();
        assert!(ab.is_subpath(&root));
        assert!(ab.is_subpath(&a));
        assert!(ab.is_subpath(&ab));
        assert!(!ab.is_subpath(&ac));
        assert!(!a.is_subpath(&ab));
    }

    #[test]
    fn parse_is_a_retract() {
        for s in ["/", "/a", "/a/b/c"] {
            let p = Path::parse(s).unwrap();
            let roundtrip = Path::parse(&p.to_string()).unwrap();
            assert_eq!(p, roundtrip);
        }
    }
}
