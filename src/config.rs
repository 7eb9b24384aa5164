//! CLI and TOML configuration for the two server binaries.
//!
//! Each binary accepts command-line flags for its well-known settings
//! (spec.md §4.6, §6) plus an optional `--config` TOML file; flags
//! override whatever the file sets. Neither server reads environment
//! variables (`DFSHOST`/`DFSCWD` are consumed only by the out-of-scope
//! CLI drivers, spec.md §6).

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;

use crate::naming::{DEFAULT_CLIENT_PORT, DEFAULT_REGISTRATION_PORT};

/// Configuration for the `naming-server` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "naming-server", about = "Naming server: directory tree and storage registry")]
pub struct NamingServerArgs {
    /// Address to bind both interfaces on.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port for the client-facing service interface.
    #[arg(long, default_value_t = DEFAULT_CLIENT_PORT)]
    pub client_port: u16,

    /// Port for the storage-server registration interface.
    #[arg(long, default_value_t = DEFAULT_REGISTRATION_PORT)]
    pub registration_port: u16,

    /// Optional TOML config file; CLI flags take precedence over it.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
struct NamingServerFile {
    bind: Option<IpAddr>,
    client_port: Option<u16>,
    registration_port: Option<u16>,
}

impl NamingServerArgs {
    /// Parses CLI flags, then layers in any `--config` file for fields
    /// left at their defaults.
    pub fn load() -> Result<Self> {
        let mut args = Self::parse();
        if let Some(path) = &args.config {
            let file = read_toml::<NamingServerFile>(path)?;
            if args.bind.is_unspecified() {
                if let Some(bind) = file.bind {
                    args.bind = bind;
                }
            }
            if args.client_port == DEFAULT_CLIENT_PORT {
                if let Some(port) = file.client_port {
                    args.client_port = port;
                }
            }
            if args.registration_port == DEFAULT_REGISTRATION_PORT {
                if let Some(port) = file.registration_port {
                    args.registration_port = port;
                }
            }
        }
        Ok(args)
    }
}

/// Configuration for the `storage-server` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "storage-server", about = "Storage server: byte-range file access over RMI")]
pub struct StorageServerArgs {
    /// Local filesystem root this server serves. Required, either here
    /// or in `--config`.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Host by which this server's stubs are reachable from the naming
    /// server and clients.
    #[arg(long, default_value = "127.0.0.1")]
    pub advertise_host: String,

    /// Naming server host. Required, either here or in `--config`.
    #[arg(long)]
    pub naming_host: Option<String>,

    /// Naming server registration port.
    #[arg(long, default_value_t = DEFAULT_REGISTRATION_PORT)]
    pub naming_registration_port: u16,

    /// Address to bind this server's two skeletons on; port 0 picks a
    /// free port for each.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Optional TOML config file; CLI flags take precedence over it.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
struct StorageServerFile {
    root: Option<PathBuf>,
    advertise_host: Option<String>,
    naming_host: Option<String>,
    naming_registration_port: Option<u16>,
    bind: Option<IpAddr>,
}

/// Fully resolved storage-server settings: [`StorageServerArgs`] with
/// its required fields checked present and its `--config` file, if
/// any, layered in.
pub struct StorageServerConfig {
    pub root: PathBuf,
    pub advertise_host: String,
    pub naming_host: String,
    pub naming_registration_port: u16,
    pub bind: IpAddr,
}

impl StorageServerArgs {
    pub fn load() -> Result<StorageServerConfig> {
        let mut args = Self::parse();
        let mut file = StorageServerFile::default();
        if let Some(path) = &args.config {
            file = read_toml(path)?;
        }

        if args.root.is_none() {
            args.root = file.root;
        }
        if args.advertise_host == "127.0.0.1" {
            if let Some(host) = file.advertise_host {
                args.advertise_host = host;
            }
        }
        if args.naming_host.is_none() {
            args.naming_host = file.naming_host;
        }
        if args.naming_registration_port == DEFAULT_REGISTRATION_PORT {
            if let Some(port) = file.naming_registration_port {
                args.naming_registration_port = port;
            }
        }
        if args.bind.is_unspecified() {
            if let Some(bind) = file.bind {
                args.bind = bind;
            }
        }

        let Some(root) = args.root else {
            bail!("missing --root (or `root` in --config)");
        };
        let Some(naming_host) = args.naming_host else {
            bail!("missing --naming-host (or `naming_host` in --config)");
        };
        Ok(StorageServerConfig {
            root,
            advertise_host: args.advertise_host,
            naming_host,
            naming_registration_port: args.naming_registration_port,
            bind: args.bind,
        })
    }
}

/// Reads and parses a TOML config file.
fn read_toml<T: for<'de> Deserialize<'de> + Default>(path: &PathBuf) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
