//! Replication/invalidation policy triggered by lock acquisitions on a
//! file (spec.md §4.5 "Replication trigger" / "Invalidation").
//!
//! Kept as a standalone policy object so the lock path itself
//! (`NamingServer::lock`) stays generic, per spec.md §9 ("factor them
//! into a single policy object invoked at the moment of successful
//! acquisition on a file node").

use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::error::RemoteResult;
use crate::path::Path;
use crate::rmi::ServerStubs;
use crate::tree::Tree;

/// Access-count threshold past which a shared acquisition triggers
/// replication.
pub const REPLICATION_THRESHOLD: u32 = 20;
/// Fraction of registered storage servers considered as new replication
/// targets.
pub const REPLICATION_FRACTION: f64 = 0.2;
/// Upper bound on the number of replicas a file may carry.
pub const REPLICA_CAP: usize = 20;

/// Runs on every successful shared acquisition of a file's lock.
/// Replication failures are logged and otherwise swallowed: replication
/// is best-effort and must never fail the triggering `lock` call
/// (spec.md §7).
pub async fn on_shared_access(tree: &Tree, registered: &[ServerStubs], path: &Path) {
    let crossed = match tree.note_shared_access(path, REPLICATION_THRESHOLD).await {
        Ok(crossed) => crossed,
        Err(e) => {
            warn!(%path, error = %e, "access counter update failed");
            return;
        }
    };
    if !crossed {
        return;
    }
    replicate(tree, registered, path).await;
}

async fn replicate(tree: &Tree, registered: &[ServerStubs], path: &Path) {
    let owner = match tree.owner(path).await {
        Ok(owner) => owner,
        Err(e) => {
            warn!(%path, error = %e, "replication skipped: no owner");
            return;
        }
    };
    let existing = match tree.replicas(path).await {
        Ok(replicas) => replicas,
        Err(e) => {
            warn!(%path, error = %e, "replication skipped: could not read replica set");
            return;
        }
    };
    if existing.len() >= REPLICA_CAP {
        return;
    }

    let mut candidates: Vec<&ServerStubs> = registered
        .iter()
        .filter(|s| **s != owner && !existing.contains(s))
        .collect();
    candidates.shuffle(&mut rand::thread_rng());

    let budget = (REPLICATION_FRACTION * REPLICATION_THRESHOLD as f64).ceil() as usize;
    let slots = budget.min(REPLICA_CAP.saturating_sub(existing.len()));

    for candidate in candidates.into_iter().take(slots) {
        match candidate.command.copy(path, &owner.client).await {
            Ok(true) => {
                if let Err(e) = tree.add_replica(path, candidate.clone()).await {
                    warn!(%path, error = %e, "replica copied but could not be recorded");
                } else {
                    info!(%path, target = %candidate.command.endpoint(), "replicated");
                }
            }
            Ok(false) => warn!(%path, target = %candidate.command.endpoint(), "replica copy refused"),
            Err(e) => warn!(%path, target = %candidate.command.endpoint(), error = %e, "replica copy failed"),
        }
    }
}

/// Runs on every successful exclusive acquisition of a file's lock:
/// unconditionally resets the access counter and invalidates every
/// replica, leaving the owner as the sole authoritative copy. A failed
/// invalidation aborts the triggering `lock` call with `ServerState`
/// (spec.md §7), leaving already-invalidated replicas removed.
pub async fn on_exclusive_access(tree: &Tree, path: &Path) -> RemoteResult<()> {
    if !tree.note_exclusive_access(path).await? {
        return Ok(());
    }
    let replicas = tree.replicas(path).await?;
    for replica in replicas {
        replica.command.delete(path).await.map_err(|e| {
            crate::error::RemoteError::ServerState(format!(
                "invalidating replica at {}: {e}",
                replica.command.endpoint()
            ))
        })?;
        tree.remove_replica(path, &replica).await?;
    }
    Ok(())
}
