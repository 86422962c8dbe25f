//! Command trees served by the workers.

mod gcloud;
mod groundtruth;
mod storage;

pub use gcloud::{key_name, sa_email};
pub use groundtruth::{author_name, FALLBACK_AUTHOR};
pub use storage::STORAGE_THREADS_ENV;

use crate::admin::Admins;
use crate::config::{Config, WorkerKind};
use command_tree::{CommandTree, HandlerError, TreeError};
use ops_client::{OpsClient, OpsError};
use slack_client::SlackClient;
use std::sync::Arc;
use tracing::info;

/// Clients and settings shared by command handlers.
#[derive(Clone)]
pub struct Services {
    pub ops: OpsClient,
    pub slack: SlackClient,
    pub admins: Arc<Admins>,
    /// Storage thread count when neither `-n` nor the environment sets one
    pub storage_threads: i64,
    /// Project used when `--project` is not given
    pub default_project: String,
}

impl Services {
    pub fn from_config(config: &Config, ops: OpsClient, slack: SlackClient) -> Self {
        Self {
            ops,
            slack,
            admins: Arc::new(Admins::new(config.admins.ids())),
            storage_threads: config.storage.threads(),
            default_project: config.gcloud.project(),
        }
    }
}

/// Tree for a worker. The help worker gets every enabled root, in a fixed
/// order; the others get just their own root.
pub fn build_tree(config: &Config, services: &Services) -> Result<CommandTree, TreeError> {
    let mut tree = CommandTree::new();
    match config.worker.kind {
        WorkerKind::Storage => tree.register(storage::group(services))?,
        WorkerKind::Gcloud => tree.register(gcloud::group(services))?,
        WorkerKind::Gt => tree.register(groundtruth::group(services))?,
        WorkerKind::Help => {
            if config.storage.enabled() {
                tree.register(storage::group(services))?;
            }
            if config.gcloud.enabled() {
                tree.register(gcloud::group(services))?;
            }
            if config.groundtruth.enabled() {
                tree.register(groundtruth::group(services))?;
            }
        }
    }
    info!(
        roots = ?tree.root_names().collect::<Vec<_>>(),
        "Command tree ready"
    );
    Ok(tree)
}

pub(crate) fn ops_failed(e: OpsError) -> HandlerError {
    HandlerError::Operation(e.to_string())
}
