use std::sync::Arc;

use quicklab_db::{DbPool, TreeStore};
use quicklab_gitlab::Provisioner;
use quicklab_sync::TransactionReplayer;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the store wraps a pool and everything else is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: TreeStore,
    pub replayer: TransactionReplayer,
    pub provisioner: Arc<Provisioner>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, provisioner: Provisioner, config: ServerConfig) -> Self {
        let store = TreeStore::new(pool).with_mail_domain(config.ta_mail_domain.clone());
        Self {
            replayer: TransactionReplayer::new(store.clone()),
            store,
            provisioner: Arc::new(provisioner),
            config: Arc::new(config),
        }
    }
}
