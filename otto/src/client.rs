//! ClientBinding: which transaction (if any) a connected client has open,
//! grounded on `transactionManagers.go`'s client->transaction map, so a
//! multi-statement `BEGIN ... COMMIT` session survives across several
//! inline-protocol requests on the same connection.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::txn::txid::TxId;

pub type ClientId = u64;

pub struct ClientBinding {
    inner: RwLock<HashMap<ClientId, TxId>>,
}

impl ClientBinding {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    pub fn bind(&self, client: ClientId, tx: TxId) {
        self.inner.write().unwrap().insert(client, tx);
    }

    pub fn unbind(&self, client: ClientId) -> Option<TxId> {
        self.inner.write().unwrap().remove(&client)
    }

    pub fn current(&self, client: ClientId) -> Option<TxId> {
        self.inner.read().unwrap().get(&client).copied()
    }
}

impl Default for ClientBinding {
    fn default() -> Self {
        Self::new()
    }
}
