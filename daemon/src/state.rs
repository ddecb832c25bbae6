use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

use chaos_grid_orchestrator::Orchestrator;

/// Unique client identifier
pub type ClientId = u64;

/// Channel for sending events to a client
pub type ClientSender = mpsc::UnboundedSender<String>;

/// Daemon-wide shared state
pub struct DaemonState {
    /// The grid; shared by every client
    pub orchestrator: Arc<Orchestrator>,

    /// Client event senders (ClientId → sender)
    pub clients: RwLock<HashMap<ClientId, ClientSender>>,

    /// Next client ID counter
    next_client_id: Mutex<ClientId>,
}

impl DaemonState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            clients: RwLock::new(HashMap::new()),
            next_client_id: Mutex::new(1),
        }
    }

    /// Register a new client, returning its ID and event receiver
    pub async fn register_client(&self) -> (ClientId, mpsc::UnboundedReceiver<String>) {
        let mut id = self.next_client_id.lock().await;
        let client_id = *id;
        *id += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.write().await.insert(client_id, tx);

        (client_id, rx)
    }

    /// Unregister a client. Cells outlive connections, so nothing else is torn down.
    pub async fn unregister_client(&self, client_id: ClientId) {
        self.clients.write().await.remove(&client_id);
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Broadcast a message to all connected clients
    pub async fn broadcast_to_all_clients(&self, msg: String) {
        let clients = self.clients.read().await;
        for tx in clients.values() {
            let _ = tx.send(msg.clone());
        }
    }
}
