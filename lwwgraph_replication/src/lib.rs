//! A deliberately minimal peer-exchange surface for [`lwwgraph_core`]
//! replicas.
//!
//! A [`Client`] owns a local [`Graph`] and forwards the operations it
//! produces to a [`Server`], which fans them back out to every other
//! registered client. Neither piece imposes ordering, delivery, or
//! liveness guarantees: the CRDT's convergence property holds once every
//! replica has received every operation at least once, by whatever means.
//! Transport is intentionally out of scope — channels stand in for "send
//! this batch of operations to a peer, somehow".

use lwwgraph_core::{Graph, Operation};
use smallvec::SmallVec;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use uuid::Uuid;

/// An inline batch of operations; sized for the common case of a single
/// local mutation without spilling to the heap.
pub type OperationBatch<T> = SmallVec<[Operation<T>; 4]>;

struct RegisteredClient<T> {
    id: Uuid,
    inbox: Sender<OperationBatch<T>>,
}

/// Centralizes updates from clients and relays them to every other
/// registered client.
pub struct Server<T> {
    clients: Vec<RegisteredClient<T>>,
}

impl<T> Default for Server<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Server<T> {
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
        }
    }

    /// Register a new client and return its id and the receiving half of
    /// its inbox. The caller is expected to build a [`Client`] from these.
    pub fn register_client(&mut self) -> (Uuid, Receiver<OperationBatch<T>>) {
        let id = Uuid::new_v4();
        let (inbox, outbox) = mpsc::channel();
        self.clients.push(RegisteredClient { id, inbox });
        (id, outbox)
    }

    /// Accept a batch of operations that originated at `origin` and
    /// forward them to every *other* registered client. Clients whose
    /// inbox has been dropped are silently unregistered.
    pub fn update(&mut self, origin: Uuid, ops: OperationBatch<T>)
    where
        T: Clone,
    {
        self.clients.retain(|client| {
            if client.id == origin {
                return true;
            }
            client.inbox.send(ops.clone()).is_ok()
        });
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

/// A client managing a local graph and sporadic communication with a
/// [`Server`]. Local mutations are applied to `graph` immediately; shipping
/// them to the server (so other clients see them) is a separate,
/// explicit step via [`Client::publish`].
pub struct Client<T, G> {
    id: Uuid,
    graph: G,
    inbox: Receiver<OperationBatch<T>>,
}

impl<T, G> Client<T, G> {
    pub fn new(id: Uuid, graph: G, inbox: Receiver<OperationBatch<T>>) -> Self {
        Self { id, graph, inbox }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    /// Ship a batch of locally-produced operations to the server so it can
    /// relay them to every other client.
    pub fn publish(&self, server: &mut Server<T>, ops: OperationBatch<T>)
    where
        T: Clone,
    {
        server.update(self.id, ops);
    }

    /// Apply every operation batch currently waiting in this client's
    /// inbox without blocking. Returns the number of operations applied.
    pub fn drain_updates(&mut self) -> usize
    where
        G: Graph<T>,
    {
        let mut applied = 0;
        loop {
            match self.inbox.try_recv() {
                Ok(batch) => {
                    for op in batch {
                        self.graph.apply(op);
                        applied += 1;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }
}
