use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use nova_solution::{DocumentId, ProjectId};
use tokio::sync::broadcast;

use crate::Propagation;

/// Ties the events of one request together, from enqueue to processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticChangeEvent {
    DocumentEnqueued {
        document: DocumentId,
        has_hint: bool,
        /// The change was folded into an entry that was already pending.
        merged: bool,
    },
    DocumentProcessed {
        document: DocumentId,
        /// Whether the hint resolved to a symbol and drove the decision.
        hint_used: bool,
        propagation: Propagation,
    },
    /// The document was gone from the solution by the time its change was processed.
    DocumentDropped {
        document: DocumentId,
    },
    ProjectEnqueued {
        project: ProjectId,
        needs_dependency_tracking: bool,
        /// A request for the project was already pending; this one was absorbed.
        coalesced: bool,
    },
    ProjectProcessed {
        project: ProjectId,
        dependency_tracking: bool,
        projects: usize,
        documents: usize,
    },
    /// The project was gone from the solution by the time its request was processed.
    ProjectDropped {
        project: ProjectId,
    },
}

#[derive(Debug, Clone)]
pub struct SemanticChangeRecord {
    pub correlation: CorrelationId,
    pub at: Instant,
    pub event: SemanticChangeEvent,
}

pub type SemanticChangeReceiver = broadcast::Receiver<SemanticChangeRecord>;

/// Fire-and-forget publisher for [`SemanticChangeRecord`]s. Having no subscriber is fine.
#[derive(Clone)]
pub(crate) struct EventSender {
    tx: broadcast::Sender<SemanticChangeRecord>,
    next_id: Arc<AtomicU64>,
}

impl EventSender {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub(crate) fn subscribe(&self) -> SemanticChangeReceiver {
        self.tx.subscribe()
    }

    pub(crate) fn next_correlation(&self) -> CorrelationId {
        CorrelationId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn send(&self, correlation: CorrelationId, event: SemanticChangeEvent) {
        let _ = self.tx.send(SemanticChangeRecord {
            correlation,
            at: Instant::now(),
            event,
        });
    }
}
