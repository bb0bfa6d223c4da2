use std::sync::Arc;

use nova_scheduler::OperationToken;
use nova_solution::DocumentId;

/// Why a document was handed to the analysis engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InvocationReason {
    SemanticChanged,
}

/// One document that must be re-analyzed.
///
/// The item carries the operation token of the work it represents; the token is released when
/// the consumer drops the item or calls [`WorkItem::complete`].
#[derive(Debug)]
pub struct WorkItem {
    document: DocumentId,
    language: Arc<str>,
    reason: InvocationReason,
    is_low_priority: bool,
    _token: OperationToken,
}

impl WorkItem {
    pub(crate) fn new(
        document: DocumentId,
        language: Arc<str>,
        is_low_priority: bool,
        token: OperationToken,
    ) -> Self {
        Self {
            document,
            language,
            reason: InvocationReason::SemanticChanged,
            is_low_priority,
            _token: token,
        }
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    pub fn language(&self) -> &Arc<str> {
        &self.language
    }

    pub fn reason(&self) -> InvocationReason {
        self.reason
    }

    pub fn is_low_priority(&self) -> bool {
        self.is_low_priority
    }

    /// Marks the item as handled.
    pub fn complete(self) {}
}

/// A sink could not take a work item right now. The item is handed back so it can be offered
/// again.
#[derive(Debug)]
pub struct SinkFull(pub WorkItem);

/// Downstream consumer of work items.
///
/// Emission is serialized by the project pipeline, so implementations see one caller at a time.
/// A sink that is temporarily at capacity returns [`SinkFull`]; the pipeline keeps the item and
/// retries until it is accepted or the pipeline shuts down.
pub trait WorkItemSink: Send {
    fn enqueue(&mut self, item: WorkItem) -> Result<(), SinkFull>;
}

impl WorkItemSink for async_channel::Sender<WorkItem> {
    fn enqueue(&mut self, item: WorkItem) -> Result<(), SinkFull> {
        match self.try_send(item) {
            Ok(()) => Ok(()),
            Err(async_channel::TrySendError::Full(item)) => Err(SinkFull(item)),
            Err(async_channel::TrySendError::Closed(item)) => {
                tracing::debug!(
                    target = "nova.semantic_changes",
                    document = %item.document(),
                    "work item receiver is gone; dropping item"
                );
                Ok(())
            }
        }
    }
}
