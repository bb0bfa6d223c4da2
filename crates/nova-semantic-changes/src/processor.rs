use std::sync::Arc;

use nova_scheduler::{AsyncOperationTracker, AsyncTask, CancellationToken, Scheduler, TaskError};
use nova_solution::{DeclarationPath, DocumentId, ProjectId, SemanticCache, Workspace};

use crate::document_processor::DocumentProcessor;
use crate::events::{EventSender, SemanticChangeReceiver};
use crate::project_processor::ProjectProcessor;
use crate::{PriorityPolicy, SemanticChangeConfig, WorkItemSink};

/// Collaborators the pipelines query or feed.
pub struct SemanticChangeServices {
    pub workspace: Arc<Workspace>,
    pub semantic_cache: Arc<dyn SemanticCache>,
    pub priority: Arc<dyn PriorityPolicy>,
    pub sink: Box<dyn WorkItemSink>,
}

/// Entry point of the semantic-change subsystem.
///
/// Owns a document pipeline that feeds a project pipeline. Both consumer loops run on the
/// scheduler's IO runtime until [`shutdown`](Self::shutdown) (or drop) cancels them.
pub struct SemanticChangeProcessor {
    documents: Arc<DocumentProcessor>,
    projects: Arc<ProjectProcessor>,
    operations: AsyncOperationTracker,
    events: EventSender,
    token: CancellationToken,
    loops: Vec<AsyncTask<()>>,
}

impl SemanticChangeProcessor {
    /// Starts both pipelines. Cancelling `shutdown` stops them as well.
    pub fn new(
        scheduler: Scheduler,
        config: &SemanticChangeConfig,
        services: SemanticChangeServices,
        shutdown: CancellationToken,
    ) -> Self {
        let token = shutdown.child_token();
        let operations = AsyncOperationTracker::new();
        let events = EventSender::new(config.event_channel_capacity);

        let projects = Arc::new(ProjectProcessor::new(
            Arc::clone(&services.workspace),
            services.priority,
            services.sink,
            scheduler.clone(),
            operations.clone(),
            events.clone(),
            token.clone(),
        ));
        let documents = Arc::new(DocumentProcessor::new(
            services.workspace,
            services.semantic_cache,
            Arc::clone(&projects),
            scheduler,
            operations.clone(),
            events.clone(),
            token.clone(),
        ));

        let loops = vec![
            documents.start(config.document_backoff()),
            projects.start(config.project_backoff()),
        ];
        tracing::debug!(
            target = "nova.semantic_changes",
            document_backoff_ms = config.document_backoff_ms,
            project_backoff_ms = config.project_backoff_ms,
            "semantic change processor started"
        );

        Self {
            documents,
            projects,
            operations,
            events,
            token,
            loops,
        }
    }

    /// Records a semantically significant edit of `document`. `changed` points at the edited
    /// declaration when the caller knows it.
    pub fn enqueue_semantic_change(&self, document: DocumentId, changed: Option<DeclarationPath>) {
        self.documents.enqueue(document, changed);
    }

    /// Requests re-analysis of every document of `project`, and with `needs_dependency_tracking`
    /// of every project that transitively depends on it.
    pub fn enqueue_project(&self, project: ProjectId, needs_dependency_tracking: bool) {
        self.projects.enqueue(project, needs_dependency_tracking);
    }

    pub fn pending_documents(&self) -> usize {
        self.documents.pending()
    }

    pub fn pending_projects(&self) -> usize {
        self.projects.pending()
    }

    /// Both pipelines have nothing pending. Work already dequeued may still be executing; use
    /// [`operations`](Self::operations) to wait for it.
    pub fn is_idle(&self) -> bool {
        self.documents.is_idle() && self.projects.is_idle()
    }

    pub fn has_any_work(&self) -> bool {
        !self.is_idle()
    }

    pub fn subscribe(&self) -> SemanticChangeReceiver {
        self.events.subscribe()
    }

    pub fn operations(&self) -> &AsyncOperationTracker {
        &self.operations
    }

    pub fn is_shut_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stops both pipelines. Entries still pending are never processed.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!(
                target = "nova.semantic_changes",
                pending_documents = self.pending_documents(),
                pending_projects = self.pending_projects(),
                "semantic change processor shutting down"
            );
        }
        self.token.cancel();
    }

    /// Stops both pipelines and waits for their loops to unwind.
    pub async fn shutdown_and_wait(mut self) {
        self.shutdown();
        for task in std::mem::take(&mut self.loops) {
            match task.join().await {
                Ok(()) | Err(TaskError::Cancelled) => {}
                Err(TaskError::Panicked) => tracing::error!(
                    target = "nova.semantic_changes",
                    "semantic change loop panicked"
                ),
            }
        }
    }
}

impl Drop for SemanticChangeProcessor {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
