use std::{sync::Arc, time::Duration};

use nova_scheduler::{
    run_idle_loop, AsyncOperationTracker, AsyncTask, CancellationToken, Cancelled,
    CoalescingQueue, OperationToken, Scheduler, TaskError,
};
use nova_solution::{Document, Project, ProjectId, Solution, Workspace};
use parking_lot::Mutex;

use crate::events::{CorrelationId, EventSender, SemanticChangeEvent};
use crate::{PriorityPolicy, SinkFull, WorkItem, WorkItemSink};

const SINK_RETRY_DELAY: Duration = Duration::from_millis(5);

pub(crate) struct PendingProjectRequest {
    needs_dependency_tracking: bool,
    correlation: CorrelationId,
    _token: OperationToken,
}

/// Documents selected by one project request.
#[derive(Debug, Default)]
struct Expansion {
    projects: usize,
    documents: Vec<(Arc<Project>, Arc<Document>)>,
}

/// Resolves `project` (and, with `with_dependents`, everything that transitively depends on it)
/// against `solution`, collecting every current document. Projects missing from the snapshot
/// contribute nothing.
fn expand(
    solution: &Solution,
    project: ProjectId,
    with_dependents: bool,
    token: &CancellationToken,
) -> Result<Expansion, Cancelled> {
    let mut targets = vec![project];
    if with_dependents {
        targets.extend(solution.dependency_graph().transitive_dependents(project));
    }

    let mut expansion = Expansion::default();
    for id in targets {
        Cancelled::check(token)?;
        let Some(project) = solution.project(id) else {
            continue;
        };
        expansion.projects += 1;
        expansion.documents.extend(
            project
                .documents()
                .map(|document| (Arc::clone(project), Arc::clone(document))),
        );
    }
    Ok(expansion)
}

/// Coalesces project-scoped requests and turns them into per-document work items.
pub(crate) struct ProjectProcessor {
    queue: CoalescingQueue<ProjectId, PendingProjectRequest>,
    workspace: Arc<Workspace>,
    priority: Arc<dyn PriorityPolicy>,
    // Every work item leaves through this lock.
    sink: Mutex<Box<dyn WorkItemSink>>,
    scheduler: Scheduler,
    operations: AsyncOperationTracker,
    events: EventSender,
    token: CancellationToken,
}

impl ProjectProcessor {
    pub(crate) fn new(
        workspace: Arc<Workspace>,
        priority: Arc<dyn PriorityPolicy>,
        sink: Box<dyn WorkItemSink>,
        scheduler: Scheduler,
        operations: AsyncOperationTracker,
        events: EventSender,
        token: CancellationToken,
    ) -> Self {
        Self {
            queue: CoalescingQueue::new(),
            workspace,
            priority,
            sink: Mutex::new(sink),
            scheduler,
            operations,
            events,
            token,
        }
    }

    pub(crate) fn start(self: &Arc<Self>, backoff: Duration) -> AsyncTask<()> {
        let this = Arc::clone(self);
        self.scheduler
            .spawn_io_with_token(self.token.clone(), move |token| async move {
                let executor = Arc::clone(&this);
                run_idle_loop(
                    "project-processor",
                    &this.queue,
                    backoff,
                    &token,
                    move |project, request| {
                        let executor = Arc::clone(&executor);
                        async move { executor.execute(project, request).await }
                    },
                )
                .await
            })
    }

    /// Requests re-analysis of every document of `project`, and with
    /// `needs_dependency_tracking` of every project depending on it.
    ///
    /// While a request for the project is pending, further requests are absorbed as-is: the
    /// pending request keeps its own tracking flag.
    pub(crate) fn enqueue(&self, project: ProjectId, needs_dependency_tracking: bool) {
        let correlation = self.events.next_correlation();
        let request = PendingProjectRequest {
            needs_dependency_tracking,
            correlation,
            _token: self.operations.begin("project-request"),
        };

        let coalesced = match self.queue.insert_if_absent(project, request) {
            Ok(()) => false,
            Err(rejected) => {
                drop(rejected);
                let pending_tracking = self
                    .queue
                    .inspect(&project, |pending| pending.needs_dependency_tracking);
                if needs_dependency_tracking && pending_tracking == Some(false) {
                    tracing::debug!(
                        target = "nova.semantic_changes",
                        project = %project,
                        "dependency tracking request absorbed by a pending untracked request"
                    );
                }
                true
            }
        };

        tracing::trace!(
            target = "nova.semantic_changes",
            project = %project,
            needs_dependency_tracking,
            coalesced,
            "project enqueued"
        );
        self.events.send(
            correlation,
            SemanticChangeEvent::ProjectEnqueued {
                project,
                needs_dependency_tracking,
                coalesced,
            },
        );
    }

    /// Emits a work item for `document` straight to the sink. While the sink reports itself full
    /// the item is held and offered again every [`SINK_RETRY_DELAY`].
    pub(crate) async fn enqueue_work_item(
        &self,
        project: &Project,
        document: &Document,
    ) -> Result<(), Cancelled> {
        let is_low_priority = self.priority.is_low_priority(project, document);
        let mut item = WorkItem::new(
            document.id(),
            Arc::clone(project.language()),
            is_low_priority,
            self.operations.begin("work-item"),
        );

        loop {
            Cancelled::check(&self.token)?;
            let offered = self.sink.lock().enqueue(item);
            let Err(SinkFull(rejected)) = offered else {
                return Ok(());
            };
            item = rejected;

            tracing::trace!(
                target = "nova.semantic_changes",
                document = %item.document(),
                "work item sink is full; retrying"
            );
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(Cancelled),
                _ = tokio::time::sleep(SINK_RETRY_DELAY) => {}
            }
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    async fn execute(&self, project: ProjectId, request: PendingProjectRequest) {
        let solution = self.workspace.current_solution();
        if solution.project(project).is_none() {
            tracing::debug!(
                target = "nova.semantic_changes",
                project = %project,
                "project was removed before its request was processed"
            );
            self.events.send(
                request.correlation,
                SemanticChangeEvent::ProjectDropped { project },
            );
            return;
        }

        let tracking = request.needs_dependency_tracking;
        let expansion = self
            .scheduler
            .spawn_background_with_token(self.token.child_token(), move |token| {
                expand(&solution, project, tracking, &token)
            })
            .join()
            .await;
        let expansion = match expansion {
            Ok(expansion) => expansion,
            Err(TaskError::Cancelled) => return,
            Err(TaskError::Panicked) => {
                tracing::error!(
                    target = "nova.semantic_changes",
                    project = %project,
                    "project expansion panicked; request dropped"
                );
                return;
            }
        };

        for (owner, document) in &expansion.documents {
            if self.enqueue_work_item(owner, document).await.is_err() {
                return;
            }
        }

        tracing::debug!(
            target = "nova.semantic_changes",
            project = %project,
            dependency_tracking = tracking,
            projects = expansion.projects,
            documents = expansion.documents.len(),
            "project request processed"
        );
        self.events.send(
            request.correlation,
            SemanticChangeEvent::ProjectProcessed {
                project,
                dependency_tracking: tracking,
                projects: expansion.projects,
                documents: expansion.documents.len(),
            },
        );
    }
}
