use std::{collections::BTreeSet, sync::Arc, time::Duration};

use nova_scheduler::{
    run_idle_loop, AsyncOperationTracker, AsyncTask, CancellationToken, Cancelled,
    CoalescingQueue, Enqueued, OperationToken, Scheduler, TaskError,
};
use nova_solution::{
    AssemblyIdentity, DeclarationPath, DocumentId, ProjectId, SemanticCache, Solution, Symbol,
    Workspace,
};

use crate::events::{CorrelationId, EventSender, SemanticChangeEvent};
use crate::project_processor::ProjectProcessor;
use crate::visibility::{classify, PropagationScope};

pub(crate) struct PendingChange {
    changed: Option<DeclarationPath>,
    correlation: CorrelationId,
    _token: OperationToken,
}

impl PendingChange {
    /// Folds a newer change for the same document into this one. Disagreeing hints cancel out.
    fn merge(&mut self, newer: PendingChange) {
        if self.changed != newer.changed {
            self.changed = None;
        }
        self.correlation = newer.correlation;
        // The superseded token is released here.
        self._token = newer._token;
    }
}

/// Coalesces per-document semantic edits and narrows each to the documents or projects that can
/// observe it.
pub(crate) struct DocumentProcessor {
    queue: CoalescingQueue<DocumentId, PendingChange>,
    workspace: Arc<Workspace>,
    semantic_cache: Arc<dyn SemanticCache>,
    projects: Arc<ProjectProcessor>,
    scheduler: Scheduler,
    operations: AsyncOperationTracker,
    events: EventSender,
    token: CancellationToken,
}

impl DocumentProcessor {
    pub(crate) fn new(
        workspace: Arc<Workspace>,
        semantic_cache: Arc<dyn SemanticCache>,
        projects: Arc<ProjectProcessor>,
        scheduler: Scheduler,
        operations: AsyncOperationTracker,
        events: EventSender,
        token: CancellationToken,
    ) -> Self {
        Self {
            queue: CoalescingQueue::new(),
            workspace,
            semantic_cache,
            projects,
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
                    "document-processor",
                    &this.queue,
                    backoff,
                    &token,
                    move |document, change| {
                        let executor = Arc::clone(&executor);
                        async move { executor.execute(document, change).await }
                    },
                )
                .await
            })
    }

    pub(crate) fn enqueue(&self, document: DocumentId, changed: Option<DeclarationPath>) {
        let correlation = self.events.next_correlation();
        let has_hint = changed.is_some();
        let change = PendingChange {
            changed,
            correlation,
            _token: self.operations.begin("semantic-change"),
        };

        let merged = self
            .queue
            .insert_or_merge(document, change, PendingChange::merge)
            == Enqueued::Merged;

        tracing::trace!(
            target = "nova.semantic_changes",
            document = %document,
            has_hint,
            merged,
            "semantic change enqueued"
        );
        self.events.send(
            correlation,
            SemanticChangeEvent::DocumentEnqueued {
                document,
                has_hint,
                merged,
            },
        );
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    async fn execute(&self, document: DocumentId, change: PendingChange) {
        if Cancelled::check(&self.token).is_err() {
            return;
        }

        let solution = self.workspace.current_solution();
        if solution.document(document).is_none() {
            tracing::debug!(
                target = "nova.semantic_changes",
                document = %document,
                "document was removed before its change was processed"
            );
            self.events.send(
                change.correlation,
                SemanticChangeEvent::DocumentDropped { document },
            );
            return;
        }

        let symbol = change
            .changed
            .as_ref()
            .and_then(|path| self.resolve_hint(document, path));
        let hint_used = symbol.is_some();
        let scope = symbol
            .as_ref()
            .map(classify)
            .unwrap_or(PropagationScope::Unrestricted);
        let propagation = scope.propagation();

        let result = match scope {
            PropagationScope::Local { anchor } => {
                self.propagate_to_declarations(&solution, document, &anchor)
                    .await
            }
            PropagationScope::Assembly { assembly } => {
                self.propagate_to_assembly(solution, document.project_id(), assembly)
                    .await
            }
            PropagationScope::Unrestricted => {
                self.projects.enqueue(document.project_id(), true);
                Ok(())
            }
        };
        if result.is_err() {
            return;
        }

        tracing::debug!(
            target = "nova.semantic_changes",
            document = %document,
            hint_used,
            propagation = ?propagation,
            "semantic change processed"
        );
        self.events.send(
            change.correlation,
            SemanticChangeEvent::DocumentProcessed {
                document,
                hint_used,
                propagation,
            },
        );
    }

    /// Resolves the hint against already-computed semantic state only. `None` whenever any step
    /// misses.
    fn resolve_hint(&self, document: DocumentId, path: &DeclarationPath) -> Option<Arc<Symbol>> {
        let model = self.semantic_cache.cached_semantic_model(document)?;
        let node = model.resolve_declaration(path)?;
        model.declared_symbol(node)
    }

    /// Emits work items for every other document of the origin project that declares `anchor`.
    async fn propagate_to_declarations(
        &self,
        solution: &Solution,
        origin: DocumentId,
        anchor: &Symbol,
    ) -> Result<(), Cancelled> {
        let project_id = origin.project_id();
        let Some(project) = solution.project(project_id) else {
            return Ok(());
        };

        let targets: BTreeSet<DocumentId> = anchor
            .source_locations()
            .filter_map(|location| solution.document_for_location(location, project_id))
            .map(|document| document.id())
            .filter(|&id| id != origin)
            .collect();

        for id in targets {
            if let Some(document) = project.document(id) {
                self.projects.enqueue_work_item(project, document).await?;
            }
        }
        Ok(())
    }

    /// Requests full processing of the origin project and of every transitive dependent that can
    /// see `assembly`'s internals.
    async fn propagate_to_assembly(
        &self,
        solution: Arc<Solution>,
        origin: ProjectId,
        assembly: Arc<AssemblyIdentity>,
    ) -> Result<(), Cancelled> {
        let cache = Arc::clone(&self.semantic_cache);
        let visible = self
            .scheduler
            .spawn_background_with_token(self.token.child_token(), move |token| {
                projects_seeing_internals(&solution, &*cache, origin, &assembly, &token)
            })
            .join()
            .await;

        let visible = match visible {
            Ok(visible) => visible,
            Err(TaskError::Cancelled) => return Err(Cancelled),
            Err(TaskError::Panicked) => {
                // Widen rather than lose the change.
                tracing::error!(
                    target = "nova.semantic_changes",
                    project = %origin,
                    "assembly propagation panicked; falling back to dependency tracking"
                );
                self.projects.enqueue(origin, true);
                return Ok(());
            }
        };

        for project in visible {
            Cancelled::check(&self.token)?;
            self.projects.enqueue(project, false);
        }
        Ok(())
    }
}

/// `origin` plus its transitive dependents, minus the ones whose materialized compilation proves
/// they cannot see `assembly`'s internals. Projects without a cached compilation are kept.
fn projects_seeing_internals(
    solution: &Solution,
    cache: &dyn SemanticCache,
    origin: ProjectId,
    assembly: &AssemblyIdentity,
    token: &CancellationToken,
) -> Result<Vec<ProjectId>, Cancelled> {
    let graph = solution.dependency_graph();
    let candidates = std::iter::once(origin).chain(graph.transitive_dependents(origin));

    let mut visible = Vec::new();
    for project in candidates {
        Cancelled::check(token)?;
        if solution.project(project).is_none() {
            continue;
        }
        if let Some(compilation) = cache.cached_compilation(project) {
            if !compilation
                .assembly()
                .is_same_assembly_or_has_friend_access_to(assembly)
            {
                tracing::trace!(
                    target = "nova.semantic_changes",
                    project = %project,
                    assembly = %assembly,
                    "dependent cannot see internals; skipped"
                );
                continue;
            }
        }
        visible.push(project);
    }
    Ok(visible)
}
