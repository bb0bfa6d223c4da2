use std::collections::BTreeSet;
use std::sync::Arc;

use nova_scheduler::{CancellationToken, Scheduler, SchedulerConfig};
use nova_semantic_changes::{
    LanguagePriorities, SemanticChangeConfig, SemanticChangeProcessor, SemanticChangeServices,
    WorkItem, WorkItemSink,
};
use nova_solution::{Document, DocumentId, InMemorySemanticCache, Solution, Workspace};
use tokio::time::{sleep, timeout, Duration};

use crate::harness::{
    self, core_closure, Fixture, RecordingSink, APP_MAIN, CORE, DOCS, DOCS_MAIN, OTHER, WIDGET,
};

fn services(solution: Solution, sink: impl WorkItemSink + 'static) -> SemanticChangeServices {
    SemanticChangeServices {
        workspace: Arc::new(Workspace::new(solution)),
        semantic_cache: Arc::new(InMemorySemanticCache::new()),
        priority: Arc::new(LanguagePriorities::new()),
        sink: Box::new(sink),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn work_is_reported_until_both_pipelines_drain() {
    let fixture = Fixture::new(harness::layered_solution());
    assert!(fixture.processor.is_idle());

    fixture.processor.enqueue_semantic_change(WIDGET, None);
    assert!(fixture.processor.has_any_work());
    assert_eq!(fixture.processor.pending_documents(), 1);
    assert_eq!(fixture.processor.pending_projects(), 0);

    fixture.settle().await;

    assert!(fixture.processor.is_idle());
    assert!(!fixture.processor.has_any_work());
    assert_eq!(fixture.processor.operations().outstanding(), 0);
    assert_eq!(fixture.emitted_documents(), core_closure());
}

#[tokio::test(flavor = "current_thread")]
async fn shutdown_stops_both_pipelines() {
    let fixture = Fixture::new(harness::layered_solution());

    fixture.processor.enqueue_semantic_change(OTHER, None);
    fixture.processor.enqueue_project(DOCS, false);
    fixture.processor.shutdown();
    assert!(fixture.processor.is_shut_down());

    sleep(Duration::from_millis(50)).await;

    assert!(fixture.emitted().is_empty());
    assert_eq!(fixture.processor.pending_documents(), 1);
    assert_eq!(fixture.processor.pending_projects(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn cancelling_the_parent_token_stops_the_processor() {
    let fixture = Fixture::new(harness::layered_solution());

    fixture.shutdown.cancel();
    fixture.processor.enqueue_project(DOCS, false);
    sleep(Duration::from_millis(50)).await;

    assert!(fixture.processor.is_shut_down());
    assert!(fixture.emitted().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn shutdown_and_wait_returns_once_the_loops_stop() {
    let fixture = Fixture::new(harness::layered_solution());
    fixture.processor.enqueue_project(CORE, true);
    fixture.settle().await;

    tokio::time::timeout(
        Duration::from_secs(5),
        fixture.processor.shutdown_and_wait(),
    )
    .await
    .expect("loops stop after shutdown");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn edits_inside_the_backoff_window_wait_for_quiet() {
    let config = SemanticChangeConfig {
        document_backoff_ms: 100,
        project_backoff_ms: 100,
        ..SemanticChangeConfig::default()
    };
    let fixture = Fixture::with_config(harness::layered_solution(), Default::default(), config);

    for _ in 0..5 {
        fixture.processor.enqueue_semantic_change(DOCS_MAIN, None);
        sleep(Duration::from_millis(60)).await;
        assert!(fixture.emitted().is_empty(), "processed during the burst");
        assert_eq!(fixture.processor.pending_documents(), 1);
    }

    // Expansion runs on real threads; stop auto-advancing before waiting on it.
    tokio::time::resume();
    fixture.settle().await;
    assert_eq!(fixture.emitted_documents(), BTreeSet::from([DOCS_MAIN]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_lose_no_work() {
    let extra: Vec<DocumentId> = (10..40).map(|raw| DocumentId::new(DOCS, raw)).collect();
    let mut solution = harness::layered_solution();
    for &id in &extra {
        let raw = id.to_raw();
        solution = solution.with_document(Document::new(
            id,
            format!("Page{raw}.cs"),
            format!("docs/Page{raw}.cs"),
        ));
    }
    let fixture = Fixture::new(solution);

    std::thread::scope(|scope| {
        for chunk in extra.chunks(5) {
            let processor = &fixture.processor;
            scope.spawn(move || {
                for &document in chunk {
                    processor.enqueue_semantic_change(document, None);
                    processor.enqueue_project(document.project_id(), false);
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..20 {
                fixture.processor.enqueue_semantic_change(APP_MAIN, None);
            }
        });
    });
    fixture.settle().await;

    let emitted = fixture.emitted_documents();
    for document in &extra {
        assert!(emitted.contains(document), "{document} was never emitted");
    }
    assert!(emitted.contains(&APP_MAIN));
    assert!(fixture.processor.is_idle());
}

#[test]
fn processor_runs_on_a_scheduler_owned_runtime() {
    let scheduler = Scheduler::new(SchedulerConfig {
        background_threads: 1,
        io_threads: 1,
    });
    let runtime = scheduler.io_handle();
    let sink = RecordingSink::default();
    let processor = SemanticChangeProcessor::new(
        scheduler,
        &harness::fast_config(),
        services(harness::layered_solution(), sink.clone()),
        CancellationToken::new(),
    );

    processor.enqueue_project(DOCS, false);
    runtime.block_on(async {
        timeout(Duration::from_secs(5), processor.operations().wait_idle())
            .await
            .expect("pipelines did not settle");
    });

    let emitted: BTreeSet<_> = sink.take().into_iter().map(|item| item.document).collect();
    assert_eq!(emitted, BTreeSet::from([DOCS_MAIN]));
    runtime.block_on(processor.shutdown_and_wait());
}

#[tokio::test(flavor = "current_thread")]
async fn bounded_sink_receives_every_item() {
    let (tx, rx) = async_channel::bounded::<WorkItem>(1);
    let scheduler =
        Scheduler::new_with_io_handle(SchedulerConfig::default(), tokio::runtime::Handle::current());
    let processor = SemanticChangeProcessor::new(
        scheduler,
        &harness::fast_config(),
        services(harness::layered_solution(), tx),
        CancellationToken::new(),
    );

    processor.enqueue_semantic_change(WIDGET, None);
    let mut received = BTreeSet::new();
    while received.len() < core_closure().len() {
        let item = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("consumer starved")
            .expect("sender is alive");
        received.insert(item.document());
    }

    assert_eq!(received, core_closure());
    timeout(Duration::from_secs(5), processor.operations().wait_idle())
        .await
        .expect("pipelines did not settle");
    assert!(rx.is_empty());
}
