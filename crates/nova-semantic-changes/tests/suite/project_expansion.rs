use std::collections::BTreeSet;

use nova_semantic_changes::{LanguagePriorities, SemanticChangeEvent};
use nova_solution::{Document, DocumentId};

use crate::harness::{
    self, core_closure, Fixture, APP, APP_MAIN, CORE, DOCS, DOCS_MAIN, OTHER, TOOLS, TOOLS_MAIN,
    WIDGET, WIDGET_PART,
};

#[tokio::test(flavor = "current_thread")]
async fn untracked_request_covers_only_the_project() {
    let fixture = Fixture::new(harness::layered_solution());

    fixture.processor.enqueue_project(CORE, false);
    fixture.settle().await;

    assert_eq!(
        fixture.emitted_documents(),
        BTreeSet::from([WIDGET, WIDGET_PART, OTHER])
    );
}

#[tokio::test(flavor = "current_thread")]
async fn tracked_request_covers_transitive_dependents() {
    let fixture = Fixture::new(harness::layered_solution());

    fixture.processor.enqueue_project(CORE, true);
    fixture.settle().await;

    let emitted = fixture.emitted();
    assert_eq!(emitted.len(), 6, "one item per document: {emitted:?}");
    let documents: BTreeSet<_> = emitted.into_iter().map(|item| item.document).collect();
    assert_eq!(documents, core_closure());
}

#[tokio::test(flavor = "current_thread")]
async fn tracked_request_on_a_leaf_stays_on_the_leaf() {
    let fixture = Fixture::new(harness::layered_solution());

    fixture.processor.enqueue_project(TOOLS, true);
    fixture.settle().await;

    assert_eq!(fixture.emitted_documents(), BTreeSet::from([TOOLS_MAIN]));
}

#[tokio::test(flavor = "current_thread")]
async fn removed_project_is_a_silent_no_op() {
    let fixture = Fixture::new(harness::layered_solution());
    let mut events = fixture.processor.subscribe();

    fixture.processor.enqueue_project(APP, true);
    fixture
        .workspace
        .update(|solution| solution.without_project(APP));
    fixture.settle().await;

    assert!(fixture.emitted().is_empty());
    assert!(harness::drain_events(&mut events)
        .contains(&SemanticChangeEvent::ProjectDropped { project: APP }));

    // The pipeline keeps going.
    fixture.processor.enqueue_project(DOCS, false);
    fixture.settle().await;
    assert_eq!(fixture.emitted_documents(), BTreeSet::from([DOCS_MAIN]));
}

#[tokio::test(flavor = "current_thread")]
async fn removed_document_drops_its_change() {
    let fixture = Fixture::new(harness::layered_solution());
    let mut events = fixture.processor.subscribe();

    fixture.processor.enqueue_semantic_change(OTHER, None);
    fixture
        .workspace
        .update(|solution| solution.without_document(OTHER));
    fixture.settle().await;

    assert!(fixture.emitted().is_empty());
    assert!(harness::drain_events(&mut events)
        .contains(&SemanticChangeEvent::DocumentDropped { document: OTHER }));
}

#[tokio::test(flavor = "current_thread")]
async fn expansion_reads_the_solution_at_execution_time() {
    let fixture = Fixture::new(harness::layered_solution());
    let late = DocumentId::new(APP, 1);

    fixture.processor.enqueue_project(CORE, true);
    fixture.workspace.update(|solution| {
        solution
            .with_project_reference(DOCS, CORE)
            .with_document(Document::new(late, "Late.cs", "app/Late.cs"))
            .without_project(TOOLS)
    });
    fixture.settle().await;

    let emitted = fixture.emitted_documents();
    assert!(emitted.contains(&DOCS_MAIN), "{emitted:?}");
    assert!(emitted.contains(&late));
    assert!(!emitted.contains(&TOOLS_MAIN));
    assert!(emitted.contains(&APP_MAIN));
}

#[tokio::test(flavor = "current_thread")]
async fn work_items_carry_language_and_priority() {
    let fixture = Fixture::with_priorities(
        harness::layered_solution(),
        LanguagePriorities::new().with_low_priority_language("F#"),
    );

    fixture.processor.enqueue_project(APP, true);
    fixture.settle().await;

    let mut emitted = fixture.emitted();
    emitted.sort_by_key(|item| item.document);
    assert_eq!(emitted.len(), 2);
    assert_eq!(emitted[0].document, APP_MAIN);
    assert_eq!(emitted[0].language, "C#");
    assert!(!emitted[0].is_low_priority);
    assert_eq!(emitted[1].document, TOOLS_MAIN);
    assert_eq!(emitted[1].language, "F#");
    assert!(emitted[1].is_low_priority);
}
