use std::collections::BTreeSet;
use std::sync::Arc;

use nova_semantic_changes::{Propagation, SemanticChangeEvent};
use nova_solution::{Accessibility, DeclarationTable, Symbol, SymbolKind};

use crate::harness::{
    self, core_closure, method, path, widget, Fixture, APP, APP_MAIN, CORE, OTHER, TESTS,
    TESTS_MAIN, TOOLS_MAIN, WIDGET, WIDGET_PART,
};

#[tokio::test(flavor = "current_thread")]
async fn private_member_change_reaches_only_other_declarations_of_its_type() {
    let fixture = Fixture::new(harness::layered_solution());
    let widget = widget(Accessibility::Public);
    fixture.declare(WIDGET, path(1), method(Accessibility::Private, &widget));

    fixture.processor.enqueue_semantic_change(WIDGET, Some(path(1)));
    fixture.settle().await;

    let emitted = fixture.emitted();
    assert_eq!(emitted.len(), 1, "{emitted:?}");
    assert_eq!(emitted[0].document, WIDGET_PART);
    assert_eq!(fixture.processor.pending_projects(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn private_type_change_uses_the_type_declarations() {
    let fixture = Fixture::new(harness::layered_solution());
    fixture.declare(WIDGET_PART, path(0), widget(Accessibility::Private));

    fixture
        .processor
        .enqueue_semantic_change(WIDGET_PART, Some(path(0)));
    fixture.settle().await;

    assert_eq!(fixture.emitted_documents(), BTreeSet::from([WIDGET]));
}

#[tokio::test(flavor = "current_thread")]
async fn private_member_with_a_single_declaration_emits_nothing() {
    let fixture = Fixture::new(harness::layered_solution());
    let mut events = fixture.processor.subscribe();
    let helper = Arc::new(
        Symbol::new(
            "Helper",
            SymbolKind::NamedType,
            Accessibility::Public,
            harness::core_assembly(),
        )
        .with_source_location("core/Other.cs", 0..10),
    );
    fixture.declare(OTHER, path(2), method(Accessibility::Private, &helper));

    fixture.processor.enqueue_semantic_change(OTHER, Some(path(2)));
    fixture.settle().await;

    assert!(fixture.emitted().is_empty());
    assert!(harness::drain_events(&mut events).contains(
        &SemanticChangeEvent::DocumentProcessed {
            document: OTHER,
            hint_used: true,
            propagation: Propagation::Local,
        }
    ));
}

#[tokio::test(flavor = "current_thread")]
async fn public_type_change_reaches_the_dependents_closure() {
    let fixture = Fixture::new(harness::layered_solution());
    fixture.declare(WIDGET, path(0), widget(Accessibility::Public));

    fixture.processor.enqueue_semantic_change(WIDGET, Some(path(0)));
    fixture.settle().await;

    assert_eq!(fixture.emitted_documents(), core_closure());
}

#[tokio::test(flavor = "current_thread")]
async fn public_member_of_public_type_reaches_the_dependents_closure() {
    let fixture = Fixture::new(harness::layered_solution());
    let widget = widget(Accessibility::Public);
    fixture.declare(WIDGET, path(1), method(Accessibility::Public, &widget));

    fixture.processor.enqueue_semantic_change(WIDGET, Some(path(1)));
    fixture.settle().await;

    assert_eq!(fixture.emitted_documents(), core_closure());
}

#[tokio::test(flavor = "current_thread")]
async fn unresolvable_hint_falls_back_to_the_dependents_closure() {
    let fixture = Fixture::new(harness::layered_solution());
    let mut events = fixture.processor.subscribe();

    // No semantic model is cached for the document.
    fixture.processor.enqueue_semantic_change(WIDGET, Some(path(0)));
    fixture.settle().await;

    assert_eq!(fixture.emitted_documents(), core_closure());
    assert!(harness::drain_events(&mut events).contains(
        &SemanticChangeEvent::DocumentProcessed {
            document: WIDGET,
            hint_used: false,
            propagation: Propagation::Unrestricted,
        }
    ));
}

#[tokio::test(flavor = "current_thread")]
async fn hint_on_a_node_without_symbol_falls_back() {
    let fixture = Fixture::new(harness::layered_solution());
    fixture.cache.insert_model(
        WIDGET,
        Arc::new(DeclarationTable::new().with_unbound_node(path(0))),
    );

    fixture.processor.enqueue_semantic_change(WIDGET, Some(path(0)));
    fixture.settle().await;

    assert_eq!(fixture.emitted_documents(), core_closure());
}

#[tokio::test(flavor = "current_thread")]
async fn stale_hint_path_falls_back() {
    let fixture = Fixture::new(harness::layered_solution());
    fixture.declare(WIDGET, path(0), widget(Accessibility::Private));

    // The tree no longer has a declaration at path(7).
    fixture.processor.enqueue_semantic_change(WIDGET, Some(path(7)));
    fixture.settle().await;

    assert_eq!(fixture.emitted_documents(), core_closure());
}

#[tokio::test(flavor = "current_thread")]
async fn internal_type_change_skips_dependents_without_friend_access() {
    let fixture = Fixture::new(harness::layered_solution());
    fixture.declare(WIDGET, path(0), widget(Accessibility::Internal));
    // `tools` has no cached compilation and cannot be ruled out.
    fixture.materialize(&[CORE, APP, TESTS]);

    fixture.processor.enqueue_semantic_change(WIDGET, Some(path(0)));
    fixture.settle().await;

    let emitted = fixture.emitted_documents();
    assert!(!emitted.contains(&APP_MAIN), "{emitted:?}");
    assert_eq!(
        emitted,
        BTreeSet::from([WIDGET, WIDGET_PART, OTHER, TESTS_MAIN, TOOLS_MAIN])
    );
}

#[tokio::test(flavor = "current_thread")]
async fn internal_member_without_compilations_keeps_every_dependent() {
    let fixture = Fixture::new(harness::layered_solution());
    let mut events = fixture.processor.subscribe();
    let widget = widget(Accessibility::ProtectedOrInternal);
    fixture.declare(WIDGET, path(1), method(Accessibility::Public, &widget));

    fixture.processor.enqueue_semantic_change(WIDGET, Some(path(1)));
    fixture.settle().await;

    assert_eq!(fixture.emitted_documents(), core_closure());
    let events = harness::drain_events(&mut events);
    assert!(events.contains(&SemanticChangeEvent::DocumentProcessed {
        document: WIDGET,
        hint_used: true,
        propagation: Propagation::Assembly,
    }));
    // Each visible project is requested on its own, without dependency tracking.
    let requested: BTreeSet<_> = events
        .iter()
        .filter_map(|event| match event {
            SemanticChangeEvent::ProjectEnqueued {
                project,
                needs_dependency_tracking: false,
                ..
            } => Some(project.to_raw()),
            _ => None,
        })
        .collect();
    assert_eq!(requested, BTreeSet::from([1, 2, 3, 4]));
}

#[tokio::test(flavor = "current_thread")]
async fn evicted_model_no_longer_narrows_the_change() {
    let fixture = Fixture::new(harness::layered_solution());
    let widget = widget(Accessibility::Public);
    fixture.declare(WIDGET, path(1), method(Accessibility::Private, &widget));
    fixture.cache.evict_document(WIDGET);

    fixture.processor.enqueue_semantic_change(WIDGET, Some(path(1)));
    fixture.settle().await;

    assert_eq!(fixture.emitted_documents(), core_closure());
}

#[tokio::test(flavor = "current_thread")]
async fn evicted_compilation_keeps_the_dependent_visible() {
    let fixture = Fixture::new(harness::layered_solution());
    fixture.declare(WIDGET, path(0), widget(Accessibility::Internal));
    fixture.materialize(&[CORE, APP, TESTS]);
    // Without its compilation `app` cannot be ruled out any more.
    fixture.cache.evict_project(APP);

    fixture.processor.enqueue_semantic_change(WIDGET, Some(path(0)));
    fixture.settle().await;

    assert_eq!(fixture.emitted_documents(), core_closure());
}
