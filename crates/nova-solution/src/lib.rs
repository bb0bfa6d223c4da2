//! The project/document model that Nova's incremental pipelines read from.
//!
//! A [`Solution`] is an immutable snapshot; the live, mutable view is the [`Workspace`], which
//! always hands out the latest snapshot. Semantic information that may or may not have been
//! computed yet (semantic models, compilations) is reached through [`SemanticCache`], which never
//! forces computation.

mod graph;
mod ids;
mod semantic;
mod solution;
mod symbols;
mod workspace;

pub use graph::ProjectDependencyGraph;
pub use ids::{DocumentId, ProjectId};
pub use semantic::{
    Compilation, DeclarationNode, DeclarationTable, InMemorySemanticCache, SemanticCache,
    SemanticModel,
};
pub use solution::{Document, Project, Solution};
pub use symbols::{
    Accessibility, AssemblyIdentity, DeclarationPath, PathSegment, SourceLocation, Symbol,
    SymbolKind, SymbolLocation,
};
pub use workspace::Workspace;
