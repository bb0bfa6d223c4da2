//! Incremental scheduling of re-analysis after semantic edits.
//!
//! Edits arrive as `(document, optional declaration hint)` pairs. A document-level pipeline
//! coalesces them per document and, once the edit burst is over, narrows each one to the
//! smallest set of documents that can observe it:
//!
//! - a private member or type only affects the other declarations of its type;
//! - an internal type affects the projects that can see the declaring assembly's internals;
//! - anything else (public, unresolvable hint, unknown symbol) affects the whole
//!   transitive-dependents closure of the project.
//!
//! Project-scoped requests go through a second pipeline that expands them against the live
//! dependency graph and emits one [`WorkItem`] per affected document into a [`WorkItemSink`].
//! The document pipeline feeds the project pipeline, never the other way around.

mod config;
mod document_processor;
mod events;
mod priority;
mod processor;
mod project_processor;
mod visibility;
mod work_item;

pub use config::SemanticChangeConfig;
pub use events::{
    CorrelationId, SemanticChangeEvent, SemanticChangeReceiver, SemanticChangeRecord,
};
pub use priority::{LanguagePriorities, PriorityPolicy};
pub use processor::{SemanticChangeProcessor, SemanticChangeServices};
pub use visibility::{classify, Propagation, PropagationScope};
pub use work_item::{InvocationReason, SinkFull, WorkItem, WorkItemSink};
