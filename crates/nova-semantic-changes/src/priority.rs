use std::{collections::HashSet, sync::Arc};

use nova_solution::{Document, Project};

/// Decides whether a document's work item may be processed after everything else.
pub trait PriorityPolicy: Send + Sync {
    fn is_low_priority(&self, project: &Project, document: &Document) -> bool;
}

/// Classifies documents by their project's language.
#[derive(Debug, Clone, Default)]
pub struct LanguagePriorities {
    low_priority: HashSet<Arc<str>>,
}

impl LanguagePriorities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_low_priority_language(mut self, language: impl Into<Arc<str>>) -> Self {
        self.low_priority.insert(language.into());
        self
    }
}

impl PriorityPolicy for LanguagePriorities {
    fn is_low_priority(&self, project: &Project, _document: &Document) -> bool {
        self.low_priority.contains(project.language())
    }
}
