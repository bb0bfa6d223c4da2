use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use crate::{AssemblyIdentity, DocumentId, ProjectDependencyGraph, ProjectId, SourceLocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: DocumentId,
    name: String,
    file_path: PathBuf,
}

impl Document {
    pub fn new(id: DocumentId, name: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            name: name.into(),
            file_path: file_path.into(),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn project_id(&self) -> ProjectId {
        self.id.project_id()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// A project as of one solution snapshot. Builders consume and return the project so snapshots
/// can share unchanged projects behind `Arc`.
#[derive(Debug, Clone)]
pub struct Project {
    id: ProjectId,
    name: String,
    language: Arc<str>,
    assembly: Arc<AssemblyIdentity>,
    documents: BTreeMap<DocumentId, Arc<Document>>,
    documents_by_path: HashMap<PathBuf, DocumentId>,
    project_references: BTreeSet<ProjectId>,
}

impl Project {
    /// Creates an empty project whose assembly is named after the project.
    pub fn new(id: ProjectId, name: impl Into<String>, language: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        Self {
            id,
            assembly: Arc::new(AssemblyIdentity::new(name.clone())),
            name,
            language: language.into(),
            documents: BTreeMap::new(),
            documents_by_path: HashMap::new(),
            project_references: BTreeSet::new(),
        }
    }

    pub fn with_assembly(mut self, assembly: AssemblyIdentity) -> Self {
        self.assembly = Arc::new(assembly);
        self
    }

    pub fn with_document(mut self, document: Document) -> Self {
        debug_assert_eq!(
            document.project_id(),
            self.id,
            "document {} added to foreign project {}",
            document.id(),
            self.id
        );
        if let Some(previous) = self.documents.get(&document.id()) {
            self.documents_by_path.remove(previous.file_path());
        }
        self.documents_by_path
            .insert(document.file_path().to_path_buf(), document.id());
        self.documents.insert(document.id(), Arc::new(document));
        self
    }

    pub fn without_document(mut self, id: DocumentId) -> Self {
        if let Some(removed) = self.documents.remove(&id) {
            self.documents_by_path.remove(removed.file_path());
        }
        self
    }

    pub fn with_project_reference(mut self, referenced: ProjectId) -> Self {
        self.project_references.insert(referenced);
        self
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> &Arc<str> {
        &self.language
    }

    pub fn assembly(&self) -> &Arc<AssemblyIdentity> {
        &self.assembly
    }

    pub fn documents(&self) -> impl ExactSizeIterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    pub fn document(&self, id: DocumentId) -> Option<&Arc<Document>> {
        self.documents.get(&id)
    }

    pub fn document_for_path(&self, path: &Path) -> Option<&Arc<Document>> {
        self.documents_by_path
            .get(path)
            .and_then(|id| self.documents.get(id))
    }

    pub fn project_references(&self) -> impl Iterator<Item = ProjectId> + '_ {
        self.project_references.iter().copied()
    }
}

/// Immutable snapshot of every project and document.
///
/// Derived data (the dependency graph) is computed on first use and shared by everyone holding
/// the same snapshot. Mutators return a new snapshot with a bumped version.
#[derive(Debug)]
pub struct Solution {
    version: u64,
    projects: BTreeMap<ProjectId, Arc<Project>>,
    dependency_graph: OnceLock<Arc<ProjectDependencyGraph>>,
}

impl Solution {
    pub fn empty() -> Self {
        Self::from_parts(0, BTreeMap::new())
    }

    fn from_parts(version: u64, projects: BTreeMap<ProjectId, Arc<Project>>) -> Self {
        Self {
            version,
            projects,
            dependency_graph: OnceLock::new(),
        }
    }

    fn fork(&self, edit: impl FnOnce(&mut BTreeMap<ProjectId, Arc<Project>>)) -> Self {
        let mut projects = self.projects.clone();
        edit(&mut projects);
        Self::from_parts(self.version + 1, projects)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Adds or replaces a project.
    pub fn with_project(&self, project: Project) -> Self {
        self.fork(|projects| {
            projects.insert(project.id(), Arc::new(project));
        })
    }

    pub fn without_project(&self, id: ProjectId) -> Self {
        self.fork(|projects| {
            projects.remove(&id);
        })
    }

    /// Adds or replaces a document in its owning project. Unknown projects are left untouched.
    pub fn with_document(&self, document: Document) -> Self {
        self.fork(|projects| {
            if let Some(project) = projects.get_mut(&document.project_id()) {
                *project = Arc::new((**project).clone().with_document(document));
            }
        })
    }

    pub fn without_document(&self, id: DocumentId) -> Self {
        self.fork(|projects| {
            if let Some(project) = projects.get_mut(&id.project_id()) {
                *project = Arc::new((**project).clone().without_document(id));
            }
        })
    }

    pub fn with_project_reference(&self, from: ProjectId, to: ProjectId) -> Self {
        self.fork(|projects| {
            if let Some(project) = projects.get_mut(&from) {
                *project = Arc::new((**project).clone().with_project_reference(to));
            }
        })
    }

    pub fn project(&self, id: ProjectId) -> Option<&Arc<Project>> {
        self.projects.get(&id)
    }

    pub fn projects(&self) -> impl ExactSizeIterator<Item = &Arc<Project>> {
        self.projects.values()
    }

    pub fn project_ids(&self) -> impl ExactSizeIterator<Item = ProjectId> + '_ {
        self.projects.keys().copied()
    }

    pub fn document(&self, id: DocumentId) -> Option<&Arc<Document>> {
        self.project(id.project_id())?.document(id)
    }

    /// The document in `project` whose file holds `location`.
    pub fn document_for_location(
        &self,
        location: &SourceLocation,
        project: ProjectId,
    ) -> Option<&Arc<Document>> {
        self.project(project)?.document_for_path(location.path())
    }

    pub fn dependency_graph(&self) -> Arc<ProjectDependencyGraph> {
        Arc::clone(
            self.dependency_graph
                .get_or_init(|| Arc::new(ProjectDependencyGraph::new(self.projects()))),
        )
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::empty()
    }
}
