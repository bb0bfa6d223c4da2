use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{Project, ProjectId};

/// Project reference graph of one solution snapshot.
///
/// Edges point from a project to the projects it references; `dependents` is the reverse map.
/// References to projects that are not part of the snapshot are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDependencyGraph {
    references: BTreeMap<ProjectId, BTreeSet<ProjectId>>,
    dependents: BTreeMap<ProjectId, BTreeSet<ProjectId>>,
}

impl ProjectDependencyGraph {
    pub fn new<'a>(projects: impl IntoIterator<Item = &'a Arc<Project>>) -> Self {
        let projects: Vec<&Arc<Project>> = projects.into_iter().collect();
        let known: BTreeSet<ProjectId> = projects.iter().map(|p| p.id()).collect();

        let mut graph = Self::default();
        for project in &projects {
            graph.dependents.entry(project.id()).or_default();
            let references = graph.references.entry(project.id()).or_default();
            for referenced in project.project_references() {
                if referenced == project.id() || !known.contains(&referenced) {
                    continue;
                }
                references.insert(referenced);
            }
        }

        let edges: Vec<(ProjectId, ProjectId)> = graph
            .references
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (*from, *to)))
            .collect();
        for (from, to) in edges {
            graph.dependents.entry(to).or_default().insert(from);
        }

        graph
    }

    pub fn contains(&self, project: ProjectId) -> bool {
        self.references.contains_key(&project)
    }

    pub fn direct_dependents(&self, project: ProjectId) -> impl Iterator<Item = ProjectId> + '_ {
        self.dependents
            .get(&project)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Every project that depends on `project`, directly or indirectly. `project` itself is not
    /// included, even when it sits on a reference cycle.
    pub fn transitive_dependents(&self, project: ProjectId) -> BTreeSet<ProjectId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<ProjectId> = self.direct_dependents(project).collect();
        while let Some(next) = stack.pop() {
            if next == project || !seen.insert(next) {
                continue;
            }
            stack.extend(self.direct_dependents(next));
        }
        seen
    }
}
