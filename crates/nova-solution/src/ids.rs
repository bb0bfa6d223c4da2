use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(u32);

impl ProjectId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project#{}", self.0)
    }
}

/// Identity of a document. Documents are owned by exactly one project, so the id carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId {
    project: ProjectId,
    raw: u32,
}

impl DocumentId {
    #[inline]
    pub const fn new(project: ProjectId, raw: u32) -> Self {
        Self { project, raw }
    }

    #[inline]
    pub const fn project_id(self) -> ProjectId {
        self.project
    }

    #[inline]
    pub const fn to_raw(self) -> u32 {
        self.raw
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/doc#{}", self.project, self.raw)
    }
}
