use std::{
    collections::BTreeSet,
    fmt,
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Declared accessibility of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessibility {
    NotApplicable,
    Private,
    /// Visible to derived types inside the declaring assembly only.
    ProtectedAndInternal,
    Protected,
    Internal,
    /// Visible to derived types anywhere and to everything inside the declaring assembly.
    ProtectedOrInternal,
    Public,
}

impl Accessibility {
    /// Whether the widest audience of this accessibility stays inside the declaring assembly
    /// (and its friends).
    pub fn is_assembly_scoped(self) -> bool {
        matches!(
            self,
            Accessibility::Internal
                | Accessibility::ProtectedAndInternal
                | Accessibility::ProtectedOrInternal
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Field,
    Property,
    Method,
    Event,
    NamedType,
    Namespace,
    Parameter,
    Local,
    Other,
}

impl SymbolKind {
    pub fn is_member(self) -> bool {
        matches!(
            self,
            SymbolKind::Field | SymbolKind::Property | SymbolKind::Method | SymbolKind::Event
        )
    }

    pub fn is_type(self) -> bool {
        self == SymbolKind::NamedType
    }
}

/// A span inside a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    path: PathBuf,
    span: Range<usize>,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>, span: Range<usize>) -> Self {
        Self {
            path: path.into(),
            span,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolLocation {
    Source(SourceLocation),
    /// Declared in a referenced binary; has no document.
    Metadata,
}

/// The assembly a project compiles to, with the friend assemblies it grants internal access to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyIdentity {
    name: String,
    internals_visible_to: BTreeSet<String>,
}

impl AssemblyIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            internals_visible_to: BTreeSet::new(),
        }
    }

    pub fn with_friend(mut self, friend: impl Into<String>) -> Self {
        self.internals_visible_to.insert(friend.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gives_access_to(&self, other: &AssemblyIdentity) -> bool {
        self.internals_visible_to.contains(&other.name)
    }

    /// Whether code in `self` can see internal declarations of `other`.
    pub fn is_same_assembly_or_has_friend_access_to(&self, other: &AssemblyIdentity) -> bool {
        self.name == other.name || other.gives_access_to(self)
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A declared symbol as reported by a semantic model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    name: String,
    kind: SymbolKind,
    accessibility: Accessibility,
    locations: Vec<SymbolLocation>,
    containing_type: Option<Arc<Symbol>>,
    assembly: Arc<AssemblyIdentity>,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        accessibility: Accessibility,
        assembly: Arc<AssemblyIdentity>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            accessibility,
            locations: Vec::new(),
            containing_type: None,
            assembly,
        }
    }

    pub fn with_location(mut self, location: SymbolLocation) -> Self {
        self.locations.push(location);
        self
    }

    pub fn with_source_location(self, path: impl Into<PathBuf>, span: Range<usize>) -> Self {
        self.with_location(SymbolLocation::Source(SourceLocation::new(path, span)))
    }

    pub fn with_containing_type(mut self, containing_type: Arc<Symbol>) -> Self {
        self.containing_type = Some(containing_type);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn accessibility(&self) -> Accessibility {
        self.accessibility
    }

    pub fn locations(&self) -> &[SymbolLocation] {
        &self.locations
    }

    pub fn source_locations(&self) -> impl Iterator<Item = &SourceLocation> {
        self.locations.iter().filter_map(|location| match location {
            SymbolLocation::Source(source) => Some(source),
            SymbolLocation::Metadata => None,
        })
    }

    pub fn containing_type(&self) -> Option<&Arc<Symbol>> {
        self.containing_type.as_ref()
    }

    pub fn assembly(&self) -> &Arc<AssemblyIdentity> {
        &self.assembly
    }
}

/// One step from a syntax node to one of its children: the child's syntax kind and its ordinal
/// among siblings of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub kind: u16,
    pub ordinal: u32,
}

/// Structural pointer from a syntax root to a declaration.
///
/// Survives edits that do not restructure the enclosing declarations, which is what makes it
/// usable as a hint after the text has changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclarationPath {
    segments: Vec<PathSegment>,
}

impl DeclarationPath {
    pub fn new(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl fmt::Display for DeclarationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}:{}", segment.kind, segment.ordinal)?;
        }
        Ok(())
    }
}
