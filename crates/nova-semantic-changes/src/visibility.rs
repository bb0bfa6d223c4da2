use std::sync::Arc;

use nova_solution::{Accessibility, AssemblyIdentity, Symbol};

/// How far a change to a declaration can be observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagationScope {
    /// Only code inside `anchor` (a type) can see the change, so only the documents declaring
    /// `anchor` are affected.
    Local { anchor: Arc<Symbol> },
    /// Only `assembly` and the assemblies it grants friend access to can see the change.
    Assembly { assembly: Arc<AssemblyIdentity> },
    /// Anything that transitively depends on the project can see the change.
    Unrestricted,
}

impl PropagationScope {
    pub fn propagation(&self) -> Propagation {
        match self {
            PropagationScope::Local { .. } => Propagation::Local,
            PropagationScope::Assembly { .. } => Propagation::Assembly,
            PropagationScope::Unrestricted => Propagation::Unrestricted,
        }
    }
}

/// Field-less mirror of [`PropagationScope`], for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Propagation {
    Local,
    Assembly,
    Unrestricted,
}

/// Decides the propagation scope of a change to the declaration of `symbol`.
///
/// Members are judged first: a private member is local to its containing type, any other member
/// is judged like its containing type. Types are then judged by their own accessibility. Every
/// case without a narrower answer is [`PropagationScope::Unrestricted`].
pub fn classify(symbol: &Arc<Symbol>) -> PropagationScope {
    classify_member(symbol)
        .or_else(|| classify_type(symbol))
        .unwrap_or(PropagationScope::Unrestricted)
}

fn classify_member(symbol: &Arc<Symbol>) -> Option<PropagationScope> {
    if !symbol.kind().is_member() {
        return None;
    }

    let containing_type = symbol.containing_type()?;
    if symbol.accessibility() == Accessibility::Private {
        return Some(PropagationScope::Local {
            anchor: Arc::clone(containing_type),
        });
    }

    classify_type(containing_type)
}

fn classify_type(symbol: &Arc<Symbol>) -> Option<PropagationScope> {
    if !symbol.kind().is_type() {
        return None;
    }

    match symbol.accessibility() {
        Accessibility::Private => Some(PropagationScope::Local {
            anchor: Arc::clone(symbol),
        }),
        accessibility if accessibility.is_assembly_scoped() => Some(PropagationScope::Assembly {
            assembly: Arc::clone(symbol.assembly()),
        }),
        _ => None,
    }
}
