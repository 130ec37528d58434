//! Structural search helpers and locator strategies.
//!
//! The `find_*` helpers search the declared members of a type (or an ordered
//! list of types, or a superclass chain) with a structural predicate. First
//! match is declaration order; the `find_unique_*` variants report
//! `AmbiguousMatch` instead of picking one.
//!
//! A `Locator<T>` is the expensive, authoritative strategy the engine runs on
//! a cache miss. Closures taking `&dyn TypeGraph` are locators; wrap one with
//! `described` so failures log what it was looking for.

use tracing::debug;

use crate::descriptor::{SymbolDescriptor, SymbolKind};
use crate::error::LocateError;
use crate::graph::{
    ClassRef, ConstructorInfo, ConstructorRef, FieldInfo, FieldRef, MethodInfo, MethodRef,
    TypeGraph,
};
use crate::predicate::{NameMatch, Predicate};
use crate::xref::{XrefEngine, XrefQuery};

// ============================================================================
// Locator
// ============================================================================

/// Strategy that finds an element in the foreign type graph.
pub trait Locator<T> {
    /// Run the search
    fn locate(&self, graph: &dyn TypeGraph) -> Result<T, LocateError>;

    /// Short description used in diagnostics
    fn describe(&self) -> String {
        "custom locator".to_string()
    }
}

impl<T, F> Locator<T> for F
where
    F: Fn(&dyn TypeGraph) -> Result<T, LocateError>,
{
    fn locate(&self, graph: &dyn TypeGraph) -> Result<T, LocateError> {
        self(graph)
    }
}

/// A locator closure with a description attached.
pub struct Described<F> {
    description: String,
    locate: F,
}

/// Attach a description to a locator closure
pub fn described<T, F>(description: impl Into<String>, locate: F) -> Described<F>
where
    F: Fn(&dyn TypeGraph) -> Result<T, LocateError>,
{
    Described {
        description: description.into(),
        locate,
    }
}

impl<T, F> Locator<T> for Described<F>
where
    F: Fn(&dyn TypeGraph) -> Result<T, LocateError>,
{
    fn locate(&self, graph: &dyn TypeGraph) -> Result<T, LocateError> {
        (self.locate)(graph)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

// ============================================================================
// Shared search plumbing
// ============================================================================

fn first_match<H>(
    mut candidates: impl Iterator<Item = H>,
    test: impl Fn(&H) -> bool,
    kind: SymbolKind,
    scope: &str,
    predicate: String,
) -> Result<H, LocateError> {
    candidates
        .find(|h| test(h))
        .ok_or_else(|| LocateError::not_found(kind, scope, predicate))
}

fn unique_match<H>(
    candidates: impl Iterator<Item = H>,
    test: impl Fn(&H) -> bool,
    kind: SymbolKind,
    scope: &str,
    predicate: String,
) -> Result<H, LocateError> {
    let mut matches: Vec<H> = candidates.filter(|h| test(h)).collect();
    match matches.len() {
        0 => Err(LocateError::not_found(kind, scope, predicate)),
        1 => Ok(matches.remove(0)),
        count => Err(LocateError::ambiguous(kind, scope, predicate, count)),
    }
}

/// Load each candidate type in order, skipping ones that are not loaded
fn load_candidates<'a>(
    graph: &'a dyn TypeGraph,
    candidates: &'a [&'a str],
) -> impl Iterator<Item = ClassRef> + 'a {
    candidates.iter().filter_map(move |name| {
        let class = graph.load_type(name).map(ClassRef::new);
        if class.is_none() {
            debug!("Candidate type {} is not loaded, skipping", name);
        }
        class
    })
}

// ============================================================================
// Classes
// ============================================================================

/// Load a type by exact name
pub fn find_class(graph: &dyn TypeGraph, name: &str) -> Result<ClassRef, LocateError> {
    graph
        .load_type(name)
        .map(ClassRef::new)
        .ok_or_else(|| {
            LocateError::not_found(
                SymbolKind::Class,
                "loaded types",
                format!("name == \"{}\"", name),
            )
        })
}

/// First loaded type (load order) whose name matches
pub fn find_first_class_by_name(
    graph: &dyn TypeGraph,
    rule: &NameMatch,
) -> Result<ClassRef, LocateError> {
    graph
        .type_names()
        .into_iter()
        .filter(|name| rule.matches(name))
        .find_map(|name| graph.load_type(&name))
        .map(ClassRef::new)
        .ok_or_else(|| LocateError::not_found(SymbolKind::Class, "loaded types", rule.to_string()))
}

/// All loaded types (load order) whose names match
pub fn find_classes_by_name(graph: &dyn TypeGraph, rule: &NameMatch) -> Vec<ClassRef> {
    graph
        .type_names()
        .into_iter()
        .filter(|name| rule.matches(name))
        .filter_map(|name| graph.load_type(&name))
        .map(ClassRef::new)
        .collect()
}

// ============================================================================
// Methods
// ============================================================================

/// First declared method of `class` matching `predicate`
pub fn find_method<P>(class: &ClassRef, predicate: &P) -> Result<MethodRef, LocateError>
where
    P: Predicate<MethodInfo> + ?Sized,
{
    first_match(
        class.methods(),
        |m| predicate.test(m.info()),
        SymbolKind::Method,
        class.name(),
        predicate.describe(),
    )
}

/// All declared methods of `class` matching `predicate`, in declaration order
pub fn find_methods<P>(class: &ClassRef, predicate: &P) -> Vec<MethodRef>
where
    P: Predicate<MethodInfo> + ?Sized,
{
    class.methods().filter(|m| predicate.test(m.info())).collect()
}

/// The only declared method of `class` matching `predicate`
pub fn find_unique_method<P>(class: &ClassRef, predicate: &P) -> Result<MethodRef, LocateError>
where
    P: Predicate<MethodInfo> + ?Sized,
{
    unique_match(
        class.methods(),
        |m| predicate.test(m.info()),
        SymbolKind::Method,
        class.name(),
        predicate.describe(),
    )
}

/// First match across an ordered list of candidate types
pub fn find_method_in<P>(
    graph: &dyn TypeGraph,
    candidates: &[&str],
    predicate: &P,
) -> Result<MethodRef, LocateError>
where
    P: Predicate<MethodInfo> + ?Sized,
{
    first_match(
        load_candidates(graph, candidates).flat_map(|c| c.methods().collect::<Vec<_>>()),
        |m| predicate.test(m.info()),
        SymbolKind::Method,
        &candidates.join(", "),
        predicate.describe(),
    )
}

/// First match in `class`, then in each superclass
pub fn find_method_in_hierarchy<P>(
    graph: &dyn TypeGraph,
    class: &ClassRef,
    predicate: &P,
) -> Result<MethodRef, LocateError>
where
    P: Predicate<MethodInfo> + ?Sized,
{
    first_match(
        class
            .hierarchy(graph)
            .into_iter()
            .flat_map(|c| c.methods().collect::<Vec<_>>()),
        |m| predicate.test(m.info()),
        SymbolKind::Method,
        &format!("{} and superclasses", class.name()),
        predicate.describe(),
    )
}

// ============================================================================
// Fields
// ============================================================================

/// First declared field of `class` matching `predicate`
pub fn find_field<P>(class: &ClassRef, predicate: &P) -> Result<FieldRef, LocateError>
where
    P: Predicate<FieldInfo> + ?Sized,
{
    first_match(
        class.fields(),
        |f| predicate.test(f.info()),
        SymbolKind::Field,
        class.name(),
        predicate.describe(),
    )
}

/// All declared fields of `class` matching `predicate`
pub fn find_fields<P>(class: &ClassRef, predicate: &P) -> Vec<FieldRef>
where
    P: Predicate<FieldInfo> + ?Sized,
{
    class.fields().filter(|f| predicate.test(f.info())).collect()
}

/// The only declared field of `class` matching `predicate`
pub fn find_unique_field<P>(class: &ClassRef, predicate: &P) -> Result<FieldRef, LocateError>
where
    P: Predicate<FieldInfo> + ?Sized,
{
    unique_match(
        class.fields(),
        |f| predicate.test(f.info()),
        SymbolKind::Field,
        class.name(),
        predicate.describe(),
    )
}

/// First match across an ordered list of candidate types
pub fn find_field_in<P>(
    graph: &dyn TypeGraph,
    candidates: &[&str],
    predicate: &P,
) -> Result<FieldRef, LocateError>
where
    P: Predicate<FieldInfo> + ?Sized,
{
    first_match(
        load_candidates(graph, candidates).flat_map(|c| c.fields().collect::<Vec<_>>()),
        |f| predicate.test(f.info()),
        SymbolKind::Field,
        &candidates.join(", "),
        predicate.describe(),
    )
}

/// First match in `class`, then in each superclass
pub fn find_field_in_hierarchy<P>(
    graph: &dyn TypeGraph,
    class: &ClassRef,
    predicate: &P,
) -> Result<FieldRef, LocateError>
where
    P: Predicate<FieldInfo> + ?Sized,
{
    first_match(
        class
            .hierarchy(graph)
            .into_iter()
            .flat_map(|c| c.fields().collect::<Vec<_>>()),
        |f| predicate.test(f.info()),
        SymbolKind::Field,
        &format!("{} and superclasses", class.name()),
        predicate.describe(),
    )
}

// ============================================================================
// Constructors
// ============================================================================
// Constructors are not inherited, so there is no hierarchy variant.

/// First declared constructor of `class` matching `predicate`
pub fn find_constructor<P>(class: &ClassRef, predicate: &P) -> Result<ConstructorRef, LocateError>
where
    P: Predicate<ConstructorInfo> + ?Sized,
{
    first_match(
        class.constructors(),
        |c| predicate.test(c.info()),
        SymbolKind::Constructor,
        class.name(),
        predicate.describe(),
    )
}

/// All declared constructors of `class` matching `predicate`
pub fn find_constructors<P>(class: &ClassRef, predicate: &P) -> Vec<ConstructorRef>
where
    P: Predicate<ConstructorInfo> + ?Sized,
{
    class
        .constructors()
        .filter(|c| predicate.test(c.info()))
        .collect()
}

/// The only declared constructor of `class` matching `predicate`
pub fn find_unique_constructor<P>(
    class: &ClassRef,
    predicate: &P,
) -> Result<ConstructorRef, LocateError>
where
    P: Predicate<ConstructorInfo> + ?Sized,
{
    unique_match(
        class.constructors(),
        |c| predicate.test(c.info()),
        SymbolKind::Constructor,
        class.name(),
        predicate.describe(),
    )
}

/// First match across an ordered list of candidate types
pub fn find_constructor_in<P>(
    graph: &dyn TypeGraph,
    candidates: &[&str],
    predicate: &P,
) -> Result<ConstructorRef, LocateError>
where
    P: Predicate<ConstructorInfo> + ?Sized,
{
    first_match(
        load_candidates(graph, candidates).flat_map(|c| c.constructors().collect::<Vec<_>>()),
        |c| predicate.test(c.info()),
        SymbolKind::Constructor,
        &candidates.join(", "),
        predicate.describe(),
    )
}

// ============================================================================
// Cross-reference delegation
// ============================================================================

fn via<H>(
    xref: &dyn XrefEngine,
    query: &XrefQuery,
    kind: SymbolKind,
    resolve: impl Fn(&SymbolDescriptor) -> Option<H>,
) -> Result<H, LocateError> {
    let descriptors = xref.query(query)?;
    descriptors
        .iter()
        .find_map(|descriptor| {
            let handle = resolve(descriptor);
            if handle.is_none() {
                debug!("Cross-reference result {} did not resolve, skipping", descriptor);
            }
            handle
        })
        .ok_or_else(|| LocateError::not_found(kind, "cross-references", query.to_string()))
}

/// First type returned by `query` that resolves
pub fn locate_class_via(
    graph: &dyn TypeGraph,
    xref: &dyn XrefEngine,
    query: &XrefQuery,
) -> Result<ClassRef, LocateError> {
    via(xref, query, SymbolKind::Class, |d| d.resolve_class(graph).ok())
}

/// First method returned by `query` that resolves
pub fn locate_method_via(
    graph: &dyn TypeGraph,
    xref: &dyn XrefEngine,
    query: &XrefQuery,
) -> Result<MethodRef, LocateError> {
    via(xref, query, SymbolKind::Method, |d| d.resolve_method(graph).ok())
}

/// First field returned by `query` that resolves
pub fn locate_field_via(
    graph: &dyn TypeGraph,
    xref: &dyn XrefEngine,
    query: &XrefQuery,
) -> Result<FieldRef, LocateError> {
    via(xref, query, SymbolKind::Field, |d| d.resolve_field(graph).ok())
}
