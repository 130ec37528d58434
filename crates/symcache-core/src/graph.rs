//! Foreign Type Graph Model
//!
//! This module defines the read-only view of a foreign application's loaded
//! types that every locator and every cache re-resolution works against:
//! - `TypeGraph` trait implemented by the embedding host (loader/context)
//! - `ForeignType` and member signature records (methods, fields, constructors)
//! - Live handles (`ClassRef`, `MethodRef`, `FieldRef`, `ConstructorRef`)
//!   and the tagged `SymbolHandle` union
//! - `ClassPool`, an in-memory `TypeGraph` for snapshots and tests
//!
//! The engine never mutates a type graph, it only inspects it.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::descriptor::{SymbolDescriptor, CONSTRUCTOR_NAME};

// ============================================================================
// Modifiers
// ============================================================================

bitflags! {
    /// Declared modifiers of a type or member.
    ///
    /// Bit values follow the JVM access flags so providers backed by a real
    /// class file or runtime can pass their flags through unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

impl Modifiers {
    /// Check for the `static` modifier
    pub fn is_static(&self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    /// Check for the `final` modifier
    pub fn is_final(&self) -> bool {
        self.contains(Modifiers::FINAL)
    }
}

// ============================================================================
// Member Records
// ============================================================================

/// Signature of a declared method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Method name (usually obfuscated)
    pub name: String,
    /// Fully qualified parameter type names, in declaration order
    pub parameter_types: Vec<String>,
    /// Fully qualified return type name (`void` for none)
    pub return_type: String,
    /// Declared modifiers
    pub modifiers: Modifiers,
    /// String literals referenced by the body, when the provider knows them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strings: Vec<String>,
}

impl MethodInfo {
    /// Number of declared parameters
    pub fn parameter_count(&self) -> usize {
        self.parameter_types.len()
    }
}

/// Signature of a declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Fully qualified field type name
    pub field_type: String,
    /// Declared modifiers
    pub modifiers: Modifiers,
}

/// Signature of a declared constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorInfo {
    /// Fully qualified parameter type names, in declaration order
    pub parameter_types: Vec<String>,
    /// Declared modifiers
    pub modifiers: Modifiers,
}

impl ConstructorInfo {
    /// Number of declared parameters
    pub fn parameter_count(&self) -> usize {
        self.parameter_types.len()
    }
}

/// A loaded type together with its declared members.
///
/// Member vectors are in declaration order as reported by the provider. That
/// order is what first-match searches use and is not guaranteed stable across
/// rebuilds of the foreign binary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ForeignType {
    /// Fully qualified (binary) name, e.g. `com.host.a.b$c`
    pub name: String,
    /// Declared modifiers of the type itself
    pub modifiers: Modifiers,
    /// Direct superclass, if any
    pub superclass: Option<String>,
    /// Directly implemented interfaces
    pub interfaces: Vec<String>,
    /// Enclosing type for nested/inner types
    pub enclosing: Option<String>,
    /// Declared methods
    pub methods: Vec<MethodInfo>,
    /// Declared fields
    pub fields: Vec<FieldInfo>,
    /// Declared constructors
    pub constructors: Vec<ConstructorInfo>,
}

impl ForeignType {
    /// Simple name: the part after the last `.` (and after `$` for nested types)
    pub fn simple_name(&self) -> &str {
        let tail = self.name.rsplit('.').next().unwrap_or(&self.name);
        tail.rsplit('$').next().unwrap_or(tail)
    }
}

// ============================================================================
// TypeGraph
// ============================================================================

/// Read-only access to the foreign application's loaded types.
///
/// Implemented by the embedding host on top of whatever loader or reflection
/// facility it has. Implementations must be cheap to call concurrently.
pub trait TypeGraph: Send + Sync {
    /// Load a type by its fully qualified name.
    fn load_type(&self, name: &str) -> Option<Arc<ForeignType>>;

    /// Names of all loaded types, in load order.
    ///
    /// Used by name-pattern class searches when the owning type is unknown.
    fn type_names(&self) -> Vec<String>;
}

impl<G: TypeGraph + ?Sized> TypeGraph for Arc<G> {
    fn load_type(&self, name: &str) -> Option<Arc<ForeignType>> {
        (**self).load_type(name)
    }

    fn type_names(&self) -> Vec<String> {
        (**self).type_names()
    }
}

// ============================================================================
// Live Handles
// ============================================================================

/// Live handle to a loaded type.
#[derive(Debug, Clone)]
pub struct ClassRef {
    ty: Arc<ForeignType>,
}

impl ClassRef {
    /// Wrap a loaded type
    pub fn new(ty: Arc<ForeignType>) -> Self {
        Self { ty }
    }

    /// Fully qualified name
    pub fn name(&self) -> &str {
        &self.ty.name
    }

    /// The underlying type record
    pub fn ty(&self) -> &Arc<ForeignType> {
        &self.ty
    }

    /// Load the direct superclass from `graph`
    pub fn superclass(&self, graph: &dyn TypeGraph) -> Option<ClassRef> {
        let name = self.ty.superclass.as_deref()?;
        graph.load_type(name).map(ClassRef::new)
    }

    /// Load the enclosing type from `graph`
    pub fn enclosing(&self, graph: &dyn TypeGraph) -> Option<ClassRef> {
        let name = self.ty.enclosing.as_deref()?;
        graph.load_type(name).map(ClassRef::new)
    }

    /// This type followed by its loadable superclasses, nearest first.
    ///
    /// Stops at the first superclass that is not loaded. Cycle-safe.
    pub fn hierarchy(&self, graph: &dyn TypeGraph) -> Vec<ClassRef> {
        let mut chain = vec![self.clone()];
        let mut seen: HashSet<String> = HashSet::from([self.ty.name.clone()]);
        let mut current = self.clone();
        while let Some(parent) = current.superclass(graph) {
            if !seen.insert(parent.ty.name.clone()) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// Handles for every declared method, in declaration order
    pub fn methods(&self) -> impl Iterator<Item = MethodRef> + '_ {
        (0..self.ty.methods.len()).map(|index| MethodRef {
            owner: Arc::clone(&self.ty),
            index,
        })
    }

    /// Handles for every declared field, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = FieldRef> + '_ {
        (0..self.ty.fields.len()).map(|index| FieldRef {
            owner: Arc::clone(&self.ty),
            index,
        })
    }

    /// Handles for every declared constructor, in declaration order
    pub fn constructors(&self) -> impl Iterator<Item = ConstructorRef> + '_ {
        (0..self.ty.constructors.len()).map(|index| ConstructorRef {
            owner: Arc::clone(&self.ty),
            index,
        })
    }

    /// Descriptor naming this type
    pub fn descriptor(&self) -> SymbolDescriptor {
        SymbolDescriptor::class(&self.ty.name)
    }

    /// Human-readable form
    pub fn describe(&self) -> String {
        self.ty.name.clone()
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name == other.ty.name
    }
}

impl Eq for ClassRef {}

/// Live handle to a declared method.
#[derive(Debug, Clone)]
pub struct MethodRef {
    owner: Arc<ForeignType>,
    index: usize,
}

impl MethodRef {
    /// Signature record
    pub fn info(&self) -> &MethodInfo {
        &self.owner.methods[self.index]
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Declaring type
    pub fn owner(&self) -> ClassRef {
        ClassRef::new(Arc::clone(&self.owner))
    }

    /// Descriptor naming this method by owner, name and parameter types
    pub fn descriptor(&self) -> SymbolDescriptor {
        let info = self.info();
        SymbolDescriptor::method(&self.owner.name, &info.name, info.parameter_types.clone())
    }

    /// Human-readable signature, e.g. `a.B.send(java.lang.String, int)`
    pub fn describe(&self) -> String {
        let info = self.info();
        format!(
            "{}.{}({})",
            self.owner.name,
            info.name,
            info.parameter_types.join(", ")
        )
    }
}

impl PartialEq for MethodRef {
    fn eq(&self, other: &Self) -> bool {
        self.owner.name == other.owner.name && self.info() == other.info()
    }
}

impl Eq for MethodRef {}

/// Live handle to a declared field.
#[derive(Debug, Clone)]
pub struct FieldRef {
    owner: Arc<ForeignType>,
    index: usize,
}

impl FieldRef {
    /// Signature record
    pub fn info(&self) -> &FieldInfo {
        &self.owner.fields[self.index]
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Declaring type
    pub fn owner(&self) -> ClassRef {
        ClassRef::new(Arc::clone(&self.owner))
    }

    /// Descriptor naming this field
    pub fn descriptor(&self) -> SymbolDescriptor {
        SymbolDescriptor::field(&self.owner.name, &self.info().name)
    }

    /// Human-readable form, e.g. `a.B.c: int`
    pub fn describe(&self) -> String {
        let info = self.info();
        format!("{}.{}: {}", self.owner.name, info.name, info.field_type)
    }
}

impl PartialEq for FieldRef {
    fn eq(&self, other: &Self) -> bool {
        self.owner.name == other.owner.name && self.info() == other.info()
    }
}

impl Eq for FieldRef {}

/// Live handle to a declared constructor.
#[derive(Debug, Clone)]
pub struct ConstructorRef {
    owner: Arc<ForeignType>,
    index: usize,
}

impl ConstructorRef {
    /// Signature record
    pub fn info(&self) -> &ConstructorInfo {
        &self.owner.constructors[self.index]
    }

    /// Declaring type
    pub fn owner(&self) -> ClassRef {
        ClassRef::new(Arc::clone(&self.owner))
    }

    /// Descriptor naming this constructor by owner and parameter types
    pub fn descriptor(&self) -> SymbolDescriptor {
        SymbolDescriptor::constructor(&self.owner.name, self.info().parameter_types.clone())
    }

    /// Human-readable signature, e.g. `a.B.<init>(int)`
    pub fn describe(&self) -> String {
        format!(
            "{}.{}({})",
            self.owner.name,
            CONSTRUCTOR_NAME,
            self.info().parameter_types.join(", ")
        )
    }
}

impl PartialEq for ConstructorRef {
    fn eq(&self, other: &Self) -> bool {
        self.owner.name == other.owner.name && self.info() == other.info()
    }
}

impl Eq for ConstructorRef {}

/// Any resolved program element.
///
/// Carries enough metadata (owner, name, parameter types) for a hooking layer
/// to look up and invoke the element generically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolHandle {
    Class(ClassRef),
    Method(MethodRef),
    Field(FieldRef),
    Constructor(ConstructorRef),
}

impl SymbolHandle {
    /// Descriptor of the wrapped element
    pub fn descriptor(&self) -> SymbolDescriptor {
        match self {
            SymbolHandle::Class(c) => c.descriptor(),
            SymbolHandle::Method(m) => m.descriptor(),
            SymbolHandle::Field(f) => f.descriptor(),
            SymbolHandle::Constructor(c) => c.descriptor(),
        }
    }

    /// Human-readable form of the wrapped element
    pub fn describe(&self) -> String {
        match self {
            SymbolHandle::Class(c) => c.describe(),
            SymbolHandle::Method(m) => m.describe(),
            SymbolHandle::Field(f) => f.describe(),
            SymbolHandle::Constructor(c) => c.describe(),
        }
    }
}

impl fmt::Display for SymbolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl From<ClassRef> for SymbolHandle {
    fn from(value: ClassRef) -> Self {
        SymbolHandle::Class(value)
    }
}

impl From<MethodRef> for SymbolHandle {
    fn from(value: MethodRef) -> Self {
        SymbolHandle::Method(value)
    }
}

impl From<FieldRef> for SymbolHandle {
    fn from(value: FieldRef) -> Self {
        SymbolHandle::Field(value)
    }
}

impl From<ConstructorRef> for SymbolHandle {
    fn from(value: ConstructorRef) -> Self {
        SymbolHandle::Constructor(value)
    }
}

// ============================================================================
// ClassPool (in-memory TypeGraph)
// ============================================================================

/// In-memory type graph.
///
/// Holds a snapshot of foreign types keyed by name and remembers load order.
#[derive(Debug, Clone, Default)]
pub struct ClassPool {
    types: HashMap<String, Arc<ForeignType>>,
    order: Vec<String>,
}

impl ClassPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a type
    pub fn insert(&mut self, ty: ForeignType) {
        if !self.types.contains_key(&ty.name) {
            self.order.push(ty.name.clone());
        }
        self.types.insert(ty.name.clone(), Arc::new(ty));
    }

    /// Add a type built with a `ClassBuilder`
    pub fn with_class(mut self, builder: ClassBuilder) -> Self {
        self.insert(builder.build());
        self
    }

    /// Number of types in the pool
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate types in load order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ForeignType>> {
        self.order.iter().filter_map(|name| self.types.get(name))
    }

    /// Load a pool from a JSON snapshot (an array of types in load order)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let types: Vec<ForeignType> = serde_json::from_str(json)?;
        let mut pool = Self::new();
        for ty in types {
            pool.insert(ty);
        }
        Ok(pool)
    }

    /// Serialize the pool as a JSON snapshot
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let types: Vec<&ForeignType> = self.iter().map(|t| t.as_ref()).collect();
        serde_json::to_string_pretty(&types)
    }
}

impl TypeGraph for ClassPool {
    fn load_type(&self, name: &str) -> Option<Arc<ForeignType>> {
        self.types.get(name).cloned()
    }

    fn type_names(&self) -> Vec<String> {
        self.order.clone()
    }
}

/// Fluent builder for `ForeignType` records.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    ty: ForeignType,
}

impl ClassBuilder {
    /// Start a type with the given fully qualified name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            ty: ForeignType {
                name: name.into(),
                modifiers: Modifiers::PUBLIC,
                ..Default::default()
            },
        }
    }

    /// Set the type's modifiers
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.ty.modifiers = modifiers;
        self
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.ty.superclass = Some(superclass.into());
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.ty.interfaces.push(interface.into());
        self
    }

    /// Set the enclosing type
    pub fn enclosed_by(mut self, enclosing: impl Into<String>) -> Self {
        self.ty.enclosing = Some(enclosing.into());
        self
    }

    /// Declare a method
    pub fn method(
        mut self,
        name: impl Into<String>,
        parameter_types: &[&str],
        return_type: impl Into<String>,
        modifiers: Modifiers,
    ) -> Self {
        self.ty.methods.push(MethodInfo {
            name: name.into(),
            parameter_types: parameter_types.iter().map(|p| p.to_string()).collect(),
            return_type: return_type.into(),
            modifiers,
            strings: Vec::new(),
        });
        self
    }

    /// Attach referenced string literals to the most recently declared method
    pub fn using_strings(mut self, strings: &[&str]) -> Self {
        if let Some(last) = self.ty.methods.last_mut() {
            last.strings.extend(strings.iter().map(|s| s.to_string()));
        }
        self
    }

    /// Declare a field
    pub fn field(
        mut self,
        name: impl Into<String>,
        field_type: impl Into<String>,
        modifiers: Modifiers,
    ) -> Self {
        self.ty.fields.push(FieldInfo {
            name: name.into(),
            field_type: field_type.into(),
            modifiers,
        });
        self
    }

    /// Declare a constructor
    pub fn constructor(mut self, parameter_types: &[&str], modifiers: Modifiers) -> Self {
        self.ty.constructors.push(ConstructorInfo {
            parameter_types: parameter_types.iter().map(|p| p.to_string()).collect(),
            modifiers,
        });
        self
    }

    /// Finish the type
    pub fn build(self) -> ForeignType {
        self.ty
    }
}
