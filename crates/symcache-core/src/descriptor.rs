//! Symbol Descriptors and Cache Entry Encoding
//!
//! A `SymbolDescriptor` says *where* an element lives in the foreign type graph
//! without holding a live reference to it. Descriptors have a compact text
//! form that is what the persistent cache stores:
//!
//! ```text
//! Owner                       class
//! Owner:member                field, or method without parameters
//! Owner:member:p1,p2          method with parameters
//! Owner:<init>:p1,p2          constructor
//! d1&d2&d3                    homogeneous arrays
//! {"label":"Owner:field"}     field maps (JSON)
//! ```
//!
//! Before a stored string is parsed, `check_entry` runs cheap content checks
//! for known bad patterns (signature syntax leaking from a bytecode tool,
//! truncated member entries). A failed check is reported as `Corruption`,
//! which the engine recovers from by re-running the locator.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::graph::{ClassRef, ConstructorRef, FieldRef, MethodRef, TypeGraph};

/// Member name used for constructors
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Version of the text grammar above.
///
/// Stored next to the cache epoch; a different stored value invalidates the
/// whole symbol namespace.
pub const DESCRIPTOR_FORMAT_VERSION: &str = "2";

const PART_SEPARATOR: char = ':';
const PARAM_SEPARATOR: char = ',';
const ARRAY_SEPARATOR: char = '&';

// ============================================================================
// SymbolKind
// ============================================================================

/// The shape of a resolution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    Classes,
    Method,
    Methods,
    Field,
    Fields,
    FieldMap,
    Constructor,
    Constructors,
}

impl SymbolKind {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Classes => "class array",
            SymbolKind::Method => "method",
            SymbolKind::Methods => "method array",
            SymbolKind::Field => "field",
            SymbolKind::Fields => "field array",
            SymbolKind::FieldMap => "field map",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Constructors => "constructor array",
        }
    }

    /// Element kind of an array or map kind (identity for single kinds)
    pub fn element(&self) -> SymbolKind {
        match self {
            SymbolKind::Classes => SymbolKind::Class,
            SymbolKind::Methods => SymbolKind::Method,
            SymbolKind::Fields | SymbolKind::FieldMap => SymbolKind::Field,
            SymbolKind::Constructors => SymbolKind::Constructor,
            other => *other,
        }
    }

    /// Check if entries of this kind name a member (and so need a separator)
    fn is_member(&self) -> bool {
        !matches!(self.element(), SymbolKind::Class)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A stored entry failed a content check before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corruption {
    /// Which check failed
    pub check: CorruptionCheck,
    /// The offending fragment
    pub fragment: String,
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in '{}'", self.check.as_str(), self.fragment)
    }
}

/// Content checks applied to raw stored entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionCheck {
    /// Entry or array element is empty
    Empty,
    /// Contains control characters
    ControlCharacter,
    /// Contains whitespace
    Whitespace,
    /// Contains JVM signature or internal-name syntax (`;`, `/`, `(`, `)`, `->`)
    SignatureSyntax,
    /// A bare `Intent` type name where a member entry was expected
    IntentLeak,
    /// A member entry without the owner/member separator
    MissingSeparator,
    /// A field map that is not a JSON object of strings
    MalformedMap,
}

impl CorruptionCheck {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CorruptionCheck::Empty => "empty entry",
            CorruptionCheck::ControlCharacter => "control character",
            CorruptionCheck::Whitespace => "whitespace",
            CorruptionCheck::SignatureSyntax => "signature syntax",
            CorruptionCheck::IntentLeak => "bare Intent leak",
            CorruptionCheck::MissingSeparator => "missing member separator",
            CorruptionCheck::MalformedMap => "malformed field map",
        }
    }
}

/// Errors that can occur while parsing or re-resolving descriptors
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("empty descriptor")]
    Empty,

    #[error("descriptor '{0}' has more than three parts")]
    TooManyParts(String),

    #[error("invalid name '{name}' in descriptor: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("descriptor '{descriptor}' does not name a {expected}")]
    KindMismatch {
        descriptor: String,
        expected: SymbolKind,
    },

    #[error("type '{0}' is not loaded")]
    TypeNotLoaded(String),

    #[error("member '{0}' not found")]
    MemberMissing(String),

    #[error("corrupted entry: {0}")]
    Corrupted(Corruption),

    #[error("field map serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DescriptorError {
    fn invalid_name(name: &str, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason,
        }
    }

    fn kind_mismatch(descriptor: &SymbolDescriptor, expected: SymbolKind) -> Self {
        Self::KindMismatch {
            descriptor: descriptor.to_string(),
            expected,
        }
    }
}

// ============================================================================
// SymbolDescriptor
// ============================================================================

/// Name-based reference to a program element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolDescriptor {
    /// Fully qualified owning type
    pub owning_type: String,
    /// Member name (empty for classes, `<init>` for constructors)
    pub member_name: String,
    /// Parameter type names (empty for classes and fields)
    pub parameter_types: Vec<String>,
}

impl SymbolDescriptor {
    /// Descriptor for a type
    pub fn class(owner: impl Into<String>) -> Self {
        Self {
            owning_type: owner.into(),
            member_name: String::new(),
            parameter_types: Vec::new(),
        }
    }

    /// Descriptor for a field
    pub fn field(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owning_type: owner.into(),
            member_name: name.into(),
            parameter_types: Vec::new(),
        }
    }

    /// Descriptor for a method
    pub fn method(
        owner: impl Into<String>,
        name: impl Into<String>,
        parameter_types: Vec<String>,
    ) -> Self {
        Self {
            owning_type: owner.into(),
            member_name: name.into(),
            parameter_types,
        }
    }

    /// Descriptor for a constructor
    pub fn constructor(owner: impl Into<String>, parameter_types: Vec<String>) -> Self {
        Self {
            owning_type: owner.into(),
            member_name: CONSTRUCTOR_NAME.to_string(),
            parameter_types,
        }
    }

    /// Check that every name can be written to and read back from the text form
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.owning_type.is_empty() {
            return Err(DescriptorError::invalid_name("", "owning type is empty"));
        }
        validate_name(&self.owning_type)?;
        validate_name(&self.member_name)?;
        for param in &self.parameter_types {
            if param.is_empty() {
                return Err(DescriptorError::invalid_name("", "parameter type is empty"));
            }
            validate_name(param)?;
        }
        Ok(())
    }

    /// Serialize to the text form, validating names first
    pub fn encode(&self) -> Result<String, DescriptorError> {
        self.validate()?;
        Ok(self.to_string())
    }

    /// Check if this descriptor names a constructor
    pub fn is_constructor(&self) -> bool {
        self.member_name == CONSTRUCTOR_NAME
    }

    fn load_owner(&self, graph: &dyn TypeGraph) -> Result<ClassRef, DescriptorError> {
        graph
            .load_type(&self.owning_type)
            .map(ClassRef::new)
            .ok_or_else(|| DescriptorError::TypeNotLoaded(self.owning_type.clone()))
    }

    /// Re-resolve as a class
    pub fn resolve_class(&self, graph: &dyn TypeGraph) -> Result<ClassRef, DescriptorError> {
        if !self.member_name.is_empty() || !self.parameter_types.is_empty() {
            return Err(DescriptorError::kind_mismatch(self, SymbolKind::Class));
        }
        self.load_owner(graph)
    }

    /// Re-resolve as a method, by exact name and parameter types
    pub fn resolve_method(&self, graph: &dyn TypeGraph) -> Result<MethodRef, DescriptorError> {
        if self.member_name.is_empty() || self.is_constructor() {
            return Err(DescriptorError::kind_mismatch(self, SymbolKind::Method));
        }
        let owner = self.load_owner(graph)?;
        let found = owner.methods().find(|m| {
            let info = m.info();
            info.name == self.member_name && info.parameter_types == self.parameter_types
        });
        found.ok_or_else(|| DescriptorError::MemberMissing(self.to_string()))
    }

    /// Re-resolve as a field, by exact name
    pub fn resolve_field(&self, graph: &dyn TypeGraph) -> Result<FieldRef, DescriptorError> {
        if self.member_name.is_empty() || self.is_constructor() || !self.parameter_types.is_empty()
        {
            return Err(DescriptorError::kind_mismatch(self, SymbolKind::Field));
        }
        let owner = self.load_owner(graph)?;
        let found = owner.fields().find(|f| f.info().name == self.member_name);
        found.ok_or_else(|| DescriptorError::MemberMissing(self.to_string()))
    }

    /// Re-resolve as a constructor, by exact parameter types
    pub fn resolve_constructor(
        &self,
        graph: &dyn TypeGraph,
    ) -> Result<ConstructorRef, DescriptorError> {
        if !self.is_constructor() {
            return Err(DescriptorError::kind_mismatch(self, SymbolKind::Constructor));
        }
        let owner = self.load_owner(graph)?;
        let found = owner
            .constructors()
            .find(|c| c.info().parameter_types == self.parameter_types);
        found.ok_or_else(|| DescriptorError::MemberMissing(self.to_string()))
    }
}

fn validate_name(name: &str) -> Result<(), DescriptorError> {
    if name.contains([PART_SEPARATOR, PARAM_SEPARATOR, ARRAY_SEPARATOR]) {
        return Err(DescriptorError::invalid_name(name, "contains a separator"));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(DescriptorError::invalid_name(
            name,
            "contains whitespace or control characters",
        ));
    }
    if has_signature_syntax(name) {
        return Err(DescriptorError::invalid_name(
            name,
            "contains bytecode signature syntax",
        ));
    }
    Ok(())
}

/// Check if one type or member name carries bytecode signature syntax.
///
/// Binary names of arrays (`[Ljava.lang.String;`, `[[I`) are plain names:
/// their `;` only closes the element type.
fn has_signature_syntax(name: &str) -> bool {
    if name.contains("->") || name.contains(['(', ')', '/']) {
        return true;
    }
    let element = name.trim_start_matches('[');
    if element.len() == name.len() {
        return name.contains(';');
    }
    match element.strip_prefix('L').and_then(|e| e.strip_suffix(';')) {
        Some(inner) => inner.is_empty() || inner.contains(';'),
        None => element.contains(';'),
    }
}

impl fmt::Display for SymbolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.owning_type)?;
        if !self.member_name.is_empty() || !self.parameter_types.is_empty() {
            write!(f, "{}{}", PART_SEPARATOR, self.member_name)?;
        }
        if !self.parameter_types.is_empty() {
            write!(
                f,
                "{}{}",
                PART_SEPARATOR,
                self.parameter_types.join(&PARAM_SEPARATOR.to_string())
            )?;
        }
        Ok(())
    }
}

impl FromStr for SymbolDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(DescriptorError::Empty);
        }
        let parts: Vec<&str> = s.split(PART_SEPARATOR).collect();
        if parts.len() > 3 {
            return Err(DescriptorError::TooManyParts(s.to_string()));
        }

        let descriptor = SymbolDescriptor {
            owning_type: parts[0].to_string(),
            member_name: parts.get(1).copied().unwrap_or_default().to_string(),
            parameter_types: match parts.get(2) {
                Some(params) => params.split(PARAM_SEPARATOR).map(str::to_string).collect(),
                None => Vec::new(),
            },
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

// ============================================================================
// Corruption checks
// ============================================================================

/// Run content checks on a raw stored entry of the given kind.
///
/// Cheap and conservative: only patterns that a correct encoder can never
/// produce are rejected.
pub fn check_entry(kind: SymbolKind, raw: &str) -> Result<(), Corruption> {
    match kind {
        SymbolKind::FieldMap => {
            let map: BTreeMap<String, String> =
                serde_json::from_str(raw).map_err(|_| Corruption {
                    check: CorruptionCheck::MalformedMap,
                    fragment: raw.to_string(),
                })?;
            map.values()
                .try_for_each(|value| check_element(SymbolKind::Field, value))
        }
        SymbolKind::Classes
        | SymbolKind::Methods
        | SymbolKind::Fields
        | SymbolKind::Constructors => raw
            .split(ARRAY_SEPARATOR)
            .try_for_each(|element| check_element(kind.element(), element)),
        single => check_element(single, raw),
    }
}

fn check_element(kind: SymbolKind, raw: &str) -> Result<(), Corruption> {
    let fail = |check| {
        Err(Corruption {
            check,
            fragment: raw.to_string(),
        })
    };

    if raw.is_empty() {
        return fail(CorruptionCheck::Empty);
    }
    if raw.chars().any(char::is_control) {
        return fail(CorruptionCheck::ControlCharacter);
    }
    if raw.chars().any(char::is_whitespace) {
        return fail(CorruptionCheck::Whitespace);
    }
    if raw
        .split([PART_SEPARATOR, PARAM_SEPARATOR])
        .any(has_signature_syntax)
    {
        return fail(CorruptionCheck::SignatureSyntax);
    }
    if kind.is_member() && !raw.contains(PART_SEPARATOR) {
        if raw.contains("Intent") {
            return fail(CorruptionCheck::IntentLeak);
        }
        return fail(CorruptionCheck::MissingSeparator);
    }
    Ok(())
}

// ============================================================================
// Resolvable
// ============================================================================

/// A resolution result that can be stored in and restored from the cache.
pub trait Resolvable: Sized {
    /// Shape of this result
    const KIND: SymbolKind;

    /// Encode into the stored text form
    fn encode(&self) -> Result<String, DescriptorError>;

    /// Check, parse and re-resolve a stored entry against `graph`
    fn decode(raw: &str, graph: &dyn TypeGraph) -> Result<Self, DescriptorError>;

    /// Check if the result holds no elements (arrays and maps only)
    fn is_empty_result(&self) -> bool {
        false
    }

    /// Short human-readable form for logs
    fn summary(&self) -> String;
}

fn checked<'a>(kind: SymbolKind, raw: &'a str) -> Result<&'a str, DescriptorError> {
    check_entry(kind, raw).map_err(DescriptorError::Corrupted)?;
    Ok(raw)
}

macro_rules! resolvable_pair {
    ($handle:ty, $kind:ident, $array_kind:ident, $resolve:ident) => {
        impl Resolvable for $handle {
            const KIND: SymbolKind = SymbolKind::$kind;

            fn encode(&self) -> Result<String, DescriptorError> {
                self.descriptor().encode()
            }

            fn decode(raw: &str, graph: &dyn TypeGraph) -> Result<Self, DescriptorError> {
                let descriptor: SymbolDescriptor = checked(Self::KIND, raw)?.parse()?;
                descriptor.$resolve(graph)
            }

            fn summary(&self) -> String {
                self.describe()
            }
        }

        impl Resolvable for Vec<$handle> {
            const KIND: SymbolKind = SymbolKind::$array_kind;

            fn encode(&self) -> Result<String, DescriptorError> {
                let parts = self
                    .iter()
                    .map(|h| h.descriptor().encode())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parts.join(&ARRAY_SEPARATOR.to_string()))
            }

            fn decode(raw: &str, graph: &dyn TypeGraph) -> Result<Self, DescriptorError> {
                checked(Self::KIND, raw)?
                    .split(ARRAY_SEPARATOR)
                    .map(|part| part.parse::<SymbolDescriptor>()?.$resolve(graph))
                    .collect()
            }

            fn is_empty_result(&self) -> bool {
                self.is_empty()
            }

            fn summary(&self) -> String {
                format!("{} x {}", self.len(), SymbolKind::$kind)
            }
        }
    };
}

resolvable_pair!(ClassRef, Class, Classes, resolve_class);
resolvable_pair!(MethodRef, Method, Methods, resolve_method);
resolvable_pair!(FieldRef, Field, Fields, resolve_field);
resolvable_pair!(ConstructorRef, Constructor, Constructors, resolve_constructor);

impl Resolvable for BTreeMap<String, FieldRef> {
    const KIND: SymbolKind = SymbolKind::FieldMap;

    fn encode(&self) -> Result<String, DescriptorError> {
        let encoded = self
            .iter()
            .map(|(label, field)| Ok((label.clone(), field.descriptor().encode()?)))
            .collect::<Result<BTreeMap<String, String>, DescriptorError>>()?;
        Ok(serde_json::to_string(&encoded)?)
    }

    fn decode(raw: &str, graph: &dyn TypeGraph) -> Result<Self, DescriptorError> {
        let encoded: BTreeMap<String, String> = serde_json::from_str(checked(Self::KIND, raw)?)?;
        encoded
            .into_iter()
            .map(|(label, value)| {
                let field = value.parse::<SymbolDescriptor>()?.resolve_field(graph)?;
                Ok((label, field))
            })
            .collect()
    }

    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }

    fn summary(&self) -> String {
        format!("{} x field (map)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ClassBuilder, ClassPool, Modifiers};
    use pretty_assertions::assert_eq;

    fn pool() -> ClassPool {
        ClassPool::new().with_class(
            ClassBuilder::new("SomeHelper")
                .method(
                    "send",
                    &["java.lang.String", "int", "boolean"],
                    "void",
                    Modifiers::PUBLIC,
                )
                .method("send", &[], "void", Modifiers::PUBLIC)
                .field("count", "int", Modifiers::PRIVATE)
                .constructor(&[], Modifiers::PUBLIC)
                .constructor(&["int"], Modifiers::PUBLIC),
        )
    }

    #[test]
    fn test_text_forms() {
        assert_eq!(SymbolDescriptor::class("a.B").to_string(), "a.B");
        assert_eq!(SymbolDescriptor::field("a.B", "c").to_string(), "a.B:c");
        assert_eq!(
            SymbolDescriptor::method("a.B", "m", vec![]).to_string(),
            "a.B:m"
        );
        assert_eq!(
            SymbolDescriptor::method(
                "SomeHelper",
                "send",
                vec!["java.lang.String".into(), "int".into(), "boolean".into()]
            )
            .to_string(),
            "SomeHelper:send:java.lang.String,int,boolean"
        );
        assert_eq!(
            SymbolDescriptor::constructor("a.B", vec!["int".into()]).to_string(),
            "a.B:<init>:int"
        );
    }

    #[test]
    fn test_round_trip() {
        let descriptors = vec![
            SymbolDescriptor::class("a.B$C"),
            SymbolDescriptor::field("a.B", "c"),
            SymbolDescriptor::method("a.B", "m", vec!["int[]".into(), "a.C".into()]),
            SymbolDescriptor::method("a.B", "", vec!["int".into()]),
            SymbolDescriptor::constructor("a.B", vec![]),
        ];
        for d in descriptors {
            let parsed: SymbolDescriptor = d.encode().unwrap().parse().unwrap();
            assert_eq!(parsed, d);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("".parse::<SymbolDescriptor>(), Err(DescriptorError::Empty)));
        assert!(matches!(
            "a:b:c:d".parse::<SymbolDescriptor>(),
            Err(DescriptorError::TooManyParts(_))
        ));
        assert!(matches!(
            ":m".parse::<SymbolDescriptor>(),
            Err(DescriptorError::InvalidName { .. })
        ));
        assert!(matches!(
            "a.B:m:".parse::<SymbolDescriptor>(),
            Err(DescriptorError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_separator_in_name() {
        let d = SymbolDescriptor::field("a.B", "x:y");
        assert!(d.encode().is_err());
    }

    #[test]
    fn test_resolve_against_graph() {
        let pool = pool();
        let m = "SomeHelper:send:java.lang.String,int,boolean"
            .parse::<SymbolDescriptor>()
            .unwrap()
            .resolve_method(&pool)
            .unwrap();
        assert_eq!(m.info().parameter_count(), 3);

        let overload = "SomeHelper:send"
            .parse::<SymbolDescriptor>()
            .unwrap()
            .resolve_method(&pool)
            .unwrap();
        assert_eq!(overload.info().parameter_count(), 0);

        let ctor = "SomeHelper:<init>:int"
            .parse::<SymbolDescriptor>()
            .unwrap()
            .resolve_constructor(&pool)
            .unwrap();
        assert_eq!(ctor.info().parameter_types, vec!["int".to_string()]);

        assert!(matches!(
            SymbolDescriptor::class("Gone").resolve_class(&pool),
            Err(DescriptorError::TypeNotLoaded(_))
        ));
        assert!(matches!(
            SymbolDescriptor::field("SomeHelper", "gone").resolve_field(&pool),
            Err(DescriptorError::MemberMissing(_))
        ));
        assert!(matches!(
            SymbolDescriptor::field("SomeHelper", "count").resolve_class(&pool),
            Err(DescriptorError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_handle_round_trip_is_structural() {
        let pool = pool();
        let owner = ClassRef::new(pool.load_type("SomeHelper").unwrap());
        for method in owner.methods() {
            let restored = MethodRef::decode(&method.encode().unwrap(), &pool).unwrap();
            assert_eq!(restored, method);
        }
        for ctor in owner.constructors() {
            let restored = ConstructorRef::decode(&ctor.encode().unwrap(), &pool).unwrap();
            assert_eq!(restored, ctor);
        }
    }

    #[test]
    fn test_corruption_checks() {
        let check = |kind, raw| check_entry(kind, raw).map_err(|c| c.check);
        assert_eq!(check(SymbolKind::Method, "a.B:m:int"), Ok(()));
        assert_eq!(check(SymbolKind::Class, "a.B"), Ok(()));
        assert_eq!(check(SymbolKind::Method, ""), Err(CorruptionCheck::Empty));
        assert_eq!(
            check(SymbolKind::Method, "Lcom/host/B;->m(I)V"),
            Err(CorruptionCheck::SignatureSyntax)
        );
        assert_eq!(
            check(SymbolKind::Method, "android.content.Intent"),
            Err(CorruptionCheck::IntentLeak)
        );
        assert_eq!(
            check(SymbolKind::Field, "a.B"),
            Err(CorruptionCheck::MissingSeparator)
        );
        assert_eq!(
            check(SymbolKind::Method, "a.B:m\u{1}"),
            Err(CorruptionCheck::ControlCharacter)
        );
        assert_eq!(
            check(SymbolKind::Methods, "a.B:m&&a.B:n"),
            Err(CorruptionCheck::Empty)
        );
        assert_eq!(
            check(SymbolKind::FieldMap, "not json"),
            Err(CorruptionCheck::MalformedMap)
        );
        assert_eq!(check(SymbolKind::FieldMap, r#"{"x":"a.B:c"}"#), Ok(()));
    }

    #[test]
    fn test_array_binary_names_pass_checks() {
        let d = SymbolDescriptor::method(
            "com.host.Sender",
            "a",
            vec!["[Ljava.lang.String;".into(), "int".into(), "[[I".into()],
        );
        let encoded = d.encode().unwrap();
        assert_eq!(encoded, "com.host.Sender:a:[Ljava.lang.String;,int,[[I");
        assert_eq!(check_entry(SymbolKind::Method, &encoded), Ok(()));
        assert_eq!(encoded.parse::<SymbolDescriptor>().unwrap(), d);

        let check = |raw| check_entry(SymbolKind::Method, raw).map_err(|c| c.check);
        assert_eq!(
            check("a.B:m:Ljava.lang.String;"),
            Err(CorruptionCheck::SignatureSyntax)
        );
        assert_eq!(check("a.B:m:[L;"), Err(CorruptionCheck::SignatureSyntax));
        assert_eq!(
            check("a.B:m:[Ljava/lang/String;"),
            Err(CorruptionCheck::SignatureSyntax)
        );
    }

    #[test]
    fn test_encode_rejects_what_checks_reject() {
        for name in ["Lcom.host.B;", "m(I)V", "com/host/B", "a->b", "[La;b;"] {
            assert!(
                SymbolDescriptor::method("a.B", "m", vec![name.to_string()])
                    .encode()
                    .is_err(),
                "{name} should not be encodable"
            );
        }
    }

    #[test]
    fn test_arrays_and_maps() {
        let pool = pool();
        let owner = ClassRef::new(pool.load_type("SomeHelper").unwrap());
        let methods: Vec<MethodRef> = owner.methods().collect();
        let encoded = methods.encode().unwrap();
        assert_eq!(
            encoded,
            "SomeHelper:send:java.lang.String,int,boolean&SomeHelper:send"
        );
        assert_eq!(Vec::<MethodRef>::decode(&encoded, &pool).unwrap(), methods);

        let mut map = BTreeMap::new();
        map.insert("count".to_string(), owner.fields().next().unwrap());
        let encoded = map.encode().unwrap();
        assert_eq!(encoded, r#"{"count":"SomeHelper:count"}"#);
        assert_eq!(
            BTreeMap::<String, FieldRef>::decode(&encoded, &pool).unwrap(),
            map
        );
    }

    #[test]
    fn test_decode_reports_corruption_distinctly() {
        let pool = pool();
        let err = MethodRef::decode("LSomeHelper;", &pool).unwrap_err();
        assert!(matches!(err, DescriptorError::Corrupted(_)));
    }
}
