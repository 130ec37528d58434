//! Structural Predicates
//!
//! Name-free member matching modelled as plain data plus matcher functions.
//! Filters compose by builder calls (parameter count, parameter types,
//! return type, modifiers, name pattern) and describe themselves, so a failed
//! search can log exactly what it was looking for.
//!
//! Any `Fn(&M) -> bool` is also a predicate, for one-off conditions the
//! builders do not cover.

use regex::Regex;
use std::fmt;

use crate::graph::{ConstructorInfo, FieldInfo, ForeignType, MethodInfo, Modifiers};

/// A total, side-effect-free condition over a member signature.
pub trait Predicate<M: ?Sized> {
    /// Evaluate the predicate
    fn test(&self, member: &M) -> bool;

    /// Short description used in diagnostics
    fn describe(&self) -> String {
        "custom predicate".to_string()
    }
}

impl<M: ?Sized, F> Predicate<M> for F
where
    F: Fn(&M) -> bool,
{
    fn test(&self, member: &M) -> bool {
        self(member)
    }
}

// ============================================================================
// Name Matching
// ============================================================================

/// How to match a type or member name.
#[derive(Debug, Clone)]
pub enum NameMatch {
    /// Whole-name equality
    Exact(String),
    /// Name starts with the pattern
    StartsWith(String),
    /// Name ends with the pattern (e.g. `"jid.UserJid"`)
    EndsWith(String),
    /// Name contains the pattern
    Contains(String),
    /// Name matches the regular expression
    Regex(Regex),
}

impl NameMatch {
    /// Build a regex matcher
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(NameMatch::Regex(Regex::new(pattern)?))
    }

    /// Check a name against this rule
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Exact(p) => name == p,
            NameMatch::StartsWith(p) => name.starts_with(p.as_str()),
            NameMatch::EndsWith(p) => name.ends_with(p.as_str()),
            NameMatch::Contains(p) => name.contains(p.as_str()),
            NameMatch::Regex(re) => re.is_match(name),
        }
    }
}

impl fmt::Display for NameMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMatch::Exact(p) => write!(f, "name == \"{}\"", p),
            NameMatch::StartsWith(p) => write!(f, "name starts with \"{}\"", p),
            NameMatch::EndsWith(p) => write!(f, "name ends with \"{}\"", p),
            NameMatch::Contains(p) => write!(f, "name contains \"{}\"", p),
            NameMatch::Regex(re) => write!(f, "name matches /{}/", re.as_str()),
        }
    }
}

impl Predicate<ForeignType> for NameMatch {
    fn test(&self, member: &ForeignType) -> bool {
        self.matches(&member.name)
    }

    fn describe(&self) -> String {
        format!("type {}", self)
    }
}

// ============================================================================
// Shared clauses
// ============================================================================

/// Parameter-list clauses shared by methods and constructors.
#[derive(Debug, Clone, Default)]
struct ParamClauses {
    count: Option<usize>,
    exact: Option<Vec<String>>,
    positions: Vec<(usize, NameMatch)>,
}

impl ParamClauses {
    fn matches(&self, params: &[String]) -> bool {
        if let Some(count) = self.count {
            if params.len() != count {
                return false;
            }
        }
        if let Some(ref exact) = self.exact {
            if params != exact.as_slice() {
                return false;
            }
        }
        self.positions.iter().all(|(index, rule)| {
            params
                .get(*index)
                .map(|p| rule.matches(p))
                .unwrap_or(false)
        })
    }

    fn write(&self, parts: &mut Vec<String>) {
        if let Some(count) = self.count {
            parts.push(format!("{} params", count));
        }
        if let Some(ref exact) = self.exact {
            parts.push(format!("params ({})", exact.join(", ")));
        }
        for (index, rule) in &self.positions {
            parts.push(format!("param[{}] {}", index, rule).replace("name ", "type "));
        }
    }
}

/// Modifier clauses shared by every member kind.
#[derive(Debug, Clone, Copy, Default)]
struct ModifierClauses {
    required: Modifiers,
    forbidden: Modifiers,
}

impl ModifierClauses {
    fn matches(&self, modifiers: Modifiers) -> bool {
        modifiers.contains(self.required) && !modifiers.intersects(self.forbidden)
    }

    fn write(&self, parts: &mut Vec<String>) {
        if !self.required.is_empty() {
            parts.push(format!("with {:?}", self.required));
        }
        if !self.forbidden.is_empty() {
            parts.push(format!("without {:?}", self.forbidden));
        }
    }
}

fn join_parts(kind: &str, parts: Vec<String>) -> String {
    if parts.is_empty() {
        format!("any {}", kind)
    } else {
        format!("{} where {}", kind, parts.join(", "))
    }
}

// ============================================================================
// MethodFilter
// ============================================================================

/// Structural filter over method signatures.
///
/// # Example
///
/// ```
/// use symcache_core::predicate::MethodFilter;
/// use symcache_core::graph::Modifiers;
///
/// let filter = MethodFilter::new()
///     .params(["java.lang.String", "int", "boolean"])
///     .returns("void")
///     .without(Modifiers::STATIC);
/// assert!(filter
///     .to_string()
///     .contains("params (java.lang.String, int, boolean)"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MethodFilter {
    name: Option<NameMatch>,
    params: ParamClauses,
    return_type: Option<NameMatch>,
    modifiers: ModifierClauses,
}

impl MethodFilter {
    /// Filter that accepts every method
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a name rule
    pub fn name(mut self, rule: NameMatch) -> Self {
        self.name = Some(rule);
        self
    }

    /// Require an exact parameter count
    pub fn param_count(mut self, count: usize) -> Self {
        self.params.count = Some(count);
        self
    }

    /// Require the exact parameter type list
    pub fn params<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.exact = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Require the parameter at `index` to match a type-name rule
    pub fn param_at(mut self, index: usize, rule: NameMatch) -> Self {
        self.params.positions.push((index, rule));
        self
    }

    /// Require an exact return type
    pub fn returns(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(NameMatch::Exact(return_type.into()));
        self
    }

    /// Require the return type to match a rule
    pub fn returns_matching(mut self, rule: NameMatch) -> Self {
        self.return_type = Some(rule);
        self
    }

    /// Require all of the given modifiers
    pub fn with(mut self, modifiers: Modifiers) -> Self {
        self.modifiers.required |= modifiers;
        self
    }

    /// Reject any of the given modifiers
    pub fn without(mut self, modifiers: Modifiers) -> Self {
        self.modifiers.forbidden |= modifiers;
        self
    }
}

impl Predicate<MethodInfo> for MethodFilter {
    fn test(&self, member: &MethodInfo) -> bool {
        self.name
            .as_ref()
            .map(|rule| rule.matches(&member.name))
            .unwrap_or(true)
            && self.params.matches(&member.parameter_types)
            && self
                .return_type
                .as_ref()
                .map(|rule| rule.matches(&member.return_type))
                .unwrap_or(true)
            && self.modifiers.matches(member.modifiers)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref rule) = self.name {
            parts.push(rule.to_string());
        }
        self.params.write(&mut parts);
        if let Some(ref rule) = self.return_type {
            parts.push(rule.to_string().replace("name ", "return "));
        }
        self.modifiers.write(&mut parts);
        f.write_str(&join_parts("method", parts))
    }
}

// ============================================================================
// FieldFilter
// ============================================================================

/// Structural filter over field signatures.
#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    name: Option<NameMatch>,
    field_type: Option<NameMatch>,
    modifiers: ModifierClauses,
}

impl FieldFilter {
    /// Filter that accepts every field
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a name rule
    pub fn name(mut self, rule: NameMatch) -> Self {
        self.name = Some(rule);
        self
    }

    /// Require an exact field type
    pub fn of_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(NameMatch::Exact(field_type.into()));
        self
    }

    /// Require the field type to match a rule
    pub fn type_matching(mut self, rule: NameMatch) -> Self {
        self.field_type = Some(rule);
        self
    }

    /// Require all of the given modifiers
    pub fn with(mut self, modifiers: Modifiers) -> Self {
        self.modifiers.required |= modifiers;
        self
    }

    /// Reject any of the given modifiers
    pub fn without(mut self, modifiers: Modifiers) -> Self {
        self.modifiers.forbidden |= modifiers;
        self
    }
}

impl Predicate<FieldInfo> for FieldFilter {
    fn test(&self, member: &FieldInfo) -> bool {
        self.name
            .as_ref()
            .map(|rule| rule.matches(&member.name))
            .unwrap_or(true)
            && self
                .field_type
                .as_ref()
                .map(|rule| rule.matches(&member.field_type))
                .unwrap_or(true)
            && self.modifiers.matches(member.modifiers)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref rule) = self.name {
            parts.push(rule.to_string());
        }
        if let Some(ref rule) = self.field_type {
            parts.push(rule.to_string().replace("name ", "type "));
        }
        self.modifiers.write(&mut parts);
        f.write_str(&join_parts("field", parts))
    }
}

// ============================================================================
// ConstructorFilter
// ============================================================================

/// Structural filter over constructor signatures.
#[derive(Debug, Clone, Default)]
pub struct ConstructorFilter {
    params: ParamClauses,
    modifiers: ModifierClauses,
}

impl ConstructorFilter {
    /// Filter that accepts every constructor
    pub fn new() -> Self {
        Self::default()
    }

    /// Require an exact parameter count
    pub fn param_count(mut self, count: usize) -> Self {
        self.params.count = Some(count);
        self
    }

    /// Require the exact parameter type list
    pub fn params<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.exact = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Require the parameter at `index` to match a type-name rule
    pub fn param_at(mut self, index: usize, rule: NameMatch) -> Self {
        self.params.positions.push((index, rule));
        self
    }

    /// Require all of the given modifiers
    pub fn with(mut self, modifiers: Modifiers) -> Self {
        self.modifiers.required |= modifiers;
        self
    }

    /// Reject any of the given modifiers
    pub fn without(mut self, modifiers: Modifiers) -> Self {
        self.modifiers.forbidden |= modifiers;
        self
    }
}

impl Predicate<ConstructorInfo> for ConstructorFilter {
    fn test(&self, member: &ConstructorInfo) -> bool {
        self.params.matches(&member.parameter_types) && self.modifiers.matches(member.modifiers)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConstructorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        self.params.write(&mut parts);
        self.modifiers.write(&mut parts);
        f.write_str(&join_parts("constructor", parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, params: &[&str], ret: &str, modifiers: Modifiers) -> MethodInfo {
        MethodInfo {
            name: name.to_string(),
            parameter_types: params.iter().map(|p| p.to_string()).collect(),
            return_type: ret.to_string(),
            modifiers,
            strings: vec![],
        }
    }

    #[test]
    fn test_name_match_variants() {
        assert!(NameMatch::Exact("abc".into()).matches("abc"));
        assert!(!NameMatch::Exact("abc".into()).matches("abcd"));
        assert!(NameMatch::StartsWith("com.".into()).matches("com.host.X"));
        assert!(NameMatch::EndsWith("jid.UserJid".into()).matches("com.host.jid.UserJid"));
        assert!(NameMatch::Contains("Voip".into()).matches("com.host.VoipActivity"));
        assert!(NameMatch::regex(r"^X\.[a-z]{2}$").unwrap().matches("X.ab"));
    }

    #[test]
    fn test_method_filter_params_and_modifiers() {
        let target = method(
            "send",
            &["java.lang.String", "int", "boolean"],
            "void",
            Modifiers::PUBLIC,
        );
        let filter = MethodFilter::new()
            .params(["java.lang.String", "int", "boolean"])
            .returns("void")
            .without(Modifiers::STATIC);
        assert!(filter.test(&target));

        let static_one = method(
            "send",
            &["java.lang.String", "int", "boolean"],
            "void",
            Modifiers::PUBLIC | Modifiers::STATIC,
        );
        assert!(!filter.test(&static_one));
        assert!(!filter.test(&method("send", &["int"], "void", Modifiers::PUBLIC)));
    }

    #[test]
    fn test_method_filter_positions() {
        let filter = MethodFilter::new()
            .param_count(2)
            .param_at(1, NameMatch::EndsWith("UserJid".into()));
        assert!(filter.test(&method(
            "a",
            &["int", "com.host.UserJid"],
            "void",
            Modifiers::empty()
        )));
        assert!(!filter.test(&method("a", &["int"], "void", Modifiers::empty())));
    }

    #[test]
    fn test_field_filter() {
        let field = FieldInfo {
            name: "A00".to_string(),
            field_type: "com.host.Jid".to_string(),
            modifiers: Modifiers::STATIC | Modifiers::FINAL,
        };
        assert!(FieldFilter::new().with(Modifiers::STATIC).test(&field));
        assert!(!FieldFilter::new().without(Modifiers::FINAL).test(&field));
        assert!(FieldFilter::new().of_type("com.host.Jid").test(&field));
    }

    #[test]
    fn test_constructor_filter() {
        let ctor = ConstructorInfo {
            parameter_types: vec!["int".into(); 8],
            modifiers: Modifiers::PUBLIC,
        };
        assert!(ConstructorFilter::new().param_count(8).test(&ctor));
        assert!(!ConstructorFilter::new().param_count(7).test(&ctor));
    }

    #[test]
    fn test_closure_predicate() {
        let pred = |m: &MethodInfo| m.parameter_count() == 1;
        assert!(pred.test(&method("x", &["int"], "void", Modifiers::empty())));
        assert_eq!(Predicate::<MethodInfo>::describe(&pred), "custom predicate");
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(MethodFilter::new().to_string(), "any method");
        let desc = MethodFilter::new()
            .name(NameMatch::Exact("run".into()))
            .param_count(3)
            .with(Modifiers::STATIC)
            .to_string();
        assert!(desc.starts_with("method where"));
        assert!(desc.contains("3 params"));
        assert!(desc.contains("STATIC"));
        assert_eq!(
            FieldFilter::new().of_type("int").to_string(),
            "field where type == \"int\""
        );
    }
}
