//! Cross-reference queries.
//!
//! Some elements are easiest to find by what they *use* rather than by their
//! shape: the class that references a distinctive log string, the method
//! returning a given type. An `XrefEngine` answers those questions with
//! descriptors, which locators then resolve through the ordinary loader.
//!
//! `ClassPool` carries a reference implementation that scans its own members.

use std::fmt;

use thiserror::Error;

use crate::descriptor::SymbolDescriptor;
use crate::graph::{ClassPool, ForeignType};

/// A cross-reference question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XrefQuery {
    /// Types whose methods reference every one of `strings`
    ClassUsingStrings { strings: Vec<String> },
    /// Methods referencing every one of `strings`, optionally within one type
    MethodUsingStrings {
        strings: Vec<String>,
        in_class: Option<String>,
    },
    /// Methods with the given return type
    MethodsWithReturnType { return_type: String },
    /// Fields of the given type, optionally within one type
    FieldsOfType {
        field_type: String,
        in_class: Option<String>,
    },
}

impl XrefQuery {
    /// Types referencing all of `strings`
    pub fn class_using_strings<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        XrefQuery::ClassUsingStrings {
            strings: strings.into_iter().map(Into::into).collect(),
        }
    }

    /// Methods referencing all of `strings`
    pub fn method_using_strings<I, S>(strings: I, in_class: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        XrefQuery::MethodUsingStrings {
            strings: strings.into_iter().map(Into::into).collect(),
            in_class: in_class.map(str::to_string),
        }
    }
}

impl fmt::Display for XrefQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XrefQuery::ClassUsingStrings { strings } => {
                write!(f, "class using strings {:?}", strings)
            }
            XrefQuery::MethodUsingStrings { strings, in_class } => {
                write!(f, "method using strings {:?}", strings)?;
                if let Some(class) = in_class {
                    write!(f, " in {}", class)?;
                }
                Ok(())
            }
            XrefQuery::MethodsWithReturnType { return_type } => {
                write!(f, "methods returning {}", return_type)
            }
            XrefQuery::FieldsOfType {
                field_type,
                in_class,
            } => {
                write!(f, "fields of type {}", field_type)?;
                if let Some(class) = in_class {
                    write!(f, " in {}", class)?;
                }
                Ok(())
            }
        }
    }
}

/// Errors reported by a cross-reference engine
#[derive(Debug, Error)]
pub enum XrefError {
    #[error("cross-reference index unavailable: {0}")]
    Unavailable(String),

    #[error("unsupported query: {0}")]
    Unsupported(String),
}

/// Answers cross-reference queries about the foreign program.
pub trait XrefEngine: Send + Sync {
    /// Run a query; results are in a deterministic order
    fn query(&self, query: &XrefQuery) -> Result<Vec<SymbolDescriptor>, XrefError>;
}

fn uses_all(ty: &ForeignType, strings: &[String]) -> bool {
    strings.iter().all(|s| {
        ty.methods
            .iter()
            .any(|m| m.strings.iter().any(|used| used == s))
    })
}

impl XrefEngine for ClassPool {
    fn query(&self, query: &XrefQuery) -> Result<Vec<SymbolDescriptor>, XrefError> {
        let in_scope = |ty: &ForeignType, scope: &Option<String>| {
            scope.as_deref().is_none_or(|name| ty.name == name)
        };

        let mut results = Vec::new();
        match query {
            XrefQuery::ClassUsingStrings { strings } => {
                for ty in self.iter().filter(|ty| uses_all(ty, strings)) {
                    results.push(SymbolDescriptor::class(ty.name.clone()));
                }
            }
            XrefQuery::MethodUsingStrings { strings, in_class } => {
                for ty in self.iter().filter(|ty| in_scope(ty, in_class)) {
                    for m in &ty.methods {
                        if strings.iter().all(|s| m.strings.contains(s)) {
                            results.push(SymbolDescriptor::method(
                                ty.name.clone(),
                                m.name.clone(),
                                m.parameter_types.clone(),
                            ));
                        }
                    }
                }
            }
            XrefQuery::MethodsWithReturnType { return_type } => {
                for ty in self.iter() {
                    for m in ty.methods.iter().filter(|m| &m.return_type == return_type) {
                        results.push(SymbolDescriptor::method(
                            ty.name.clone(),
                            m.name.clone(),
                            m.parameter_types.clone(),
                        ));
                    }
                }
            }
            XrefQuery::FieldsOfType {
                field_type,
                in_class,
            } => {
                for ty in self.iter().filter(|ty| in_scope(ty, in_class)) {
                    for field in ty.fields.iter().filter(|f| &f.field_type == field_type) {
                        results.push(SymbolDescriptor::field(ty.name.clone(), field.name.clone()));
                    }
                }
            }
        }
        Ok(results)
    }
}
