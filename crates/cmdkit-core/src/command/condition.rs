//! Operation conditions: null checks and structural equality.
//!
//! A `conditions` document is an object (or a list of objects) whose keys
//! name predicates:
//!
//! ```yaml
//! conditions:
//!   IsNotNull: "{{ token }}"
//!   AreEqual: ["{{ env }}", "prod"]
//! ```
//!
//! Every predicate must hold. Operands are resolved before testing.

use std::fmt;

use cmdkit_types::error::CommandError;
use cmdkit_types::value::Value;

use crate::variables::Resolver;

/// A single test over resolved operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    IsNull(Value),
    IsNotNull(Value),
    AreEqual(Value, Value),
    AreNotEqual(Value, Value),
}

impl Predicate {
    pub fn evaluate(&self, resolver: &Resolver<'_>) -> Result<bool, CommandError> {
        Ok(match self {
            Predicate::IsNull(operand) => resolver.resolve(operand, false)?.is_absent(),
            Predicate::IsNotNull(operand) => !resolver.resolve(operand, false)?.is_absent(),
            Predicate::AreEqual(a, b) => {
                resolver.resolve(a, false)? == resolver.resolve(b, false)?
            }
            Predicate::AreNotEqual(a, b) => {
                resolver.resolve(a, false)? != resolver.resolve(b, false)?
            }
        })
    }

    fn parse(name: &str, operand: &Value) -> Result<Self, CommandError> {
        match name.to_ascii_lowercase().as_str() {
            "isnull" => Ok(Predicate::IsNull(operand.clone())),
            "isnotnull" => Ok(Predicate::IsNotNull(operand.clone())),
            "areequal" => {
                let (a, b) = pair(name, operand)?;
                Ok(Predicate::AreEqual(a, b))
            }
            "arenotequal" => {
                let (a, b) = pair(name, operand)?;
                Ok(Predicate::AreNotEqual(a, b))
            }
            _ => Err(CommandError::structural(format!(
                "unknown condition '{name}': expected IsNull, IsNotNull, AreEqual or AreNotEqual"
            ))),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::IsNull(v) => write!(f, "IsNull({v})"),
            Predicate::IsNotNull(v) => write!(f, "IsNotNull({v})"),
            Predicate::AreEqual(a, b) => write!(f, "AreEqual({a}, {b})"),
            Predicate::AreNotEqual(a, b) => write!(f, "AreNotEqual({a}, {b})"),
        }
    }
}

fn pair(name: &str, operand: &Value) -> Result<(Value, Value), CommandError> {
    match operand.as_list() {
        Some([a, b]) => Ok((a.clone(), b.clone())),
        _ => Err(CommandError::structural(format!(
            "condition '{name}' takes a list of exactly two values"
        ))),
    }
}

/// The conjunction of an operation's predicates. Empty means "always".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    predicates: Vec<Predicate>,
}

impl Conditions {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    /// Parse a `conditions` document.
    pub fn from_document(document: &Value) -> Result<Self, CommandError> {
        let mut predicates = Vec::new();
        match document.peel() {
            Value::Object(map) => {
                for (name, operand) in map.iter() {
                    predicates.push(Predicate::parse(name, operand)?);
                }
            }
            Value::List(items) => {
                for item in items.iter() {
                    predicates.extend(Conditions::from_document(item)?.predicates);
                }
            }
            Value::Absent => {}
            other => {
                return Err(CommandError::structural(format!(
                    "'conditions' must be an object or a list of objects, got {}",
                    other.value_type()
                )));
            }
        }
        Ok(Self { predicates })
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// The first predicate that does not hold, or `None` when all hold.
    pub fn first_failing(&self, resolver: &Resolver<'_>) -> Result<Option<&Predicate>, CommandError> {
        for predicate in &self.predicates {
            if !predicate.evaluate(resolver)? {
                return Ok(Some(predicate));
            }
        }
        Ok(None)
    }

    pub fn evaluate(&self, resolver: &Resolver<'_>) -> Result<bool, CommandError> {
        Ok(self.first_failing(resolver)?.is_none())
    }
}
