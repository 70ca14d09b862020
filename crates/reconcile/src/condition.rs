//! Guard conditions - typed boolean expression trees over the fact store.
//!
//! Evaluation is pure and total. A guard referencing a missing fact, or a
//! fact that fails integer coercion, evaluates to `false`; it never raises.
//! An unavailable fact must not abort reconciliation.

use serde::{Deserialize, Serialize};

use crate::facts::{FactStore, FactValue};

/// Comparison operator for integer guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// A boolean guard expression evaluated against a [`FactStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Fact's canonical string form is a member of the literal set.
    /// Order-insensitive, exact string match.
    In { fact: String, values: Vec<String> },
    /// Fact equals the literal value exactly
    Eq { fact: String, value: FactValue },
    /// Fact, coerced to integer, compares against the literal
    Cmp {
        fact: String,
        op: CmpOp,
        value: i64,
    },
    /// Fact exists and is truthy
    Truthy { fact: String },
    /// All sub-conditions hold (left-to-right, short-circuit)
    All(Vec<Condition>),
    /// Any sub-condition holds (left-to-right, short-circuit)
    Any(Vec<Condition>),
    /// Negation
    Not(Box<Condition>),
}

impl Condition {
    /// Evaluate this guard against the fact store.
    ///
    /// `all`/`any` evaluate operands strictly left-to-right and stop at the
    /// first determining operand, fixing evaluation order for reproducible
    /// tests.
    pub fn eval(&self, facts: &FactStore) -> bool {
        match self {
            Self::In { fact, values } => facts
                .get(fact)
                .is_some_and(|v| values.iter().any(|candidate| *candidate == v.canonical())),
            Self::Eq { fact, value } => facts.get(fact).is_some_and(|v| v == value),
            Self::Cmp { fact, op, value } => facts
                .get(fact)
                .and_then(FactValue::as_int)
                .is_some_and(|lhs| op.holds(lhs, *value)),
            Self::Truthy { fact } => facts.get(fact).is_some_and(FactValue::is_truthy),
            Self::All(conds) => {
                for cond in conds {
                    if !cond.eval(facts) {
                        return false;
                    }
                }
                true
            }
            Self::Any(conds) => {
                for cond in conds {
                    if cond.eval(facts) {
                        return true;
                    }
                }
                false
            }
            Self::Not(cond) => !cond.eval(facts),
        }
    }

    /// Conjoin two optional guards. `None` means "always true", so the
    /// result is the other guard unchanged.
    ///
    /// Used when an include's guard is pushed down onto the nodes of the
    /// included list.
    pub fn conjoin(outer: Option<Condition>, inner: Option<Condition>) -> Option<Condition> {
        match (outer, inner) {
            (None, inner) => inner,
            (outer, None) => outer,
            (Some(a), Some(b)) => Some(Self::All(vec![a, b])),
        }
    }
}
