use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use crate::literal::{Clause, Literal, Polarity, Variable};

/// Formula in conjunctive normal form over problem and clause variables.
///
/// A CNF without clauses is `true`. A CNF containing the empty clause is `false`
/// and is kept as the single empty clause.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cnf {
    clauses: BTreeSet<BTreeSet<Literal>>,
}

impl Cnf {
    pub fn new(clauses: impl IntoIterator<Item = BTreeSet<Literal>>) -> Cnf {
        let mut cnf = Cnf {
            clauses: clauses
                .into_iter()
                .filter(|clause| {
                    !clause
                        .iter()
                        .any(|literal| clause.contains(&literal.negate()))
                })
                .collect(),
        };
        cnf.normalize();
        cnf
    }

    /// CNF of the original clause list over problem variables.
    #[must_use]
    pub fn from_clauses(clauses: &[Clause]) -> Cnf {
        Cnf::new(clauses.iter().map(|clause| clause.literals().collect()))
    }

    fn normalize(&mut self) {
        if self.clauses.contains(&BTreeSet::new()) {
            self.clauses = BTreeSet::from([BTreeSet::new()]);
        }
    }

    pub fn clauses(&self) -> impl Iterator<Item = &BTreeSet<Literal>> {
        self.clauses.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The formula has no clauses left and is trivially true.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The formula contains the empty clause.
    #[must_use]
    pub fn is_unsatisfiable(&self) -> bool {
        self.clauses.contains(&BTreeSet::new())
    }

    #[must_use]
    pub fn variables(&self) -> BTreeSet<Variable> {
        self.clauses
            .iter()
            .flatten()
            .map(Literal::variable)
            .collect()
    }

    /// Literals of all unit clauses.
    pub fn unit_clauses(&self) -> impl Iterator<Item = Literal> + '_ {
        self.clauses
            .iter()
            .filter(|clause| clause.len() == 1)
            .filter_map(|clause| clause.first().copied())
    }

    /// Fix `variable` to `value`: clauses satisfied by the assignment disappear,
    /// falsified literals are removed from the remaining ones.
    #[must_use]
    pub fn restrict(&self, variable: Variable, value: bool) -> Cnf {
        let satisfied = Literal::new(Polarity::from(value), variable);
        let falsified = satisfied.negate();

        let mut cnf = Cnf {
            clauses: self
                .clauses
                .iter()
                .filter(|clause| !clause.contains(&satisfied))
                .map(|clause| {
                    let mut clause = clause.clone();
                    clause.remove(&falsified);
                    clause
                })
                .collect(),
        };
        cnf.normalize();
        cnf
    }

    pub fn evaluate(&self, assignment: &impl Fn(&Variable) -> bool) -> bool {
        self.clauses.iter().all(|clause| {
            clause
                .iter()
                .any(|literal| assignment(&literal.variable()) == literal.is_positive())
        })
    }

    /// Number variables of the formula from 1 in their sorted order: problem variables
    /// by index first, clause variables after them.
    #[must_use]
    pub fn encode(&self) -> EncodedCnf {
        let literal_map: BTreeMap<u32, Variable> = (1..)
            .zip(self.variables())
            .collect();
        let indices: BTreeMap<Variable, u32> = literal_map
            .iter()
            .map(|(idx, variable)| (*variable, *idx))
            .collect();

        let clauses = self
            .clauses
            .iter()
            .map(|clause| {
                clause
                    .iter()
                    .map(|literal| {
                        let idx = i64::from(indices[&literal.variable()]);
                        if literal.is_positive() {
                            idx
                        } else {
                            -idx
                        }
                    })
                    .collect()
            })
            .collect();

        EncodedCnf {
            literal_map,
            indices,
            clauses,
        }
    }
}

impl Display for Cnf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.clauses.is_empty() {
            return write!(f, "⊤");
        }

        let clauses: Vec<_> = self
            .clauses
            .iter()
            .map(|clause| {
                format!(
                    "({})",
                    clause
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" ∨ ")
                )
            })
            .collect();
        write!(f, "{}", clauses.join(" ∧ "))
    }
}

/// CNF with variables renumbered to consecutive integers, ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCnf {
    literal_map: BTreeMap<u32, Variable>,
    indices: BTreeMap<Variable, u32>,
    clauses: Vec<Vec<i64>>,
}

impl EncodedCnf {
    /// Number of distinct variables.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.literal_map.len()
    }

    /// Mapping from the encoded index to the variable it represents.
    #[must_use]
    pub fn literal_map(&self) -> &BTreeMap<u32, Variable> {
        &self.literal_map
    }

    #[must_use]
    pub fn index(&self, variable: &Variable) -> Option<u32> {
        self.indices.get(variable).copied()
    }

    #[must_use]
    pub fn variable(&self, idx: u32) -> Option<Variable> {
        self.literal_map.get(&idx).copied()
    }

    #[must_use]
    pub fn clauses(&self) -> &[Vec<i64>] {
        &self.clauses
    }

    /// Clauses over the encoded indices, e.g. to build graphs of the encoded formula.
    #[must_use]
    pub fn to_clauses(&self) -> Vec<Clause> {
        self.clauses
            .iter()
            .map(|clause| {
                Clause::new(
                    clause
                        .iter()
                        .filter_map(|literal| i32::try_from(*literal).ok()),
                )
            })
            .collect()
    }
}
