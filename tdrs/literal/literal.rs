use derive_more::derive::{Add, AddAssign, From};
use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use crate::Error;

/// 1-based index of a clause in the original clause list.
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Debug, Hash, From)]
pub struct ClauseIdx(pub u32);

impl ClauseIdx {
    /// Position of the clause in a 0-based slice.
    #[must_use]
    pub fn position(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl Display for ClauseIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of a decomposition node. Bags are numbered from 1 in the order in which
/// they were given; clones created while normalizing the tree get the next free numbers.
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Debug, Hash, Add, AddAssign, From)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Node of the bag at `position` in the input bag list.
    #[must_use]
    pub(crate) fn from_position(position: usize) -> NodeId {
        NodeId(u32::try_from(position + 1).unwrap_or(u32::MAX))
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Auxiliary variable `c_<clause>_<node>` standing for "clause is satisfied by
/// what has been seen at or below the node".
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Debug, Hash)]
pub struct ClauseVariable {
    pub clause: ClauseIdx,
    pub node: NodeId,
}

impl ClauseVariable {
    #[must_use]
    pub fn new(clause: ClauseIdx, node: NodeId) -> ClauseVariable {
        ClauseVariable { clause, node }
    }
}

impl Display for ClauseVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c_{}_{}", self.clause, self.node)
    }
}

/// Variable of a reformulated formula: either a variable of the original
/// problem (`x_<i>`) or a clause variable (`c_<j>_<n>`).
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Debug, Hash, From)]
pub enum Variable {
    Problem(u32),
    Clause(ClauseVariable),
}

impl Variable {
    #[must_use]
    pub fn problem(idx: u32) -> Variable {
        Variable::Problem(idx)
    }

    #[must_use]
    pub fn clause(clause: ClauseIdx, node: NodeId) -> Variable {
        Variable::Clause(ClauseVariable::new(clause, node))
    }

    /// Index of the original problem variable, `None` for clause variables.
    #[must_use]
    pub fn problem_index(&self) -> Option<u32> {
        match self {
            Variable::Problem(idx) => Some(*idx),
            Variable::Clause(_) => None,
        }
    }

    #[must_use]
    pub fn is_clause_variable(&self) -> bool {
        matches!(self, Variable::Clause(..))
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variable::Problem(idx) => write!(f, "x_{idx}"),
            Variable::Clause(variable) => write!(f, "{variable}"),
        }
    }
}

impl FromStr for Variable {
    type Err = Error;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::MalformedVariable(label.to_owned());
        let mut parts = label.split('_');
        let variable = match (parts.next(), parts.next(), parts.next()) {
            (Some("x"), Some(idx), None) => {
                Variable::Problem(idx.parse().map_err(|_| malformed())?)
            }
            (Some("c"), Some(clause), Some(node)) => Variable::clause(
                ClauseIdx(clause.parse().map_err(|_| malformed())?),
                NodeId(node.parse().map_err(|_| malformed())?),
            ),
            _ => return Err(malformed()),
        };

        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(variable)
    }
}

/// Polarity of a variable.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Copy, Hash)]
pub enum Polarity {
    Positive,
    Negative,
}

impl From<bool> for Polarity {
    fn from(item: bool) -> Self {
        if item {
            Polarity::Positive
        } else {
            Polarity::Negative
        }
    }
}

impl std::ops::Not for Polarity {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        }
    }
}

/// Literal given by [`Variable`] and [`Polarity`].
#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct Literal {
    variable: Variable,
    polarity: Polarity,
}

impl Literal {
    #[must_use]
    pub fn new(polarity: Polarity, variable: Variable) -> Literal {
        Literal { variable, polarity }
    }

    #[must_use]
    pub fn positive(variable: Variable) -> Literal {
        Literal::new(Polarity::Positive, variable)
    }

    #[must_use]
    pub fn negative(variable: Variable) -> Literal {
        Literal::new(Polarity::Negative, variable)
    }

    /// Create a literal over a problem variable from its DIMACS form.
    #[must_use]
    pub fn from_dimacs(literal: i32) -> Literal {
        Literal::new(
            Polarity::from(literal > 0),
            Variable::Problem(literal.unsigned_abs()),
        )
    }

    #[must_use]
    pub fn negate(&self) -> Literal {
        Literal::new(!self.polarity, self.variable)
    }

    /// Check whether [`self`] is negated [`other`].
    #[must_use]
    pub fn eq_negated(&self, other: &Literal) -> bool {
        self.variable == other.variable && self.polarity != other.polarity
    }

    #[must_use]
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    #[must_use]
    pub fn variable(&self) -> Variable {
        self.variable
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.polarity == Polarity::Positive
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let polarity = if self.polarity == Polarity::Positive {
            ""
        } else {
            "¬"
        };
        write!(f, "{}{}", polarity, self.variable)
    }
}

/// Clause of the original formula: a set of signed DIMACS literals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Clause {
    literals: BTreeSet<i32>,
}

impl Clause {
    #[must_use]
    pub fn new(literals: impl IntoIterator<Item = i32>) -> Clause {
        Clause {
            literals: literals.into_iter().collect(),
        }
    }

    /// Literals of the clause over problem variables.
    pub fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        self.literals.iter().map(|literal| Literal::from_dimacs(*literal))
    }

    /// Indices of the problem variables mentioned by the clause.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<u32> {
        self.literals.iter().map(|literal| literal.unsigned_abs()).collect()
    }

    #[must_use]
    pub fn mentions(&self, variable: u32) -> bool {
        self.literals.contains(&i32::try_from(variable).unwrap_or(i32::MAX))
            || self
                .literals
                .contains(&-i32::try_from(variable).unwrap_or(i32::MAX))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

impl Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({})",
            self.literals()
                .map(|literal| literal.to_string())
                .collect::<Vec<_>>()
                .join(" ∨ ")
        )
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{Clause, ClauseIdx, Literal, NodeId, Polarity, Variable};

    #[test]
    fn variable_labels() {
        assert_eq!(Variable::problem(3).to_string(), "x_3");
        assert_eq!(
            Variable::clause(ClauseIdx(2), NodeId(7)).to_string(),
            "c_2_7"
        );

        assert_eq!("x_12".parse::<Variable>().unwrap(), Variable::problem(12));
        assert_eq!(
            "c_1_4".parse::<Variable>().unwrap(),
            Variable::clause(ClauseIdx(1), NodeId(4))
        );
        assert!("c_1".parse::<Variable>().is_err());
        assert!("y_1".parse::<Variable>().is_err());
        assert!("x_1_2".parse::<Variable>().is_err());
        assert!("x_a".parse::<Variable>().is_err());
    }

    #[test]
    fn dimacs_literals() {
        let literal = Literal::from_dimacs(-4);
        assert_eq!(literal.polarity(), Polarity::Negative);
        assert_eq!(literal.variable(), Variable::problem(4));
        assert!(literal.eq_negated(&Literal::from_dimacs(4)));
        assert_eq!(literal.negate(), Literal::from_dimacs(4));
        assert_eq!(literal.to_string(), "¬x_4");
    }

    #[test]
    fn clause_variables() {
        let clause = Clause::new([1, -3, 1, 5]);
        assert_eq!(clause.len(), 3);
        assert!(clause.mentions(3));
        assert!(clause.mentions(1));
        assert!(!clause.mentions(2));
        assert_eq!(clause.variables().into_iter().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(clause.to_string(), "(¬x_3 ∨ x_1 ∨ x_5)");
    }
}
