use std::{
    collections::BTreeSet,
    fmt::Display,
    ops::{BitAnd, BitOr, Not},
};

use crate::{
    formula::cnf::Cnf,
    literal::{Literal, Polarity, Variable},
};

/// Immutable Boolean expression over problem and clause variables.
///
/// Constructors simplify constants eagerly: `true ∧ f` is `f`, `false ∧ f` is `false`,
/// and dually for disjunctions. Nested conjunctions and disjunctions are flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Const(bool),
    Var(Variable),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Equal(Box<Expr>, Box<Expr>),
}

impl Expr {
    #[must_use]
    pub fn constant(value: bool) -> Expr {
        Expr::Const(value)
    }

    #[must_use]
    pub fn tautology() -> Expr {
        Expr::Const(true)
    }

    #[must_use]
    pub fn contradiction() -> Expr {
        Expr::Const(false)
    }

    #[must_use]
    pub fn var(variable: Variable) -> Expr {
        Expr::Var(variable)
    }

    #[must_use]
    pub fn literal(literal: Literal) -> Expr {
        match literal.polarity() {
            Polarity::Positive => Expr::Var(literal.variable()),
            Polarity::Negative => Expr::Not(Box::new(Expr::Var(literal.variable()))),
        }
    }

    #[must_use]
    pub fn is_true(&self) -> bool {
        *self == Expr::Const(true)
    }

    #[must_use]
    pub fn is_false(&self) -> bool {
        *self == Expr::Const(false)
    }

    #[must_use]
    pub fn negate(self) -> Expr {
        match self {
            Expr::Const(value) => Expr::Const(!value),
            Expr::Not(expr) => *expr,
            expr => Expr::Not(Box::new(expr)),
        }
    }

    #[must_use]
    pub fn conjoin(self, other: Expr) -> Expr {
        if self.is_false() || other.is_true() {
            return self;
        }

        if other.is_false() || self.is_true() {
            return other;
        }

        let mut operands = match self {
            Expr::And(operands) => operands,
            expr => vec![expr],
        };
        match other {
            Expr::And(others) => operands.extend(others),
            expr => operands.push(expr),
        }
        Expr::And(operands)
    }

    #[must_use]
    pub fn disjoin(self, other: Expr) -> Expr {
        if self.is_true() || other.is_false() {
            return self;
        }

        if other.is_true() || self.is_false() {
            return other;
        }

        let mut operands = match self {
            Expr::Or(operands) => operands,
            expr => vec![expr],
        };
        match other {
            Expr::Or(others) => operands.extend(others),
            expr => operands.push(expr),
        }
        Expr::Or(operands)
    }

    /// Biconditional `self ⇔ other`.
    #[must_use]
    pub fn equal(self, other: Expr) -> Expr {
        match (self, other) {
            (Expr::Const(value), expr) | (expr, Expr::Const(value)) => {
                if value {
                    expr
                } else {
                    expr.negate()
                }
            }
            (fst, snd) => Expr::Equal(Box::new(fst), Box::new(snd)),
        }
    }

    /// Conjunction of all the expressions, `true` for an empty iterator.
    pub fn all(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        exprs.into_iter().fold(Expr::tautology(), Expr::conjoin)
    }

    /// Disjunction of all the expressions, `false` for an empty iterator.
    pub fn any(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        exprs.into_iter().fold(Expr::contradiction(), Expr::disjoin)
    }

    /// Variables occurring in the expression.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut variables = BTreeSet::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Const(_) => {}
                Expr::Var(variable) => {
                    variables.insert(*variable);
                }
                Expr::Not(expr) => stack.push(expr),
                Expr::And(operands) | Expr::Or(operands) => stack.extend(operands.iter()),
                Expr::Equal(fst, snd) => {
                    stack.push(fst);
                    stack.push(snd);
                }
            }
        }
        variables
    }

    /// Evaluate the expression under the assignment.
    pub fn evaluate(&self, assignment: &impl Fn(&Variable) -> bool) -> bool {
        match self {
            Expr::Const(value) => *value,
            Expr::Var(variable) => assignment(variable),
            Expr::Not(expr) => !expr.evaluate(assignment),
            Expr::And(operands) => operands.iter().all(|expr| expr.evaluate(assignment)),
            Expr::Or(operands) => operands.iter().any(|expr| expr.evaluate(assignment)),
            Expr::Equal(fst, snd) => fst.evaluate(assignment) == snd.evaluate(assignment),
        }
    }

    /// Convert the expression to an equivalent CNF without introducing fresh variables.
    ///
    /// Negations are pushed to the variables and disjunctions are distributed over
    /// conjunctions. A biconditional `a ⇔ b` expands to `(¬a ∨ b) ∧ (a ∨ ¬b)`.
    /// Tautological and duplicate clauses are dropped.
    #[must_use]
    pub fn to_cnf(&self) -> Cnf {
        Cnf::new(clauses(self, false))
    }
}

type Clauses = BTreeSet<BTreeSet<Literal>>;

/// Clauses of `expr`, or of `¬expr` if `negated` is set.
fn clauses(expr: &Expr, negated: bool) -> Clauses {
    match (expr, negated) {
        (Expr::Const(value), _) => {
            if *value == negated {
                // An empty clause makes the formula unsatisfiable.
                BTreeSet::from([BTreeSet::new()])
            } else {
                BTreeSet::new()
            }
        }
        (Expr::Var(variable), _) => BTreeSet::from([BTreeSet::from([Literal::new(
            Polarity::from(!negated),
            *variable,
        )])]),
        (Expr::Not(expr), _) => clauses(expr, !negated),
        (Expr::And(operands), false) | (Expr::Or(operands), true) => operands
            .iter()
            .flat_map(|expr| clauses(expr, negated))
            .collect(),
        (Expr::Or(operands), false) | (Expr::And(operands), true) => operands
            .iter()
            .map(|expr| clauses(expr, negated))
            .fold(BTreeSet::from([BTreeSet::new()]), |acc, next| {
                product(&acc, &next)
            }),
        (Expr::Equal(fst, snd), false) => {
            let mut result = product(&clauses(fst, true), &clauses(snd, false));
            result.extend(product(&clauses(fst, false), &clauses(snd, true)));
            result
        }
        (Expr::Equal(fst, snd), true) => {
            let mut result = product(&clauses(fst, false), &clauses(snd, false));
            result.extend(product(&clauses(fst, true), &clauses(snd, true)));
            result
        }
    }
}

/// Clauses of the disjunction of two CNFs.
fn product(fst: &Clauses, snd: &Clauses) -> Clauses {
    let mut result = BTreeSet::new();
    for left in fst {
        for right in snd {
            let clause: BTreeSet<Literal> = left.union(right).copied().collect();
            if !is_tautology(&clause) {
                result.insert(clause);
            }
        }
    }
    result
}

fn is_tautology(clause: &BTreeSet<Literal>) -> bool {
    clause
        .iter()
        .any(|literal| clause.contains(&literal.negate()))
}

impl From<Variable> for Expr {
    fn from(variable: Variable) -> Self {
        Expr::Var(variable)
    }
}

impl From<Literal> for Expr {
    fn from(literal: Literal) -> Self {
        Expr::literal(literal)
    }
}

impl BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.conjoin(rhs)
    }
}

impl BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.disjoin(rhs)
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn join(f: &mut std::fmt::Formatter<'_>, operands: &[Expr], op: &str) -> std::fmt::Result {
            write!(f, "(")?;
            for (idx, operand) in operands.iter().enumerate() {
                if idx > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{operand}")?;
            }
            write!(f, ")")
        }

        match self {
            Expr::Const(true) => write!(f, "⊤"),
            Expr::Const(false) => write!(f, "⊥"),
            Expr::Var(variable) => write!(f, "{variable}"),
            Expr::Not(expr) => write!(f, "¬{expr}"),
            Expr::And(operands) => join(f, operands, "∧"),
            Expr::Or(operands) => join(f, operands, "∨"),
            Expr::Equal(fst, snd) => write!(f, "({fst} ⇔ {snd})"),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    use super::Expr;
    use crate::literal::{ClauseIdx, Literal, NodeId, Variable};

    fn x(idx: u32) -> Expr {
        Expr::var(Variable::problem(idx))
    }

    fn clause_set(cnf: &crate::formula::Cnf) -> BTreeSet<Vec<String>> {
        cnf.clauses()
            .map(|clause| clause.iter().map(ToString::to_string).collect())
            .collect()
    }

    #[test]
    fn constants_simplify() {
        assert_eq!(Expr::tautology() & x(1), x(1));
        assert_eq!(x(1) & Expr::contradiction(), Expr::contradiction());
        assert_eq!(Expr::contradiction() | x(2), x(2));
        assert_eq!(x(2) | Expr::tautology(), Expr::tautology());
        assert_eq!(!!x(3), x(3));
        assert_eq!(x(1).equal(Expr::tautology()), x(1));
        assert_eq!(Expr::contradiction().equal(x(1)), !x(1));
        assert_eq!(Expr::all([]), Expr::tautology());
        assert_eq!(Expr::any([]), Expr::contradiction());
    }

    #[test]
    fn operands_flatten() {
        let expr = (x(1) & x(2)) & (x(3) & x(4));
        assert_eq!(expr, Expr::And(vec![x(1), x(2), x(3), x(4)]));

        let expr = Expr::any([x(1), x(2), x(3)]);
        assert_eq!(expr, Expr::Or(vec![x(1), x(2), x(3)]));
    }

    #[test]
    fn biconditional_to_cnf() {
        let c = Variable::clause(ClauseIdx(1), NodeId(1));
        let expr = Expr::var(c).equal(x(1) | !x(2));
        let cnf = expr.to_cnf();

        assert_eq!(
            clause_set(&cnf),
            BTreeSet::from([
                vec!["x_1".to_owned(), "¬x_2".to_owned(), "¬c_1_1".to_owned()],
                vec!["¬x_1".to_owned(), "c_1_1".to_owned()],
                vec!["x_2".to_owned(), "c_1_1".to_owned()],
            ])
        );
    }

    #[test]
    fn negated_biconditional_to_cnf() {
        let cnf = (!(x(1).equal(x(2)))).to_cnf();
        assert_eq!(
            clause_set(&cnf),
            BTreeSet::from([
                vec!["x_1".to_owned(), "x_2".to_owned()],
                vec!["¬x_1".to_owned(), "¬x_2".to_owned()],
            ])
        );
    }

    #[test]
    fn tautologies_dropped() {
        assert!((x(1) | !x(1)).to_cnf().is_satisfied());
        assert_eq!((x(1) & !x(1)).to_cnf().len(), 2);
        assert!(Expr::contradiction().to_cnf().is_unsatisfiable());
        assert!((x(1) & Expr::contradiction()).to_cnf().is_unsatisfiable());
    }

    #[test]
    fn cnf_is_equivalent() {
        let expr = (x(1) | (x(2) & !x(3))).equal(x(4)) & (x(2) | x(4));
        let cnf = expr.to_cnf();
        let variables: Vec<_> = expr.variables().into_iter().collect();

        for bits in 0..(1u32 << variables.len()) {
            let assignment = |variable: &Variable| {
                let position = variables.iter().position(|v| v == variable).unwrap();
                (bits >> position) & 1 == 1
            };
            assert_eq!(expr.evaluate(&assignment), cnf.evaluate(&assignment));
        }
    }

    #[test]
    fn literal_expressions() {
        assert_eq!(Expr::literal(Literal::from_dimacs(-2)), !x(2));
        assert_eq!(Expr::from(Literal::from_dimacs(2)), x(2));
        assert_eq!(
            (x(1) & !x(2)).equal(x(3)).to_string(),
            "((x_1 ∧ ¬x_2) ⇔ x_3)"
        );
    }
}
