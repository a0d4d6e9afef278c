use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::{
    formula::Cnf,
    literal::{Literal, Variable},
};

/// Formula left after unit propagation and the literals that were fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Propagation {
    pub cnf: Cnf,
    /// Unit literals in the order they were eliminated.
    pub eliminated: Vec<Literal>,
}

/// Repeatedly restrict `cnf` by its unit clauses until no unit clause over an
/// unprotected variable remains. Protected variables are never assigned.
///
/// Units of a single round are applied together. When a round holds both
/// polarities of a variable, only the first is applied; the restriction
/// turns the other one into the empty clause.
#[must_use]
#[instrument(skip_all, fields(clauses = cnf.len(), protected = protected.len()))]
pub fn propagate(cnf: &Cnf, protected: &BTreeSet<Variable>) -> Propagation {
    let mut cnf = cnf.clone();
    let mut eliminated = Vec::new();

    loop {
        let units: Vec<Literal> = cnf
            .unit_clauses()
            .filter(|literal| !protected.contains(&literal.variable()))
            .collect();
        if units.is_empty() {
            break;
        }

        let mut assigned = BTreeSet::new();
        for unit in units {
            if !assigned.insert(unit.variable()) {
                continue;
            }

            cnf = cnf.restrict(unit.variable(), unit.is_positive());
            eliminated.push(unit);
        }

        debug!(
            eliminated = assigned.len(),
            clauses = cnf.len(),
            "propagated unit clauses"
        );
    }

    Propagation { cnf, eliminated }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    use super::propagate;
    use crate::{
        formula::{Cnf, Expr},
        literal::{Clause, ClauseIdx, Literal, NodeId, Variable},
    };

    fn cnf(clauses: &[&[i32]]) -> Cnf {
        let clauses: Vec<_> = clauses
            .iter()
            .map(|literals| Clause::new(literals.iter().copied()))
            .collect();
        Cnf::from_clauses(&clauses)
    }

    #[test]
    fn propagates_to_fixpoint() {
        let formula = cnf(&[&[1], &[-1, 2], &[-2, 3, 4], &[-3, 5]]);
        let propagation = propagate(&formula, &BTreeSet::new());

        assert_eq!(propagation.cnf, cnf(&[&[3, 4], &[-3, 5]]));
        assert_eq!(
            propagation.eliminated,
            vec![Literal::from_dimacs(1), Literal::from_dimacs(2)]
        );
        assert!(propagation.cnf.unit_clauses().next().is_none());
    }

    #[test]
    fn protected_variables_are_kept() {
        let formula = cnf(&[&[1], &[-1, 2], &[2, 3]]);
        let protected = BTreeSet::from([Variable::problem(1)]);
        let propagation = propagate(&formula, &protected);

        assert_eq!(propagation.cnf, formula);
        assert!(propagation.eliminated.is_empty());

        let formula = cnf(&[&[1], &[4], &[-4, 5], &[1, -5, 6]]);
        let propagation = propagate(&formula, &protected);
        assert_eq!(propagation.cnf, cnf(&[&[1], &[1, 6]]));
        assert!(propagation
            .eliminated
            .iter()
            .all(|literal| literal.variable() != Variable::problem(1)));
    }

    #[test]
    fn idempotent() {
        let c = Expr::var(Variable::clause(ClauseIdx(1), NodeId(1)));
        let x = |idx| Expr::var(Variable::problem(idx));
        let formula = (c.clone().equal(x(1) | x(2)) & c & (!x(1) | x(3))).to_cnf();
        let protected = BTreeSet::from([Variable::problem(2)]);

        let once = propagate(&formula, &protected);
        let twice = propagate(&once.cnf, &protected);
        assert_eq!(twice.cnf, once.cnf);
        assert!(twice.eliminated.is_empty());
    }

    #[test]
    fn conflicting_units() {
        let formula = cnf(&[&[1], &[-1], &[2, 3]]);
        let propagation = propagate(&formula, &BTreeSet::new());

        assert!(propagation.cnf.is_unsatisfiable());
        assert_eq!(propagation.eliminated, vec![Literal::from_dimacs(1)]);
    }

    #[test]
    fn satisfied_formula() {
        let propagation = propagate(&cnf(&[&[1], &[1, 2]]), &BTreeSet::new());
        assert!(propagation.cnf.is_satisfied());
        assert_eq!(propagation.eliminated, vec![Literal::from_dimacs(1)]);
    }
}
