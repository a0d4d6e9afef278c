use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::{debug, instrument, warn};

use crate::{
    decomposition::DecompositionTree,
    formula::Expr,
    literal::{ClauseIdx, ClauseVariable, Variable},
};

/// Clause variables that were found identical to a clause variable of a child.
///
/// A clause variable is always referred to through [`Aliases::resolve`], which
/// follows the aliases to the representative that actually occurs in the formula.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aliases {
    aliases: FxHashMap<ClauseVariable, ClauseVariable>,
}

impl Aliases {
    /// Record that `alias` stands for the same value as `target`.
    pub fn insert(&mut self, alias: ClauseVariable, target: ClauseVariable) {
        let target = self.resolve(target);
        if alias != target {
            self.aliases.insert(alias, target);
        }
    }

    /// Representative of `variable`.
    #[must_use]
    pub fn resolve(&self, mut variable: ClauseVariable) -> ClauseVariable {
        while let Some(target) = self.aliases.get(&variable) {
            variable = *target;
        }
        variable
    }

    #[must_use]
    pub fn contains(&self, variable: &ClauseVariable) -> bool {
        self.aliases.contains_key(variable)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClauseVariable, &ClauseVariable)> {
        self.aliases.iter()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStatistics {
    /// Biconditionals `c ⇔ expr` added to the formula.
    pub definitions: usize,
    /// Clause variables replaced by the clause variable of their only contributing child.
    pub aliases: usize,
    /// Clause variables asserted true.
    pub closed: usize,
}

/// Result of a [`Transformer`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    pub formula: Expr,
    pub aliases: Aliases,
    pub statistics: TransformStatistics,
}

/// Walks a normalized decomposition tree bottom-up and builds a formula that is
/// satisfiable exactly when the clauses of the tree are.
///
/// Clause variable `c_j_n` states that clause `j` is satisfied by the literals
/// introduced at node `n` or below it. It is defined as the disjunction of the
/// clause variables of the children carrying clause `j` and of the literals of
/// clause `j` introduced at `n`. Where the clause leaves the tree, its clause
/// variable is asserted.
pub struct Transformer<'t, 'c> {
    tree: &'t DecompositionTree<'c>,
}

impl<'t, 'c> Transformer<'t, 'c> {
    #[must_use]
    pub fn new(tree: &'t DecompositionTree<'c>) -> Self {
        Transformer { tree }
    }

    #[must_use]
    pub fn transform(&self) -> Transformation {
        self.transform_with_seed(Expr::tautology())
    }

    /// Conjoin the definitions and closing assertions of every node to `seed`.
    #[must_use]
    #[instrument(skip_all, fields(nodes = self.tree.len()))]
    pub fn transform_with_seed(&self, seed: Expr) -> Transformation {
        let mut formula = seed;
        let mut aliases = Aliases::default();
        let mut statistics = TransformStatistics::default();
        let mut closed_clauses = BTreeSet::new();

        for idx in self.tree.post_order() {
            let node = self.tree.node(idx);

            for variable in node.clause_variables() {
                let (expr, contributing_children, introduced_literals, last_child) =
                    self.definition(idx, variable.clause, &aliases);

                match last_child {
                    Some(child) if contributing_children == 1 && introduced_literals == 0 => {
                        debug!(%variable, alias = %child, "aliasing clause variable");
                        aliases.insert(variable, child);
                        statistics.aliases += 1;
                    }
                    _ => {
                        let variable = Expr::var(Variable::Clause(aliases.resolve(variable)));
                        formula = formula & variable.equal(expr);
                        statistics.definitions += 1;
                    }
                }
            }

            for variable in node.clause_variables() {
                let closes = match node.parent() {
                    None => true,
                    Some(parent) => !self.tree.node(parent).has_clause_variable(variable.clause),
                };

                if closes {
                    let representative = aliases.resolve(variable);
                    debug!(%variable, %representative, "closing clause");
                    formula = formula & Expr::var(Variable::Clause(representative));
                    statistics.closed += 1;
                    closed_clauses.insert(variable.clause);
                }
            }
        }

        let unclosed: Vec<_> = (1..)
            .map(ClauseIdx)
            .take(self.tree.clauses().len())
            .filter(|clause| !closed_clauses.contains(clause))
            .map(|clause| clause.0)
            .collect();
        if !unclosed.is_empty() {
            warn!(
                clauses = ?unclosed,
                "clauses do not occur in any bag and are dropped from the formula"
            );
        }

        Transformation {
            formula,
            aliases,
            statistics,
        }
    }

    /// Disjunction defining the clause variable of `clause` at node `idx`, together
    /// with the number of contributing children, the number of introduced literals,
    /// and the last contributing child variable.
    fn definition(
        &self,
        idx: usize,
        clause: ClauseIdx,
        aliases: &Aliases,
    ) -> (Expr, usize, usize, Option<ClauseVariable>) {
        let node = self.tree.node(idx);
        let mut expr = Expr::contradiction();
        let mut contributing_children = 0;
        let mut last_child = None;

        for child in node.children() {
            if let Some(child_variable) = self.tree.node(*child).clause_variable(clause) {
                let child_variable = aliases.resolve(child_variable);
                expr = expr | Expr::var(Variable::Clause(child_variable));
                contributing_children += 1;
                last_child = Some(child_variable);
            }
        }

        let introduced = self.tree.introduced_x(idx, clause);
        let mut introduced_literals = 0;
        for literal in self.tree.clause(clause).into_iter().flat_map(|clause| clause.literals()) {
            let is_introduced = literal
                .variable()
                .problem_index()
                .is_some_and(|variable| introduced.contains(&variable));

            if is_introduced {
                expr = expr | Expr::literal(literal);
                introduced_literals += 1;
            }
        }

        (expr, contributing_children, introduced_literals, last_child)
    }
}
