//! Models of small formulas found by brute-force enumeration.
use crate::{
    formula::Cnf,
    literal::{Literal, Polarity, Variable},
    Error, Result,
};
use bitvec::prelude::*;
use std::{collections::BTreeMap, fmt::Display};
use tabled::{builder::Builder, grid::config::HorizontalLine, settings::Theme};

/// Enumeration is exponential in the number of variables, so it is capped.
pub const MAX_ENUMERATED_VARIABLES: usize = 20;

/// All models of a formula.
#[derive(Debug, PartialEq)]
pub struct Models {
    models: Vec<BitVec>,
    variables: Vec<Variable>,
}

impl Models {
    fn new(mut models: Vec<BitVec>, variables: Vec<Variable>) -> Self {
        models.sort();
        models.dedup();
        Models { models, variables }
    }

    /// Enumerate all models of the formula over its own variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyVariables`] if the formula has more than
    /// [`MAX_ENUMERATED_VARIABLES`] variables.
    pub fn enumerate(cnf: &Cnf) -> Result<Models> {
        let variables: Vec<Variable> = cnf.variables().into_iter().collect();
        if variables.len() > MAX_ENUMERATED_VARIABLES {
            return Err(Error::TooManyVariables {
                variables: variables.len(),
                limit: MAX_ENUMERATED_VARIABLES,
            });
        }

        let positions: BTreeMap<Variable, usize> = variables
            .iter()
            .enumerate()
            .map(|(position, variable)| (*variable, position))
            .collect();

        let mut models = Vec::new();
        for bits in 0..(1u64 << variables.len()) {
            let mut model = bitvec![0; variables.len()];
            for position in 0..variables.len() {
                model.set(position, (bits >> position) & 1 == 1);
            }

            if cnf.evaluate(&|variable: &Variable| model[positions[variable]]) {
                models.push(model);
            }
        }

        Ok(Models::new(models, variables))
    }

    /// Restrict the models to `variables`. Variables that the models do not
    /// mention are unconstrained and take both values.
    #[must_use]
    pub fn project(&self, variables: &[Variable]) -> Models {
        let mut projected = Vec::new();
        for model in &self.models {
            let mut partial: Vec<BitVec> = vec![BitVec::new()];
            for variable in variables {
                let values = match self.variables.iter().position(|v| v == variable) {
                    Some(position) => vec![model[position]],
                    None => vec![false, true],
                };

                partial = partial
                    .into_iter()
                    .flat_map(|prefix| {
                        values.iter().map(move |value| {
                            let mut extended = prefix.clone();
                            extended.push(*value);
                            extended
                        })
                    })
                    .collect();
            }
            projected.extend(partial);
        }

        Models::new(projected, variables.to_vec())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Get all the models.
    #[must_use]
    pub fn all_models(&self) -> Vec<Model> {
        self.models
            .iter()
            .map(|enumeration_bitvec| Model::new_from_bitvector(enumeration_bitvec, &self.variables))
            .collect()
    }
}

impl Display for Models {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut builder = Builder::default();
        builder.push_record(self.variables.iter().map(ToString::to_string));

        for model in &self.models {
            builder.push_record(
                model
                    .iter()
                    .map(|assignment| if *assignment { "1" } else { "0" }),
            );
        }

        let mut style = Theme::default();
        style.insert_horizontal_line(1, HorizontalLine::full('-', '-', ' ', ' '));
        let output = builder.build().with(style).to_string();
        write!(f, "{output}")
    }
}

/// Single model of a formula.
#[derive(Debug, PartialEq, Eq)]
pub struct Model {
    literals: Vec<Literal>,
}

impl Model {
    fn new_from_bitvector(model: &BitVec, variables: &[Variable]) -> Self {
        Model {
            literals: model
                .iter()
                .zip(variables.iter())
                .map(|(polarity, variable)| Literal::new(Polarity::from(*polarity), *variable))
                .collect(),
        }
    }

    #[must_use]
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.literals
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Models;
    use crate::{
        formula::Cnf,
        literal::{Clause, Variable},
    };

    #[test]
    fn enumerate_models() {
        let cnf = Cnf::from_clauses(&[Clause::new([1, 2]), Clause::new([-1])]);
        let models = Models::enumerate(&cnf).unwrap();

        assert_eq!(models.len(), 1);
        assert_eq!(models.all_models()[0].to_string(), "{¬x_1, x_2}");
    }

    #[test]
    fn unsatisfiable_has_no_models() {
        let cnf = Cnf::from_clauses(&[Clause::new([1]), Clause::new([-1])]);
        assert!(Models::enumerate(&cnf).unwrap().is_empty());
    }

    #[test]
    fn projection_expands_missing_variables() {
        let cnf = Cnf::from_clauses(&[Clause::new([1])]);
        let models = Models::enumerate(&cnf).unwrap();
        let projected = models.project(&[Variable::problem(1), Variable::problem(2)]);

        assert_eq!(projected.len(), 2);
        assert_eq!(
            projected
                .all_models()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec!["{x_1, ¬x_2}", "{x_1, x_2}"]
        );
    }

    #[test]
    fn too_many_variables() {
        let clauses: Vec<_> = (1..=21).map(|idx| Clause::new([idx])).collect();
        assert!(Models::enumerate(&Cnf::from_clauses(&clauses)).is_err());
    }
}
