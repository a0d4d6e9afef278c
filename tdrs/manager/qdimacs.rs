//! Reading and writing of QDIMACS files.
use std::{collections::BTreeSet, fmt::Display};

use anyhow::{bail, Context};
use tracing::{debug, warn};

use crate::{
    formula::Cnf,
    literal::{Clause, Variable},
    Error, Result,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Preamble {
    pub variables: usize,
    pub clauses: usize,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Quantifier {
    Exists,
    Forall,
}

impl Display for Quantifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantifier::Exists => write!(f, "e"),
            Quantifier::Forall => write!(f, "a"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct QuantifierBlock {
    pub quantifier: Quantifier,
    pub variables: Vec<u32>,
}

/// Quantified CNF formula: a prefix of quantifier blocks and a matrix of clauses.
/// Variables that are not in any block are free.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct QdimacsProblem {
    pub preamble: Preamble,
    pub blocks: Vec<QuantifierBlock>,
    pub clauses: Vec<Clause>,
}

impl QdimacsProblem {
    /// Problem without quantifier prefix.
    #[must_use]
    pub fn from_clauses(clauses: Vec<Clause>) -> QdimacsProblem {
        let variables = clauses
            .iter()
            .flat_map(Clause::variables)
            .max()
            .unwrap_or(0);

        QdimacsProblem {
            preamble: Preamble {
                variables: variables as usize,
                clauses: clauses.len(),
            },
            blocks: Vec::new(),
            clauses,
        }
    }

    /// Read the whole problem from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the problem line is missing or a line is malformed.
    pub fn read(reader: &mut dyn std::io::BufRead) -> Result<QdimacsProblem> {
        QdimacsReader::new(reader).read()
    }

    /// Variables that unit propagation must not assign: the universally quantified ones.
    #[must_use]
    pub fn protected(&self) -> BTreeSet<Variable> {
        self.blocks
            .iter()
            .filter(|block| block.quantifier == Quantifier::Forall)
            .flat_map(|block| block.variables.iter().copied().map(Variable::problem))
            .collect()
    }

    /// Indices of all variables occurring in the matrix.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<u32> {
        self.clauses.iter().flat_map(Clause::variables).collect()
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum QdimacsReaderState {
    Initialized,
    PreambleParsed,
    ParsingClauses,
    Finished,
}

pub struct QdimacsReader<'a> {
    reader: &'a mut dyn std::io::BufRead,
    state: QdimacsReaderState,
    line_number: usize,
}

impl<'a> QdimacsReader<'a> {
    #[must_use]
    pub fn new(reader: &'a mut dyn std::io::BufRead) -> Self {
        QdimacsReader {
            reader,
            state: QdimacsReaderState::Initialized,
            line_number: 0,
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the input is not valid QDIMACS.
    pub fn read(&mut self) -> Result<QdimacsProblem> {
        self.parse().map_err(|reason| Error::Parse {
            what: "QDIMACS",
            reason,
        })
    }

    fn parse(&mut self) -> anyhow::Result<QdimacsProblem> {
        let preamble = self.parse_preamble()?;
        let mut blocks = Vec::new();
        let mut clauses = Vec::new();

        while let Some(line) = self.next_line()? {
            let tokens: Vec<_> = line.split_whitespace().collect();
            match tokens.as_slice() {
                ["%"] => {
                    self.parse_trailer()?;
                    break;
                }
                ["p", ..] => bail!("duplicate problem line on line {}", self.line_number),
                [quantifier @ ("a" | "e"), variables @ ..] => {
                    if self.state == QdimacsReaderState::ParsingClauses {
                        bail!(
                            "quantifier block on line {} follows the clauses",
                            self.line_number
                        );
                    }

                    let quantifier = if *quantifier == "a" {
                        Quantifier::Forall
                    } else {
                        Quantifier::Exists
                    };
                    let variables = self.parse_block(variables)?;
                    blocks.push(QuantifierBlock {
                        quantifier,
                        variables,
                    });
                }
                literals => {
                    self.state = QdimacsReaderState::ParsingClauses;
                    clauses.push(self.parse_clause(literals)?);
                }
            }
        }
        self.state = QdimacsReaderState::Finished;

        if clauses.len() != preamble.clauses {
            warn!(
                declared = preamble.clauses,
                found = clauses.len(),
                "number of clauses differs from the problem line"
            );
        }
        debug!(
            blocks = blocks.len(),
            clauses = clauses.len(),
            "parsed QDIMACS"
        );

        Ok(QdimacsProblem {
            preamble,
            blocks,
            clauses,
        })
    }

    fn parse_preamble(&mut self) -> anyhow::Result<Preamble> {
        if self.state != QdimacsReaderState::Initialized {
            bail!("preamble already parsed");
        }

        let Some(line) = self.next_line()? else {
            bail!("preamble is missing a problem line");
        };

        let items: Vec<_> = line.split_whitespace().collect();
        let [p, format, variables, clauses] = items.as_slice() else {
            bail!("problem line must contain exactly 4 fields: 'p cnf VARIABLES CLAUSES'");
        };

        if *p != "p" {
            bail!("first field of problem line must be 'p', found '{p}'");
        }

        if *format != "cnf" {
            bail!("second field of problem line must be 'cnf', found '{format}'");
        }

        let variables = variables
            .parse::<usize>()
            .with_context(|| format!("could not parse number of variables '{variables}'"))?;
        let clauses = clauses
            .parse::<usize>()
            .with_context(|| format!("could not parse number of clauses '{clauses}'"))?;

        self.state = QdimacsReaderState::PreambleParsed;
        Ok(Preamble { variables, clauses })
    }

    fn parse_block(&self, tokens: &[&str]) -> anyhow::Result<Vec<u32>> {
        let mut variables = Vec::new();
        for token in tokens {
            let variable = token.parse::<u32>().with_context(|| {
                format!(
                    "invalid variable '{token}' in quantifier block on line {}",
                    self.line_number
                )
            })?;

            if variable == 0 {
                break;
            }
            variables.push(variable);
        }
        Ok(variables)
    }

    /// A line holding only '0' is the empty clause.
    fn parse_clause(&self, tokens: &[&str]) -> anyhow::Result<Clause> {
        let mut literals = Vec::new();
        for token in tokens {
            let literal = token.parse::<i32>().with_context(|| {
                format!("literal '{token}' on line {} is invalid", self.line_number)
            })?;

            if literal == 0 {
                break;
            }
            literals.push(literal);
        }

        Ok(Clause::new(literals))
    }

    /// The SATLIB benchmarks end with '%' followed by a line with '0'.
    fn parse_trailer(&mut self) -> anyhow::Result<()> {
        match self.next_line()? {
            Some(zero) if zero == "0" => Ok(()),
            Some(other) => bail!("expected '0' after '%' but found '{other}' instead"),
            None => bail!("expected '0' after '%' but the input ended"),
        }
    }

    /// Next non-empty line that is not a comment, trimmed.
    fn next_line(&mut self) -> anyhow::Result<Option<String>> {
        loop {
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .with_context(|| format!("could not read line {}", self.line_number + 1))?;
            if read == 0 {
                return Ok(None);
            }

            self.line_number += 1;
            let line = line.trim();
            if line.is_empty() || line == "c" || line.starts_with("c ") {
                continue;
            }
            return Ok(Some(line.to_owned()));
        }
    }
}

/// Write `cnf` as QDIMACS with the quantifier prefix of `problem`.
///
/// Variables are renumbered from 1. Blocks keep their order but lose the
/// variables that no longer occur; empty blocks are dropped and adjacent
/// blocks with the same quantifier are merged. Clause variables are
/// existentially quantified in the innermost block.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_qdimacs(
    problem: &QdimacsProblem,
    cnf: &Cnf,
    writer: &mut dyn std::io::Write,
) -> Result<()> {
    let encoded = cnf.encode();
    let mut prefix: Vec<(Quantifier, Vec<u32>)> = Vec::new();
    let mut push_block = |quantifier: Quantifier, variables: Vec<u32>| {
        if variables.is_empty() {
            return;
        }

        match prefix.last_mut() {
            Some((last, existing)) if *last == quantifier => existing.extend(variables),
            _ => prefix.push((quantifier, variables)),
        }
    };

    for block in &problem.blocks {
        let variables = block
            .variables
            .iter()
            .filter_map(|variable| encoded.index(&Variable::problem(*variable)))
            .collect();
        push_block(block.quantifier, variables);
    }

    let clause_variables = encoded
        .literal_map()
        .iter()
        .filter(|(_, variable)| variable.is_clause_variable())
        .map(|(idx, _)| *idx)
        .collect();
    push_block(Quantifier::Exists, clause_variables);

    writeln!(
        writer,
        "p cnf {} {}",
        encoded.degree(),
        encoded.clauses().len()
    )?;

    for (quantifier, variables) in &prefix {
        writeln!(writer, "{quantifier} {} 0", join(variables))?;
    }

    for clause in encoded.clauses() {
        if clause.is_empty() {
            writeln!(writer, "0")?;
        } else {
            writeln!(writer, "{} 0", join(clause))?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn join<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::{collections::BTreeSet, io::BufReader};

    use super::{write_qdimacs, Preamble, QdimacsProblem, Quantifier, QuantifierBlock};
    use crate::{
        formula::{Cnf, Expr, Models},
        literal::{Clause, ClauseIdx, NodeId, Variable},
    };

    fn read(contents: &str) -> crate::Result<QdimacsProblem> {
        let mut reader = BufReader::new(contents.as_bytes());
        QdimacsProblem::read(&mut reader)
    }

    fn write(problem: &QdimacsProblem, cnf: &Cnf) -> String {
        let mut buffer = Vec::<u8>::new();
        write_qdimacs(problem, cnf, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn qdimacs_ok() {
        let problem = read(
            "c Example QDIMACS file
c
p cnf 4 3
a 1 2 0
e 3 4 0
1 3 -4 0
-2 4 0

2 -3 0
",
        )
        .unwrap();

        assert_eq!(
            problem.preamble,
            Preamble {
                variables: 4,
                clauses: 3
            }
        );
        assert_eq!(
            problem.blocks,
            vec![
                QuantifierBlock {
                    quantifier: Quantifier::Forall,
                    variables: vec![1, 2],
                },
                QuantifierBlock {
                    quantifier: Quantifier::Exists,
                    variables: vec![3, 4],
                },
            ]
        );
        assert_eq!(
            problem.clauses,
            vec![
                Clause::new([1, 3, -4]),
                Clause::new([-2, 4]),
                Clause::new([2, -3]),
            ]
        );
        assert_eq!(
            problem.protected(),
            BTreeSet::from([Variable::problem(1), Variable::problem(2)])
        );
    }

    #[test]
    fn whitespace_and_empty_clauses() {
        let problem = read(
            "p   cnf  3   3
e  1 2   3 0
  1  -2 0
0
3 0
",
        )
        .unwrap();

        assert_eq!(problem.blocks.len(), 1);
        assert_eq!(
            problem.clauses,
            vec![Clause::new([1, -2]), Clause::default(), Clause::new([3])]
        );
        assert!(problem.protected().is_empty());
    }

    #[test]
    fn trailing_eof_syntax() {
        let problem = read(
            "p cnf 4 2
1 3 -4 0
4 0
%
0
",
        )
        .unwrap();
        assert_eq!(problem.clauses.len(), 2);

        assert!(read("p cnf 4 1\n1 0\n%\n2\n").is_err());
    }

    #[test]
    fn malformed_inputs() {
        for contents in [
            "",
            "c only comments\n",
            "p cnf 2\n1 2 0\n",
            "p dnf 2 1\n1 2 0\n",
            "p cnf x 1\n1 2 0\n",
            "p cnf 2 1\n1 y 0\n",
            "p cnf 2 1\np cnf 2 1\n",
            "p cnf 2 1\n1 2 0\na 1 0\n",
            "p cnf 2 1\na -1 0\n1 2 0\n",
        ] {
            assert!(read(contents).is_err(), "accepted '{contents}'");
        }
    }

    #[test]
    fn write_prefix_and_clause_variables() {
        let problem = read(
            "p cnf 4 2
a 1 0
a 2 0
e 3 0
e 4 0
1 2 0
-3 4 0
",
        )
        .unwrap();

        let c = Variable::clause(ClauseIdx(1), NodeId(1));
        let formula = Expr::var(c).equal(Expr::var(Variable::problem(1)) | Expr::var(Variable::problem(3)))
            & Expr::var(c);
        assert_eq!(
            write(&problem, &formula.to_cnf()),
            "p cnf 3 4
a 1 0
e 2 3 0
1 2 -3 0
-1 3 0
-2 3 0
3 0
"
        );
    }

    #[test]
    fn clause_variables_get_their_own_block() {
        let problem = read("p cnf 2 1\ne 1 0\na 2 0\n1 2 0\n").unwrap();
        let c = Variable::clause(ClauseIdx(1), NodeId(1));
        let formula = Expr::var(c).equal(Expr::var(Variable::problem(1)) | Expr::var(Variable::problem(2)));

        assert_eq!(
            write(&problem, &formula.to_cnf()),
            "p cnf 3 3
e 1 0
a 2 0
e 3 0
1 2 -3 0
-1 3 0
-2 3 0
"
        );
    }

    #[test]
    fn free_variables_and_trivial_formulas() {
        let problem = QdimacsProblem::from_clauses(vec![Clause::new([1, -2])]);
        assert_eq!(problem.preamble.variables, 2);

        let cnf = Cnf::from_clauses(&problem.clauses);
        assert_eq!(write(&problem, &cnf), "p cnf 2 1\n1 -2 0\n");

        assert_eq!(write(&problem, &Cnf::default()), "p cnf 0 0\n");

        let unsatisfiable = Cnf::from_clauses(&[Clause::default()]);
        assert_eq!(write(&problem, &unsatisfiable), "p cnf 0 1\n0\n");
    }

    #[test]
    fn unsatisfiable_formula_reads_back() {
        let problem = read("p cnf 1 2\ne 1 0\n1 0\n-1 0\n").unwrap();
        let unsatisfiable = Cnf::from_clauses(&[Clause::default()]);

        let written = read(&write(&problem, &unsatisfiable)).unwrap();
        assert_eq!(written.clauses, vec![Clause::default()]);
        assert_eq!(Cnf::from_clauses(&written.clauses), unsatisfiable);
        assert!(Models::enumerate(&Cnf::from_clauses(&written.clauses))
            .unwrap()
            .is_empty());
    }
}
