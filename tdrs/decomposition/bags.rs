use std::collections::BTreeSet;

/// Tree decomposition as produced by a decomposer: a list of bags and an
/// undirected edge list over bag indices. The bag at index 0 is the root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decomposition {
    pub bags: Vec<BTreeSet<String>>,
    pub edges: Vec<(usize, usize)>,
}

impl Decomposition {
    #[must_use]
    pub fn new(bags: Vec<BTreeSet<String>>, edges: Vec<(usize, usize)>) -> Decomposition {
        Decomposition { bags, edges }
    }

    /// Largest bag size minus one, 0 for decompositions without non-empty bags.
    #[must_use]
    pub fn width(&self) -> usize {
        self.bags
            .iter()
            .map(|bag| bag.len().saturating_sub(1))
            .max()
            .unwrap_or(0)
    }
}

impl<B, E> From<(B, E)> for Decomposition
where
    B: IntoIterator,
    B::Item: IntoIterator,
    <B::Item as IntoIterator>::Item: Into<String>,
    E: IntoIterator<Item = (usize, usize)>,
{
    fn from((bags, edges): (B, E)) -> Self {
        Decomposition {
            bags: bags
                .into_iter()
                .map(|bag| bag.into_iter().map(Into::into).collect())
                .collect(),
            edges: edges.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Decomposition;

    #[test]
    fn width_of_bags() {
        let decomposition = Decomposition::from((
            vec![vec!["x_1", "x_2", "c_1"], vec!["x_1"]],
            vec![(0, 1)],
        ));
        assert_eq!(decomposition.width(), 2);
        assert_eq!(Decomposition::default().width(), 0);
    }
}
