use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::{
    decomposition::Decomposition,
    dot_writer::{Dot, DotWriter, Edge, NodeType},
    graph::Vertex,
    literal::{Clause, ClauseIdx, ClauseVariable, NodeId, Variable},
    Error, Result,
};

/// Position of the root in the arena.
pub const ROOT: usize = 0;

/// Node of a [`DecompositionTree`]. Parent and children are positions in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    number: NodeId,
    parent: Option<usize>,
    children: Vec<usize>,
    bag_x: BTreeSet<u32>,
    bag_c: BTreeSet<ClauseIdx>,
    cloned: bool,
}

impl Node {
    fn from_bag(number: NodeId, bag: &BTreeSet<String>, clauses: &[Clause]) -> Result<Node> {
        let mut bag_x = BTreeSet::new();
        let mut bag_c = BTreeSet::new();

        for entry in bag {
            match entry.parse::<Vertex>()? {
                Vertex::Variable(0) => return Err(Error::MalformedBagEntry(entry.clone())),
                Vertex::Variable(idx) => {
                    bag_x.insert(idx);
                }
                Vertex::Clause(clause) => {
                    if clause.0 == 0 || clause.position() >= clauses.len() {
                        return Err(Error::MissingClause {
                            clause,
                            node: number,
                            clauses: clauses.len(),
                        });
                    }
                    bag_c.insert(clause);
                }
            }
        }

        Ok(Node {
            number,
            parent: None,
            children: Vec::new(),
            bag_x,
            bag_c,
            cloned: false,
        })
    }

    #[must_use]
    pub fn number(&self) -> NodeId {
        self.number
    }

    #[must_use]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The node was inserted while normalizing the tree.
    #[must_use]
    pub fn is_clone(&self) -> bool {
        self.cloned
    }

    /// Indices of the problem variables in the bag.
    #[must_use]
    pub fn bag_x(&self) -> &BTreeSet<u32> {
        &self.bag_x
    }

    /// Clauses with a clause variable in the bag.
    #[must_use]
    pub fn bag_c(&self) -> &BTreeSet<ClauseIdx> {
        &self.bag_c
    }

    #[must_use]
    pub fn has_clause_variable(&self, clause: ClauseIdx) -> bool {
        self.bag_c.contains(&clause)
    }

    #[must_use]
    pub fn clause_variable(&self, clause: ClauseIdx) -> Option<ClauseVariable> {
        self.has_clause_variable(clause)
            .then(|| ClauseVariable::new(clause, self.number))
    }

    pub fn clause_variables(&self) -> impl Iterator<Item = ClauseVariable> + '_ {
        self.bag_c
            .iter()
            .map(|clause| ClauseVariable::new(*clause, self.number))
    }

    /// Problem variables of the bag followed by its clause variables.
    #[must_use]
    pub fn bag(&self) -> Vec<Variable> {
        self.bag_x
            .iter()
            .map(|idx| Variable::Problem(*idx))
            .chain(self.clause_variables().map(Variable::Clause))
            .collect()
    }

    /// Number of entries in the bag.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bag_x.len() + self.bag_c.len()
    }
}

/// Rooted decomposition tree over the clauses of a formula, stored as an arena.
#[derive(Debug, Clone)]
pub struct DecompositionTree<'c> {
    nodes: Vec<Node>,
    clauses: &'c [Clause],
}

impl<'c> DecompositionTree<'c> {
    /// Root the decomposition at its first bag and link every bag to its parent.
    ///
    /// Edges are consumed from a worklist starting at the root. Children keep
    /// the order of the edge list.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * there are no bags,
    /// * an edge references a missing bag or is a self-loop,
    /// * the edges contain a cycle,
    /// * a bag entry is malformed or references a missing clause,
    /// * some bags are not reachable from the root.
    #[instrument(skip_all, fields(bags = decomposition.bags.len(), edges = decomposition.edges.len()))]
    pub fn build(decomposition: &Decomposition, clauses: &'c [Clause]) -> Result<Self> {
        if decomposition.bags.is_empty() {
            return Err(Error::MalformedDecomposition(
                "decomposition has no bags".to_owned(),
            ));
        }

        let mut nodes = decomposition
            .bags
            .iter()
            .enumerate()
            .map(|(position, bag)| Node::from_bag(NodeId::from_position(position), bag, clauses))
            .collect::<Result<Vec<_>>>()?;

        for (fst, snd) in &decomposition.edges {
            if *fst >= nodes.len() || *snd >= nodes.len() {
                return Err(Error::MalformedDecomposition(format!(
                    "edge ({fst}, {snd}) references a missing bag"
                )));
            }

            if fst == snd {
                return Err(Error::MalformedDecomposition(format!(
                    "edge ({fst}, {snd}) is a self-loop"
                )));
            }
        }

        let mut reached = vec![false; nodes.len()];
        reached[ROOT] = true;

        let mut edges = decomposition.edges.clone();
        let mut worklist = vec![ROOT];
        while let Some(idx) = worklist.pop() {
            let mut remaining = Vec::with_capacity(edges.len());
            for (fst, snd) in edges {
                let child = if fst == idx {
                    snd
                } else if snd == idx {
                    fst
                } else {
                    remaining.push((fst, snd));
                    continue;
                };

                if reached[child] {
                    return Err(Error::MalformedDecomposition(format!(
                        "edge ({fst}, {snd}) closes a cycle"
                    )));
                }

                reached[child] = true;
                nodes[child].parent = Some(idx);
                nodes[idx].children.push(child);
                worklist.push(child);
            }
            edges = remaining;
        }

        let unreachable: Vec<_> = nodes
            .iter()
            .zip(&reached)
            .filter(|(_, reached)| !**reached)
            .map(|(node, _)| node.number)
            .collect();
        if !unreachable.is_empty() {
            return Err(Error::UnreachableBags { nodes: unreachable });
        }

        debug!(nodes = nodes.len(), "built decomposition tree");
        Ok(DecompositionTree { nodes, clauses })
    }

    /// Insert clones so that no node has more than two children.
    ///
    /// A node with three children gets one clone holding the first two children.
    /// A node with more children gets two clones splitting the children at the
    /// midpoint. Clones copy the bag of the node and are normalized as well.
    #[instrument(skip_all, fields(nodes = self.nodes.len()))]
    pub fn normalize(&mut self) {
        let mut stack = vec![ROOT];
        while let Some(idx) = stack.pop() {
            let children = std::mem::take(&mut self.nodes[idx].children);
            let children = match children.len() {
                3 => vec![self.insert_clone(idx, &children[..2]), children[2]],
                len if len > 3 => {
                    let (fst, snd) = children.split_at(len / 2);
                    vec![self.insert_clone(idx, fst), self.insert_clone(idx, snd)]
                }
                _ => children,
            };

            stack.extend(children.iter().copied());
            self.nodes[idx].children = children;
        }

        debug!(nodes = self.nodes.len(), "normalized decomposition tree");
    }

    fn insert_clone(&mut self, parent: usize, children: &[usize]) -> usize {
        let idx = self.nodes.len();
        let original = &self.nodes[parent];
        let clone = Node {
            number: NodeId::from_position(idx),
            parent: Some(parent),
            children: children.to_vec(),
            bag_x: original.bag_x.clone(),
            bag_c: original.bag_c.clone(),
            cloned: true,
        };

        for child in children {
            self.nodes[*child].parent = Some(idx);
        }
        self.nodes.push(clone);
        idx
    }

    /// Every node has at most two children.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.nodes.iter().all(|node| node.children.len() <= 2)
    }

    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[ROOT]
    }

    #[must_use]
    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes inserted by [`DecompositionTree::normalize`].
    #[must_use]
    pub fn clones(&self) -> usize {
        self.nodes.iter().filter(|node| node.cloned).count()
    }

    #[must_use]
    pub fn clauses(&self) -> &'c [Clause] {
        self.clauses
    }

    #[must_use]
    pub fn clause(&self, clause: ClauseIdx) -> Option<&'c Clause> {
        if clause.0 == 0 {
            return None;
        }
        self.clauses.get(clause.position())
    }

    /// Largest bag size minus one over the whole tree.
    #[must_use]
    pub fn width(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| node.size().saturating_sub(1))
            .max()
            .unwrap_or(0)
    }

    /// Problem variables of `clause` that enter its clause variable at node `idx`:
    /// those in the bag of the node, minus the ones in the bag of any child that
    /// carries a clause variable for the same clause.
    #[must_use]
    pub fn introduced_x(&self, idx: usize, clause: ClauseIdx) -> BTreeSet<u32> {
        let Some(variables) = self.clause(clause).map(Clause::variables) else {
            return BTreeSet::new();
        };

        let node = &self.nodes[idx];
        let mut introduced: BTreeSet<u32> = node.bag_x.intersection(&variables).copied().collect();
        for child in node.children.iter().map(|child| &self.nodes[*child]) {
            if child.has_clause_variable(clause) {
                introduced.retain(|variable| !child.bag_x.contains(variable));
            }
        }
        introduced
    }

    /// Positions of the nodes in pre-order, children in their order.
    #[must_use]
    pub fn pre_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.nodes[idx].children.iter().rev());
        }
        order
    }

    /// Positions of the nodes such that every node comes after all of its descendants.
    #[must_use]
    pub fn post_order(&self) -> Vec<usize> {
        let mut order = self.pre_order();
        order.reverse();
        order
    }

    /// Draw the tree to the DOT Graphviz format.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    pub fn draw_tree(&self, writer: &mut dyn std::io::Write) -> Result<()> {
        let mut dot_writer = DotWriter::new(String::from("decomposition"));
        self.draw(&mut dot_writer);
        dot_writer.write(writer)
    }
}

impl Dot for DecompositionTree<'_> {
    fn draw(&self, writer: &mut DotWriter) {
        for node in &self.nodes {
            let id = node.number.0 as usize;
            let bag = node
                .bag()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");

            if node.cloned {
                writer.add_node(id, NodeType::DashedRecord(node.number.to_string(), bag));
            } else {
                writer.add_node(id, NodeType::Record(node.number.to_string(), bag));
            }

            for child in &node.children {
                writer.add_edge(Edge::Simple(id, self.nodes[*child].number.0 as usize));
            }
        }
    }
}
