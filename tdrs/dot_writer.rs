use crate::Result;

pub trait Dot {
    fn draw(&self, writer: &mut DotWriter);
}

pub enum Edge {
    Simple(usize, usize),
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Simple(from, to) => write!(f, "{from} -> {to}"),
        }
    }
}

#[derive(Default)]
pub struct DotWriter {
    graph_name: String,

    nodes: Vec<(usize, NodeType)>,
    edges: Vec<Edge>,
}

pub enum NodeType {
    /// Record with the node number in the first field and the bag in the second one.
    Record(String, String),
    /// Record of a node inserted while normalizing the tree.
    DashedRecord(String, String),
}

impl NodeType {
    fn shape(&self) -> String {
        match self {
            NodeType::Record(_, _) => "shape=record".to_owned(),
            NodeType::DashedRecord(_, _) => "shape=record, style=dashed".to_owned(),
        }
    }

    fn label(&self) -> String {
        match self {
            NodeType::Record(fst, snd) | NodeType::DashedRecord(fst, snd) => {
                format!("label=\"<f0> {fst} | <f1> {snd}\"")
            }
        }
    }

    fn metadata() -> String {
        "height=.25".to_owned()
    }
}

impl DotWriter {
    #[must_use]
    pub fn new(graph_name: String) -> DotWriter {
        DotWriter {
            graph_name,
            ..Default::default()
        }
    }

    pub fn add_node(&mut self, node_idx: usize, node_type: NodeType) {
        self.nodes.push((node_idx, node_type));
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// # Errors
    /// Function returns an error if the writing to a file or flushing fails.
    pub fn write(&self, writer: &mut dyn std::io::Write) -> Result<()> {
        write!(writer, "digraph {} {{\n  overlap=false", self.graph_name)?;

        for (node, node_type) in &self.nodes {
            write!(
                writer,
                "\n  {node} [{}, {}, {}]",
                node_type.shape(),
                node_type.label(),
                NodeType::metadata(),
            )?;
        }

        for edge in &self.edges {
            write!(writer, "\n  {edge} [arrowsize=.50]")?;
        }

        write!(writer, "\n}}")?;
        writer.flush()?;
        Ok(())
    }
}
