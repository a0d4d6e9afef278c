//! Example of reformulating a small formula along a min-fill decomposition.
use tdrs::{
    formula::Models,
    graph::{self, min_fill},
    literal::{Clause, Variable},
    manager::{options::ReformulationOptions, qdimacs::QdimacsProblem, Reformulator},
};

fn main() {
    let problem = QdimacsProblem::from_clauses(vec![
        Clause::new([1, 2, -3]),
        Clause::new([-1, 3]),
        Clause::new([2, 3]),
    ]);

    let primal_width = min_fill::width(&graph::primal(&problem.clauses));
    println!("width of the primal graph: {primal_width}");

    let reformulator = Reformulator::new(
        ReformulationOptions::builder()
            .unit_propagation(true)
            .build(),
    );
    let decomposition = reformulator.decompose("simple", &problem).unwrap();
    let reformulation = reformulator
        .reformulate("simple", &problem, &decomposition)
        .unwrap();

    println!("width of the decomposition: {}", reformulation.width);
    println!("reformulated CNF:\n{}\n", reformulation.cnf);

    let variables: Vec<_> = (1..=3).map(Variable::problem).collect();
    let models = Models::enumerate(&reformulation.cnf).unwrap();
    println!("models over x_1, x_2, x_3:\n{}", models.project(&variables));

    let mut stdout = std::io::stdout();
    reformulation.tree.draw_tree(&mut stdout).unwrap();
}
