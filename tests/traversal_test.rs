use graph_template::{
    props, Direction, Evaluation, Evaluators, GraphOperations, GraphTemplate, Node, Path, PropertyValue,
    TraversalDescription, Uniqueness,
};

// Neo -KNOWS-> Morpheus -KNOWS-> Trinity -KNOWS-> Neo
// Morpheus -CODED_BY-> Architect
fn matrix() -> (GraphTemplate, Vec<Node>) {
    let template = GraphTemplate::in_memory();
    let nodes: Vec<Node> = ["Neo", "Morpheus", "Trinity", "Architect"]
        .iter()
        .map(|name| template.create_node(&props! {"name" => *name}).unwrap())
        .collect();
    template.create_relationship(&nodes[0], &nodes[1], "KNOWS", &[]).unwrap();
    template.create_relationship(&nodes[1], &nodes[2], "KNOWS", &[]).unwrap();
    template.create_relationship(&nodes[2], &nodes[0], "KNOWS", &[]).unwrap();
    template.create_relationship(&nodes[1], &nodes[3], "CODED_BY", &[]).unwrap();
    (template, nodes)
}

fn end_names(paths: impl Iterator<Item = Path>) -> Vec<String> {
    paths
        .filter_map(|p| p.end_node().get_property("name").and_then(PropertyValue::as_string).map(str::to_string))
        .collect()
}

#[test]
fn test_breadth_first_friends() {
    let (template, nodes) = matrix();
    let description = TraversalDescription::new()
        .breadth_first()
        .relationships("KNOWS", Direction::Outgoing)
        .evaluator(Evaluators::exclude_start_position());

    let paths = template.traverse(&nodes[0], &description).unwrap();
    assert_eq!(end_names(paths), vec!["Morpheus", "Trinity"]);
}

#[test]
fn test_start_path_first() {
    let (template, nodes) = matrix();
    let description = TraversalDescription::new().relationships("KNOWS", Direction::Outgoing);
    let first = template.traverse(&nodes[0], &description).unwrap().next().unwrap();
    assert_eq!(first.length(), 0);
    assert_eq!(first.start_node().id, nodes[0].id);
}

#[test]
fn test_depth_limits() {
    let (template, nodes) = matrix();
    let base = TraversalDescription::new()
        .breadth_first()
        .relationships("KNOWS", Direction::Both)
        .relationships("CODED_BY", Direction::Outgoing);

    let within_one = template.traverse(&nodes[0], &base.evaluator(Evaluators::to_depth(1))).unwrap();
    assert_eq!(end_names(within_one), vec!["Neo", "Morpheus", "Trinity"]);

    let at_two = template.traverse(&nodes[0], &base.evaluator(Evaluators::at_depth(2))).unwrap();
    assert_eq!(end_names(at_two), vec!["Architect"]);
}

#[test]
fn test_last_relationship_type() {
    let (template, nodes) = matrix();
    let description = TraversalDescription::new().evaluator(Evaluators::last_relationship_type_is(["CODED_BY"]));
    let found = template.traverse(&nodes[0], &description).unwrap().as_vec();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].end_node().id, nodes[3].id);
}

#[test]
fn test_path_uniqueness_allows_revisits() {
    let (template, nodes) = matrix();
    let knows = TraversalDescription::new().relationships("KNOWS", Direction::Outgoing);

    // Around the cycle back to the start
    let relationship_path = knows
        .uniqueness(Uniqueness::RelationshipPath)
        .evaluator(Evaluators::at_depth(3));
    let paths = template.traverse(&nodes[0], &relationship_path).unwrap().as_vec();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].end_node().id, nodes[0].id);

    let node_global = knows.evaluator(Evaluators::at_depth(3));
    assert_eq!(template.traverse(&nodes[0], &node_global).unwrap().count(), 0);
}

#[test]
fn test_custom_evaluator() {
    let (template, nodes) = matrix();
    let description = TraversalDescription::new()
        .relationships("KNOWS", Direction::Outgoing)
        .evaluator(|path: &Path| {
            let is_trinity = path.end_node().get_property("name") == Some(&PropertyValue::from("Trinity"));
            if is_trinity {
                Evaluation::IncludeAndPrune
            } else {
                Evaluation::ExcludeAndContinue
            }
        });
    let paths = template.traverse(&nodes[0], &description).unwrap().as_vec();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].length(), 2);
}

#[test]
fn test_unknown_start_node() {
    let (template, _) = matrix();
    let ghost = Node::new(graph_template::NodeId::new(999));
    let err = template.traverse(&ghost, &TraversalDescription::new()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_depth_first_shared_descendant() {
    let template = GraphTemplate::in_memory();
    let nodes: Vec<Node> = ["a", "b", "c"]
        .iter()
        .map(|name| template.create_node(&props! {"name" => *name}).unwrap())
        .collect();
    template.create_relationship(&nodes[0], &nodes[1], "R", &[]).unwrap();
    template.create_relationship(&nodes[0], &nodes[2], "R", &[]).unwrap();
    template.create_relationship(&nodes[1], &nodes[2], "R", &[]).unwrap();

    let description = TraversalDescription::new()
        .depth_first()
        .relationships("R", Direction::Outgoing);
    let names: Vec<Vec<String>> = template
        .traverse(&nodes[0], &description)
        .unwrap()
        .map(|p| {
            p.nodes()
                .iter()
                .filter_map(|n| n.get_property("name").and_then(PropertyValue::as_string).map(str::to_string))
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(names, vec![vec!["a"], vec!["a", "b"], vec!["a", "b", "c"]]);
}

#[test]
fn test_unbounded_traversal_is_lazy_and_does_not_block_commits() {
    let template = GraphTemplate::in_memory();
    let a = template.create_node(&[]).unwrap();
    let b = template.create_node(&[]).unwrap();
    template.create_relationship(&a, &b, "LINK", &[]).unwrap();

    let description = TraversalDescription::new().uniqueness(Uniqueness::None);
    let mut paths = template.traverse(&a, &description).unwrap();
    let lengths: Vec<usize> = paths.by_ref().take(3).map(|p| p.length()).collect();
    assert_eq!(lengths, vec![0, 1, 2]);

    template.create_node(&[]).unwrap();
    assert_eq!(paths.next().map(|p| p.length()), Some(3));
}
