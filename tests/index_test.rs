use graph_template::{props, DataAccessError, GraphOperations, GraphTemplate, IndexQuery, Node, PropertyValue, Relationship};

fn people() -> (GraphTemplate, Vec<Node>) {
    let template = GraphTemplate::in_memory();
    let mut nodes = Vec::new();
    for (name, age) in [("Neo", 29), ("Nebuchadnezzar", 100), ("Morpheus", 40), ("Trinity", 31)] {
        let node = template.create_node(&props! {"name" => name, "age" => age}).unwrap();
        template.index(Some("people"), node.clone(), "name", name).unwrap();
        template.index(Some("people"), node.clone(), "age", age).unwrap();
        nodes.push(node);
    }
    (template, nodes)
}

fn names(found: Vec<Node>) -> Vec<String> {
    found
        .iter()
        .filter_map(|n| n.get_property("name").and_then(PropertyValue::as_string))
        .map(str::to_string)
        .collect()
}

#[test]
fn test_exact_lookup() {
    let (template, _) = people();
    let found = template.lookup::<Node, _>("people", "name", "Morpheus").unwrap().as_vec();
    assert_eq!(names(found), vec!["Morpheus"]);

    let none = template.lookup::<Node, _>("people", "name", "Smith").unwrap().as_vec();
    assert!(none.is_empty());
}

#[test]
fn test_lookup_results_in_id_order() {
    let (template, nodes) = people();
    let found = template.lookup_query::<Node>("people", "*:*").unwrap().as_vec();
    let ids: Vec<_> = found.iter().map(|n| n.id).collect();
    let expected: Vec<_> = nodes.iter().map(|n| n.id).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_query_string_lookup() {
    let (template, _) = people();
    let found = template.lookup_query::<Node>("people", "name:Ne*").unwrap().as_vec();
    assert_eq!(names(found), vec!["Neo", "Nebuchadnezzar"]);

    let found = template
        .lookup_query::<Node>("people", "age:[30 TO 50] AND NOT name:Trinity")
        .unwrap()
        .as_vec();
    assert_eq!(names(found), vec!["Morpheus"]);

    let found = template
        .lookup_query::<Node>("people", "name:Neo name:Trinity")
        .unwrap()
        .as_vec();
    assert_eq!(names(found), vec!["Neo", "Trinity"]);
}

#[test]
fn test_query_object_lookup() {
    let (template, _) = people();
    let query = IndexQuery::range("age", 30, 200).and(IndexQuery::wildcard("name", "?or*").not());
    let found = template.lookup_with::<Node>("people", &query).unwrap().as_vec();
    assert_eq!(names(found), vec!["Nebuchadnezzar", "Trinity"]);
}

#[test]
fn test_array_values_indexed_per_element() {
    let template = GraphTemplate::in_memory();
    let node = template.create_node(&[]).unwrap();
    let tags = PropertyValue::Array(vec![PropertyValue::from("red"), PropertyValue::from("pill")]);
    template.index(Some("tags"), node.clone(), "tag", tags).unwrap();

    let found = template.lookup::<Node, _>("tags", "tag", "pill").unwrap().single().unwrap();
    assert_eq!(found.id, node.id);
}

#[test]
fn test_relationship_index() {
    let template = GraphTemplate::in_memory();
    let a = template.create_node(&[]).unwrap();
    let b = template.create_node(&[]).unwrap();
    let rel = template.create_relationship(&a, &b, "KNOWS", &[]).unwrap();
    template.index(Some("friendships"), rel.clone(), "since", 1999).unwrap();

    let found = template.lookup::<Relationship, _>("friendships", "since", 1999).unwrap().single().unwrap();
    assert_eq!(found.id, rel.id);

    let err = template.lookup::<Node, _>("friendships", "since", 1999).unwrap_err();
    assert!(matches!(err, DataAccessError::InvalidApiUsage(_)));
}

#[test]
fn test_lookup_errors() {
    let (template, _) = people();
    let err = template.lookup::<Node, _>("nowhere", "name", "Neo").unwrap_err();
    assert!(matches!(err, DataAccessError::InvalidResourceUsage(_)));

    let err = template.lookup_query::<Node>("people", "name:(Neo").unwrap_err();
    assert!(matches!(err, DataAccessError::InvalidResourceUsage(_)));
}

#[test]
fn test_deleted_element_leaves_index() {
    let (template, nodes) = people();
    template.delete(&nodes[0]).unwrap();
    let found = template.lookup::<Node, _>("people", "name", "Neo").unwrap().as_vec();
    assert!(found.is_empty());
}
