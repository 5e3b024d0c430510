use amrgen_core::engine::lexicon::{LexiconTables, SuffixRealizer};
use amrgen_core::engine::structural::StructuralProcessor;
use amrgen_core::engine::tables::TableModel;
use amrgen_core::engine::transition::StructuralTransition;
use amrgen_core::{AmrGraph, Resources};
use amrgen_tests::{developer_graph, reference_model, reference_resources, tree_from_edges};

fn ranking(entries: &[(&str, StructuralTransition)]) -> TableModel {
    let mut model = TableModel::default();
    for (concept, transition) in entries {
        model.structural.insert(
            concept.to_string(),
            vec![(*transition, 0.9), (StructuralTransition::Keep, 0.1)],
        );
    }
    model
}

#[test]
fn reentrancy_becomes_link_and_merge_applies() {
    let model = reference_model();
    let resources = reference_resources();
    let mut g = developer_graph();

    let report = StructuralProcessor::new(&model, &resources).run(&mut g).unwrap();
    g.validate_tree().unwrap();

    assert_eq!(report.links.len(), 1);
    let link = g.vertex(report.links[0]).unwrap();
    assert!(link.is_link());
    assert_eq!(g.incoming_label(link.id), Some("ARG0"));
    let original = link.annotation.original.unwrap();
    assert_eq!(&*g.vertex(original).unwrap().instance, "developer");

    assert_eq!(report.merges.len(), 1);
    assert_eq!(report.count(StructuralTransition::Merge), 1);
    assert!(g.vertices().all(|v| &*v.instance != "develop-02"));
}

#[test]
fn swap_lifts_child_and_inverts_label() {
    // (b / boy :ARG0-of (s / sing-01))
    let mut g = tree_from_edges(&[(0, "boy", ""), (0, "sing-01", "ARG0-of")]);
    let model = ranking(&[("sing-01", StructuralTransition::Swap)]);
    let resources = Resources::default();

    let report = StructuralProcessor::new(&model, &resources).run(&mut g).unwrap();
    g.validate_tree().unwrap();

    assert_eq!(report.swaps.len(), 1);
    let root = g.root();
    assert_eq!(&*g.vertex(root).unwrap().instance, "sing-01");
    let (_, boy) = g.children(root).next().unwrap();
    assert_eq!(&*g.vertex(boy).unwrap().instance, "boy");
    assert_eq!(g.incoming_label(boy), Some("ARG0"));
    assert_eq!(g.vertex(root).unwrap().annotation.swap_count, 1);
    assert_eq!(g.vertex(boy).unwrap().annotation.swap_count, -1);
}

#[test]
fn swap_climbs_until_no_parent_is_left() {
    // (w / want-01 :ARG0 (b / boy :ARG0-of (s / sing-01)))
    let mut g = tree_from_edges(&[
        (0, "want-01", ""),
        (0, "boy", "ARG0"),
        (1, "sing-01", "ARG0-of"),
    ]);
    let model = ranking(&[("sing-01", StructuralTransition::Swap)]);
    let resources = Resources::default();

    let report = StructuralProcessor::new(&model, &resources).run(&mut g).unwrap();
    g.validate_tree().unwrap();

    assert_eq!(report.swaps.len(), 2);
    let root = g.root();
    assert_eq!(&*g.vertex(root).unwrap().instance, "sing-01");
    assert_eq!(g.vertex(root).unwrap().annotation.swap_count, 2);
    let children: Vec<(String, String)> = g
        .children(root)
        .map(|(e, c)| {
            (
                g.edge(e).unwrap().label.to_string(),
                g.vertex(c).unwrap().instance.to_string(),
            )
        })
        .collect();
    assert_eq!(
        children,
        vec![
            ("ARG0".to_string(), "boy".to_string()),
            ("ARG0-of".to_string(), "want-01".to_string()),
        ]
    );
}

#[test]
fn delete_marks_vertex_without_removing_children() {
    let mut g = tree_from_edges(&[(0, "have-03", ""), (0, "girl", "ARG0"), (0, "cat", "ARG1")]);
    let model = ranking(&[("have-03", StructuralTransition::Delete)]);
    let resources = Resources::default();

    let report = StructuralProcessor::new(&model, &resources).run(&mut g).unwrap();
    assert_eq!(report.count(StructuralTransition::Delete), 1);
    let root = g.vertex(g.root()).unwrap();
    assert!(root.annotation.deleted);
    assert_eq!(g.child_count(root.id), 2);
}

#[test]
fn multi_sentence_is_never_deleted() {
    let mut g = tree_from_edges(&[(0, "multi-sentence", ""), (0, "sing-01", "snt1")]);
    let model = ranking(&[("multi-sentence", StructuralTransition::Delete)]);
    let resources = Resources::new(LexiconTables::default(), Box::new(SuffixRealizer));

    let report = StructuralProcessor::new(&model, &resources).run(&mut g).unwrap();
    assert_eq!(report.count(StructuralTransition::Delete), 0);
    assert!(!g.vertex(g.root()).unwrap().annotation.deleted);
}

#[test]
fn every_vertex_is_processed_once_without_swaps() {
    let mut g = tree_from_edges(&[
        (0, "say-01", ""),
        (0, "man", "ARG0"),
        (0, "go-02", "ARG1"),
        (2, "school", "ARG4"),
    ]);
    let model = TableModel::default();
    let resources = Resources::default();
    let report = StructuralProcessor::new(&model, &resources).run(&mut g).unwrap();
    assert_eq!(report.applied.len(), 4);
    assert_eq!(report.count(StructuralTransition::Keep), 4);
    assert_eq!(
        AmrGraph::render(&g, g.root()),
        "(v1/say-01 :ARG0 (v2/man) :ARG1 (v3/go-02 :ARG4 (v4/school)))"
    );
}
