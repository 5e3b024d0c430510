use amrgen_core::engine::graph::Mode;
use amrgen_core::engine::realize::PLACEHOLDER_SCORE;
use amrgen_core::engine::roles::MULTI_SENTENCE;
use amrgen_core::engine::surface::extract_yield;
use amrgen_core::engine::transition::{Slot, StructuralTransition};
use amrgen_core::{generate, generate_batch, AmrGraph, Generation, Generator, Hyperparameters};
use amrgen_tests::{
    coordination_graph, developer_graph, dog_graph, happy_graph, init_tracing, reference_model,
    reference_resources, CountingModel,
};

fn run(graph: AmrGraph) -> Generation {
    init_tracing();
    let model = reference_model();
    let resources = reference_resources();
    generate(graph, &model.oracles(), &resources, &Hyperparameters::default()).unwrap()
}

#[test]
fn reentrant_graph_generates_reference_sentence() {
    let generation = run(developer_graph());
    assert_eq!(generation.text, "the developer wants to sleep .");
    assert_eq!(generation.report.links.len(), 1);
    assert_eq!(generation.report.merges.len(), 1);
    assert!(generation.score.is_finite());
    assert!(generation.score <= generation.score_without_lm);
}

#[test]
fn merged_vertex_carries_merge_pos() {
    let generation = run(developer_graph());
    let developer = generation
        .graph
        .vertices()
        .find(|v| &*v.instance == "developer")
        .expect("merged vertex");
    assert_eq!(developer.pos.as_deref(), Some("NN"));
    let decisions = generation.ptf.get(developer.id).expect("decisions");
    assert_eq!(decisions.realization.as_deref(), Some("developer"));
}

#[test]
fn simple_clause_gets_article_and_full_stop() {
    assert_eq!(run(dog_graph()).text, "the dog barks .");
}

#[test]
fn domain_subject_gets_auxiliary() {
    assert_eq!(run(happy_graph()).text, "boys are happy .");
}

#[test]
fn coordination_keeps_operand_order() {
    assert_eq!(run(coordination_graph()).text, "apples pears and plums .");
}

#[test]
fn interrogative_mode_ends_with_question_mark() {
    let mut graph = dog_graph();
    graph.set_mode(graph.root(), Mode::Interrogative).unwrap();
    assert_eq!(run(graph).text, "the dog barks ?");
}

#[test]
fn multi_sentence_children_follow_sentence_numbers() {
    let mut g = AmrGraph::new();
    let root = g.add_vertex(MULTI_SENTENCE);
    let bark = g.add_vertex("bark-01");
    let dog = g.add_vertex("dog");
    let happy = g.add_vertex("happy");
    let boy = g.add_vertex("boy");
    g.add_edge(root, bark, "snt2").unwrap();
    g.add_edge(bark, dog, "ARG0").unwrap();
    g.add_edge(root, happy, "snt1").unwrap();
    g.add_edge(happy, boy, "domain").unwrap();

    // the first sentence is short and not last, so it closes with a comma
    assert_eq!(run(g).text, "boys are happy , the dog barks .");
}

#[test]
fn single_vertex_never_queries_order_or_insertion() {
    init_tracing();
    let model = CountingModel::new(reference_model());
    let resources = reference_resources();
    let mut g = AmrGraph::new();
    g.add_vertex("dog");

    let generation =
        generate(g, &model.oracles(), &resources, &Hyperparameters::default()).unwrap();
    assert_eq!(generation.text, "the dog .");
    assert_eq!(model.reorder_calls(), 0);
    assert_eq!(model.insertion_calls(), 0);
}

#[test]
fn children_query_order_and_insertion_oracles() {
    init_tracing();
    let model = CountingModel::new(reference_model());
    let resources = reference_resources();
    let generation =
        generate(dog_graph(), &model.oracles(), &resources, &Hyperparameters::default()).unwrap();
    assert_eq!(generation.text, "the dog barks .");
    assert!(model.reorder_calls() > 0);
    assert!(model.insertion_calls() > 0);
}

#[test]
fn yield_of_winning_decisions_matches_text() {
    for graph in [developer_graph(), dog_graph(), happy_graph(), coordination_graph()] {
        let generation = run(graph);
        assert_eq!(
            extract_yield(&generation.graph, &generation.ptf),
            generation.text,
            "tree: {}",
            generation.graph.render(generation.graph.root())
        );
    }
}

#[test]
fn generation_is_deterministic() {
    let first = run(developer_graph());
    let second = run(developer_graph());
    assert_eq!(first.text, second.text);
    assert_eq!(first.score.to_bits(), second.score.to_bits());
    assert_eq!(first.report, second.report);
}

#[test]
fn empty_graph_generates_empty_text() {
    let generation = run(AmrGraph::new());
    assert_eq!(generation.text, "");
    assert_eq!(generation.score, f64::NEG_INFINITY);
    assert!(generation.ptf.is_empty());
}

#[test]
fn unknown_concepts_fall_back_to_stems() {
    let mut g = AmrGraph::new();
    let run_v = g.add_vertex("run-02");
    let cat = g.add_vertex("cat");
    g.add_edge(run_v, cat, "ARG0").unwrap();
    let text = run(g).text;
    assert!(text.contains("run"), "{}", text);
    assert!(text.contains("cat"), "{}", text);
    assert!(text.ends_with('.'));
}

#[test]
fn batch_keeps_input_order() {
    init_tracing();
    let model = reference_model();
    let resources = reference_resources();
    let results = generate_batch(
        vec![dog_graph(), happy_graph(), developer_graph()],
        &model.oracles(),
        &resources,
        &Hyperparameters::default(),
    )
    .unwrap();
    let texts: Vec<String> = results.into_iter().map(|r| r.unwrap().text).collect();
    assert_eq!(
        texts,
        vec!["the dog barks .", "boys are happy .", "the developer wants to sleep ."]
    );
}

#[test]
fn generator_reuses_lm_cache_across_graphs() {
    let model = reference_model();
    let resources = reference_resources();
    let params = Hyperparameters::default();
    let generator = Generator::new(model.oracles(), &resources, &params).unwrap();

    generator.generate(dog_graph()).unwrap();
    let after_first = generator.cache_stats();
    assert!(after_first.misses > 0);
    assert!(after_first.entries > 0);

    generator.generate(dog_graph()).unwrap();
    let after_second = generator.cache_stats();
    assert!(after_second.hits > after_first.hits);
    assert_eq!(after_second.entries, after_first.entries);
}

#[test]
fn invalid_hyperparameters_are_rejected_before_search() {
    let model = reference_model();
    let resources = reference_resources();
    let mut params = Hyperparameters::default();
    params.beams.composition.take_best_n = 0;
    assert!(Generator::new(model.oracles(), &resources, &params).is_err());
}

#[test]
fn never_deleted_concepts_survive_delete_ranking() {
    let mut model = reference_model();
    model.structural.insert(
        "want-01".into(),
        vec![(StructuralTransition::Delete, 0.9), (StructuralTransition::Keep, 0.1)],
    );
    let resources = reference_resources();
    let generation = generate(
        developer_graph(),
        &model.oracles(),
        &resources,
        &Hyperparameters::default(),
    )
    .unwrap();
    assert_eq!(generation.report.count(StructuralTransition::Delete), 0);
    assert!(generation.text.contains("wants"));
}

#[test]
fn wide_vertices_keep_identity_order_without_reordering() {
    init_tracing();
    let model = CountingModel::new(reference_model());
    let resources = reference_resources();
    let mut g = AmrGraph::new();
    let and = g.add_vertex("and");
    let colours = ["red", "green", "blue", "white", "black", "pink", "gray"];
    for (k, colour) in colours.iter().enumerate() {
        let v = g.add_vertex(colour);
        g.add_edge(and, v, &format!("op{}", k + 1)).unwrap();
    }

    let generation =
        generate(g, &model.oracles(), &resources, &Hyperparameters::default()).unwrap();
    assert_eq!(model.reorder_calls(), 0);
    assert_eq!(generation.text, "and red green blue white black pink gray .");
    let order = generation
        .ptf
        .get(generation.graph.root())
        .and_then(|d| d.reordering.clone())
        .expect("root order");
    assert_eq!(order.len(), 8);
    assert_eq!(order[0], Slot::Own);
}

#[test]
fn missing_realization_falls_back_to_placeholder() {
    init_tracing();
    let mut model = reference_model();
    model.realizations.insert("dog".into(), Vec::new());
    let resources = reference_resources();
    let generation =
        generate(dog_graph(), &model.oracles(), &resources, &Hyperparameters::default()).unwrap();
    assert_eq!(generation.text, "barks .");
    assert!(generation.score <= PLACEHOLDER_SCORE, "{}", generation.score);
    assert!(generation.score_without_lm <= PLACEHOLDER_SCORE);
    assert_eq!(extract_yield(&generation.graph, &generation.ptf), generation.text);
}

#[test]
fn child_insertion_adds_a_word_to_the_phrase() {
    init_tracing();
    let mut model = reference_model();
    model
        .child_insertions
        .insert("bark-01".into(), vec![(Some("not".into()), 0.9), (None, 0.1)]);
    let resources = reference_resources();
    let mut params = Hyperparameters::default();
    params.weights.language_model = 0.0;

    let generation = generate(dog_graph(), &model.oracles(), &resources, &params).unwrap();
    assert_eq!(generation.text, "the dog barks not .");
    let bark = generation.graph.root();
    let decisions = generation.ptf.get(bark).expect("decisions");
    assert_eq!(decisions.inserted_child.as_deref(), Some("not"));
    // the inserted word lives in the order, not in the graph
    assert_eq!(generation.graph.child_count(bark), 1);
    assert!(decisions
        .reordering
        .as_ref()
        .is_some_and(|order| order.contains(&Slot::Inserted)));
    assert_eq!(extract_yield(&generation.graph, &generation.ptf), generation.text);
}

#[test]
fn named_vertex_uses_name_table_without_article() {
    let mut g = AmrGraph::new();
    let bark = g.add_vertex("bark-01");
    let city = g.add_named_vertex("city", "Paris");
    g.add_edge(bark, city, "ARG0").unwrap();

    let generation = run(g);
    assert_eq!(generation.text, "Paris barks .");
    let decisions = generation.ptf.get(city).expect("decisions");
    assert_eq!(decisions.realization.as_deref(), Some("Paris"));
    assert_eq!(decisions.denominator, None);
}

#[test]
fn unlisted_named_concept_uses_the_bare_name() {
    let mut g = AmrGraph::new();
    let bark = g.add_vertex("bark-01");
    let dog = g.add_named_vertex("dog", "Rex");
    g.add_edge(bark, dog, "ARG0").unwrap();

    let generation = run(g);
    assert_eq!(generation.text, "Rex barks .");
    assert_eq!(generation.ptf.get(dog).and_then(|d| d.denominator), None);
}
