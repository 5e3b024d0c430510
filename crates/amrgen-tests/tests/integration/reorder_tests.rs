use amrgen_core::engine::beam::BeamWidth;
use amrgen_core::engine::oracle::{OrderItem, VertexContext};
use amrgen_core::engine::reorder::{satisfies_constraints, ReorderScorer};
use amrgen_core::engine::tables::TableModel;
use amrgen_core::{generate, AmrGraph, Hyperparameters, Resources};

fn item(label: &'static str) -> OrderItem<'static> {
    OrderItem {
        label,
        concept: label,
        realization: label,
        inserted: false,
    }
}

fn token_position(text: &str, token: &str) -> usize {
    text.split_whitespace()
        .position(|t| t == token)
        .unwrap_or_else(|| panic!("{:?} not in {:?}", token, text))
}

#[test]
fn date_components_keep_calendar_order_against_oracle() {
    let mut model = TableModel::default();
    // the oracle would put the year first
    model.head_order.insert("year".into(), 0.99);
    model.head_order.insert("month".into(), 0.01);
    model.head_order.insert("day".into(), 0.01);
    model.pair_order.insert("year month".into(), 0.99);
    model.pair_order.insert("year day".into(), 0.99);

    let mut g = AmrGraph::new();
    let date = g.add_vertex("date-entity");
    for (label, value) in [("year", "2020"), ("month", "5"), ("day", "3")] {
        let v = g.add_vertex(value);
        g.add_edge(date, v, label).unwrap();
    }

    let text = generate(
        g,
        &model.oracles(),
        &Resources::default(),
        &Hyperparameters::default(),
    )
    .unwrap()
    .text;
    assert!(token_position(&text, "5") < token_position(&text, "3"), "{}", text);
    assert!(token_position(&text, "3") < token_position(&text, "2020"), "{}", text);
}

#[test]
fn partial_dates_follow_the_oracle() {
    let mut model = TableModel::default();
    model.head_order.insert("year".into(), 0.99);
    model.head_order.insert("month".into(), 0.01);
    model.pair_order.insert("year month".into(), 0.99);

    let mut g = AmrGraph::new();
    let date = g.add_vertex("date-entity");
    for (label, value) in [("year", "2020"), ("month", "5")] {
        let v = g.add_vertex(value);
        g.add_edge(date, v, label).unwrap();
    }

    let text = generate(
        g,
        &model.oracles(),
        &Resources::default(),
        &Hyperparameters::default(),
    )
    .unwrap()
    .text;
    assert!(token_position(&text, "2020") < token_position(&text, "date-entity"), "{}", text);
    assert!(token_position(&text, "date-entity") < token_position(&text, "5"), "{}", text);
}

#[test]
fn scorer_never_returns_constraint_violations() {
    let model = TableModel::default();
    let g = AmrGraph::new();
    let ctx = VertexContext::new(&g, g.root());
    let items = [item("and"), item("op3"), item("op1"), item("ARG0"), item("op2")];
    let scorer = ReorderScorer::new(&model, BeamWidth::new(50, f64::INFINITY));

    let best = scorer.best_orders(&ctx, &items, Some(0));
    assert!(!best.is_empty());
    for (perm, score) in best.iter() {
        assert!(satisfies_constraints(&items, perm, Some(0)));
        assert!(score.is_finite());
        let ops: Vec<&str> = perm
            .iter()
            .map(|&i| items[i].label)
            .filter(|l| l.starts_with("op"))
            .collect();
        assert_eq!(ops, vec!["op1", "op2", "op3"]);
    }
}

#[test]
fn scorer_prefers_oracle_order() {
    let mut model = TableModel::default();
    model.head_order.insert("ARG0".into(), 0.9);
    model.head_order.insert("ARG1".into(), 0.1);
    let g = AmrGraph::new();
    let ctx = VertexContext::new(&g, g.root());
    let items = [item("want-01"), item("ARG1"), item("ARG0")];
    let scorer = ReorderScorer::new(&model, BeamWidth::new(3, 10.0));

    let best = scorer.best_orders(&ctx, &items, Some(0)).into_vec();
    let labels: Vec<&str> = best[0].0.iter().map(|&i| items[i].label).collect();
    assert_eq!(labels, vec!["ARG0", "want-01", "ARG1"]);
    assert!((best[0].1 - 2.0 * 0.9f64.ln()).abs() < 1e-9);
}

#[test]
fn deleted_head_puts_every_item_left() {
    let mut model = TableModel::default();
    model.head_order.insert("op1".into(), 0.9);
    model.head_order.insert("op2".into(), 0.9);
    let g = AmrGraph::new();
    let ctx = VertexContext::new(&g, g.root());
    let items = [item("op2"), item("op1")];
    let scorer = ReorderScorer::new(&model, BeamWidth::new(5, f64::INFINITY));

    let best = scorer.best_orders(&ctx, &items, None).into_vec();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].0, vec![1, 0]);
}

#[test]
fn own_slot_inside_operands_must_be_second_to_last() {
    let items = [item("and"), item("op1"), item("op2"), item("op3")];
    assert!(satisfies_constraints(&items, &[1, 2, 0, 3], Some(0)));
    assert!(!satisfies_constraints(&items, &[1, 0, 2, 3], Some(0)));
    assert!(satisfies_constraints(&items, &[0, 1, 2, 3], Some(0)));
    assert!(satisfies_constraints(&items, &[1, 2, 3, 0], Some(0)));
    assert!(!satisfies_constraints(&items, &[1, 3, 0, 2], Some(0)));
}
