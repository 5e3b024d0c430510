use amrgen_core::{GenError, Hyperparameters};

const REFERENCE_CONFIG: &str = include_str!("../../../../config/reference.json");

#[test]
fn shipped_reference_config_matches_defaults() {
    let params = Hyperparameters::from_json_str(REFERENCE_CONFIG).unwrap();
    assert_eq!(params, Hyperparameters::default());
}

#[test]
fn partial_config_overrides_only_listed_values() {
    let params = Hyperparameters::from_json_str(
        r#"{ "weights": { "language_model": 2.5 }, "max_reorder_degree": 4 }"#,
    )
    .unwrap();
    assert_eq!(params.weights.language_model, 2.5);
    assert_eq!(params.max_reorder_degree, 4);
    assert_eq!(params.beams, Hyperparameters::default().beams);
    assert_eq!(params.weights.pos, Hyperparameters::default().weights.pos);
}

#[test]
fn config_round_trips_through_json() {
    let json = Hyperparameters::default().to_json_string().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["beams"]["composition"]["take_best_n"], 8);
    assert_eq!(Hyperparameters::from_json_str(&json).unwrap(), Hyperparameters::default());
}

#[test]
fn invalid_values_are_config_errors() {
    for json in [
        r#"{ "beams": { "pos": { "take_best_n": 0, "max_prob_decrement": 1.0 } } }"#,
        r#"{ "beams": { "reorder": { "take_best_n": 2, "max_prob_decrement": -1.0 } } }"#,
        r#"{ "article_word_weight": 1.5 }"#,
        r#"{ "weights": { "pos": "high" } }"#,
    ] {
        let err = Hyperparameters::from_json_str(json).unwrap_err();
        assert!(matches!(err, GenError::Config(_)), "{}: {:?}", json, err);
    }
}

#[test]
fn missing_file_is_io_error() {
    let err = Hyperparameters::from_path("does/not/exist.json").unwrap_err();
    assert!(matches!(err, GenError::Io(_)), "{:?}", err);
}
