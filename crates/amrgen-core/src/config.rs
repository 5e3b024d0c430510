//! Hyperparameters of the generation search.
//!
//! Every beam width, pruning threshold and score weight used by the engine
//! lives here so it can be tuned from a JSON file without code changes.
//! Each section carries `#[serde(default)]`, so a file only needs to list
//! the values it changes; [`Hyperparameters::default`] is the reference
//! configuration (also shipped as `config/reference.json`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::beam::BeamWidth;
use crate::engine::errors::GenError;

/// Beam settings per decision class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamSettings {
    /// POS candidates per vertex
    pub pos: BeamWidth,
    /// Realization candidates per syntactic annotation
    pub realization: BeamWidth,
    /// INSERT_CHILD options
    pub child_insertion: BeamWidth,
    /// Permutations returned by the reordering scorer
    pub reorder: BeamWidth,
    /// INSERT_BETWEEN options, per side
    pub insertion: BeamWidth,
    /// Articles considered before picking the winner
    pub denominator: BeamWidth,
    /// Hypotheses kept per vertex and per composition step
    pub composition: BeamWidth,
}

impl Default for BeamSettings {
    fn default() -> Self {
        Self {
            pos: BeamWidth::new(2, 3.0),
            realization: BeamWidth::new(3, 4.0),
            child_insertion: BeamWidth::new(2, 3.0),
            reorder: BeamWidth::new(3, 5.0),
            insertion: BeamWidth::new(2, 3.0),
            denominator: BeamWidth::new(3, 5.0),
            composition: BeamWidth::new(8, 12.0),
        }
    }
}

impl BeamSettings {
    fn iter(&self) -> [(&'static str, BeamWidth); 7] {
        [
            ("pos", self.pos),
            ("realization", self.realization),
            ("child_insertion", self.child_insertion),
            ("reorder", self.reorder),
            ("insertion", self.insertion),
            ("denominator", self.denominator),
            ("composition", self.composition),
        ]
    }
}

/// Weights of the score components.
///
/// A hypothesis score is the weighted sum of the log probabilities of every
/// decision it contains plus `language_model` times the normalized LM score
/// of its text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub language_model: f64,
    pub realization: f64,
    pub pos: f64,
    pub number: f64,
    pub tense: f64,
    pub voice: f64,
    pub denominator: f64,
    pub reorder: f64,
    pub insert_child: f64,
    pub insert_before: f64,
    pub insert_after: f64,
    pub insert_arg_before: f64,
    pub insert_arg_after: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            language_model: 1.0,
            realization: 1.0,
            pos: 0.5,
            number: 0.5,
            tense: 0.5,
            voice: 0.5,
            denominator: 0.8,
            reorder: 1.0,
            insert_child: 0.8,
            insert_before: 0.8,
            insert_after: 0.8,
            insert_arg_before: 1.0,
            insert_arg_after: 1.0,
        }
    }
}

impl Weights {
    fn iter(&self) -> [(&'static str, f64); 13] {
        [
            ("language_model", self.language_model),
            ("realization", self.realization),
            ("pos", self.pos),
            ("number", self.number),
            ("tense", self.tense),
            ("voice", self.voice),
            ("denominator", self.denominator),
            ("reorder", self.reorder),
            ("insert_child", self.insert_child),
            ("insert_before", self.insert_before),
            ("insert_after", self.insert_after),
            ("insert_arg_before", self.insert_arg_before),
            ("insert_arg_after", self.insert_arg_after),
        ]
    }
}

/// All tunable parameters of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub beams: BeamSettings,
    pub weights: Weights,
    /// Vertices with more reorderable slots than this keep their identity
    /// order; the number of permutations grows factorially.
    pub max_reorder_degree: usize,
    /// Fraction of a word an article counts as when normalizing LM scores.
    pub article_word_weight: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            beams: BeamSettings::default(),
            weights: Weights::default(),
            max_reorder_degree: 6,
            article_word_weight: 0.5,
        }
    }
}

impl Hyperparameters {
    /// Parses and validates hyperparameters from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, GenError> {
        let params: Hyperparameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Reads, parses and validates a JSON hyperparameter file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GenError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let params = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded hyperparameters");
        Ok(params)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, GenError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects configurations the search cannot run with.
    pub fn validate(&self) -> Result<(), GenError> {
        for (name, width) in self.beams.iter() {
            if width.take_best_n == 0 {
                return Err(GenError::Config(format!(
                    "beams.{}.take_best_n must be at least 1",
                    name
                )));
            }
            if width.max_prob_decrement.is_nan() || width.max_prob_decrement < 0.0 {
                return Err(GenError::Config(format!(
                    "beams.{}.max_prob_decrement must be non-negative, got {}",
                    name, width.max_prob_decrement
                )));
            }
        }
        for (name, weight) in self.weights.iter() {
            if !weight.is_finite() {
                return Err(GenError::Config(format!(
                    "weights.{} must be finite, got {}",
                    name, weight
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.article_word_weight) {
            return Err(GenError::Config(format!(
                "article_word_weight must lie in [0, 1], got {}",
                self.article_word_weight
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_valid() {
        Hyperparameters::default().validate().unwrap();
    }

    #[test]
    fn partial_json_uses_defaults_for_missing_fields() {
        let params = Hyperparameters::from_json_str(
            r#"{ "weights": { "language_model": 2.5 }, "max_reorder_degree": 4 }"#,
        )
        .unwrap();
        assert_eq!(params.weights.language_model, 2.5);
        assert_eq!(params.weights.realization, Weights::default().realization);
        assert_eq!(params.max_reorder_degree, 4);
        assert_eq!(params.beams, BeamSettings::default());
    }

    #[test]
    fn json_round_trip_preserves_values() {
        let mut params = Hyperparameters::default();
        params.beams.reorder = BeamWidth::new(5, 2.0);
        let json = params.to_json_string().unwrap();
        assert_eq!(Hyperparameters::from_json_str(&json).unwrap(), params);
    }

    #[test]
    fn zero_beam_width_is_rejected() {
        let err = Hyperparameters::from_json_str(
            r#"{ "beams": { "reorder": { "take_best_n": 0, "max_prob_decrement": 1.0 } } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("beams.reorder.take_best_n"));
    }

    #[test]
    fn negative_decrement_is_rejected() {
        let mut params = Hyperparameters::default();
        params.beams.insertion.max_prob_decrement = -1.0;
        assert!(matches!(params.validate(), Err(GenError::Config(_))));
    }

    #[test]
    fn article_weight_must_be_a_fraction() {
        let mut params = Hyperparameters::default();
        params.article_word_weight = 1.5;
        assert!(params.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            Hyperparameters::from_json_str("{ weights: }"),
            Err(GenError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            Hyperparameters::from_path("/nonexistent/amrgen/hyperparameters.json"),
            Err(GenError::Io(_))
        ));
    }
}
