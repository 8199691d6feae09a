use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::config::{Config, SolverConfig};
use crate::corpus::{Assets, Corpus, RawCodable};
use crate::encoder::{DefaultEncoder, Encoder};
use crate::error::{ForgeError, ForgeResult};
use crate::mapping::ElementMapping;
use crate::objective::{DefaultObjective, Metric, Objective};
use crate::operators::{Constraints, DefaultOperator};
use crate::prism::Prism;
use crate::util::RunIdentifier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub metric: Metric,
    pub loss: f64,
}

/// One row of a printed code table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeTableEntry {
    pub name: String,
    pub full: String,
    pub full_rank: u8,
    pub short: String,
    pub short_rank: u8,
    pub frequency: u64,
}

#[derive(TypedBuilder)]
pub struct ProblemBuildParams {
    pub config: Config,
    pub codables: Vec<RawCodable>,
    #[builder(default)]
    pub assets: Assets,
}

impl ProblemBuildParams {
    /// Resolves names, compiles constraints and primes nothing; the first
    /// evaluation scores from scratch.
    pub fn build_problem(self) -> ForgeResult<Problem> {
        let Self {
            config,
            codables,
            assets,
        } = self;
        config.validate()?;
        let max_length = config.encoder.max_length;

        let (prism, initial) = Prism::build(&config.form, &config.encoder)?;
        let corpus = Corpus::build(codables, &prism, max_length)?;
        let encoder = DefaultEncoder::new(&corpus, &prism, &config.encoder)?;
        let objective = DefaultObjective::new(&corpus, &prism, &config.objective, &assets, max_length)?;
        let constraints = Constraints::build(&config.constraints, &prism, &initial)?;
        let weights = match &config.solver {
            SolverConfig::SimulatedAnnealing(c) => c.mutation.clone(),
            SolverConfig::Genetic(c) => c.mutation.clone(),
        };
        let operator = DefaultOperator::new(constraints, weights);
        let run_id = RunIdentifier::from_parts(&config, &corpus, &assets)?;

        info!(
            "Problem {}: {} elements on {} keys, {} objects, {} movable",
            run_id.short(),
            prism.element_count(),
            prism.alphabet.len(),
            corpus.len(),
            operator.movable().len()
        );
        Ok(Problem::new(prism, corpus, initial, encoder, objective, operator).with_run_id(run_id))
    }
}

/// Everything a search needs: the element numbering, the corpus, the encoder,
/// the objective and the mutation operators.
pub struct Problem<E = DefaultEncoder, O = DefaultObjective> {
    prism: Prism,
    corpus: Corpus,
    initial: ElementMapping,
    encoder: E,
    objective: O,
    operator: DefaultOperator,
    last: Option<ElementMapping>,
    run_id: Option<RunIdentifier>,
}

impl<E: Encoder, O: Objective> Problem<E, O> {
    pub fn new(
        prism: Prism,
        corpus: Corpus,
        initial: ElementMapping,
        encoder: E,
        objective: O,
        operator: DefaultOperator,
    ) -> Self {
        Self {
            prism,
            corpus,
            initial,
            encoder,
            objective,
            operator,
            last: None,
            run_id: None,
        }
    }

    pub fn with_run_id(mut self, run_id: RunIdentifier) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn prism(&self) -> &Prism {
        &self.prism
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// The mapping given in the configuration.
    pub fn initial(&self) -> &ElementMapping {
        &self.initial
    }

    pub fn operator(&self) -> &DefaultOperator {
        &self.operator
    }

    pub fn operator_mut(&mut self) -> &mut DefaultOperator {
        &mut self.operator
    }

    pub fn run_id(&self) -> Option<&RunIdentifier> {
        self.run_id.as_ref()
    }

    fn check_len(&self, mapping: &ElementMapping) -> ForgeResult<()> {
        if mapping.len() != self.prism.element_count() {
            return Err(ForgeError::Validation(format!(
                "mapping covers {} elements, expected {}",
                mapping.len(),
                self.prism.element_count()
            )));
        }
        Ok(())
    }

    fn remember(&mut self, mapping: &ElementMapping) {
        match &mut self.last {
            Some(last) => last.clone_from(mapping),
            None => self.last = Some(mapping.clone()),
        }
    }

    /// Scores a mapping, re-encoding only the objects that contain elements
    /// whose keys differ from the previously evaluated mapping.
    pub fn evaluate(&mut self, mapping: &ElementMapping) -> ForgeResult<Evaluation> {
        self.check_len(mapping)?;
        let moved = self.last.as_ref().map(|last| mapping.diff(last));
        let codes = self.encoder.encode(mapping, moved.as_deref());
        let scored = self.objective.evaluate(codes);
        // the encoder now holds this mapping's codes, whether or not it scored
        self.remember(mapping);
        let (metric, loss) = scored?;
        Ok(Evaluation { metric, loss })
    }

    /// Scores a mapping with a full re-encode and a batch objective pass.
    /// Agrees with [`Problem::evaluate`] on the same mapping.
    pub fn evaluate_from_scratch(&mut self, mapping: &ElementMapping) -> ForgeResult<Evaluation> {
        mapping.validate(
            self.prism.element_count(),
            self.prism.radix,
            &self.prism.alphabet,
        )?;
        let codes = self.encoder.encode(mapping, None);
        let scored = self.objective.evaluate_batch(codes);
        self.remember(mapping);
        let (metric, loss) = scored?;
        debug!("Scratch evaluation: {:.6}", loss);
        Ok(Evaluation { metric, loss })
    }

    /// Full and short codes of every object, in input order.
    pub fn code_table(&mut self, mapping: &ElementMapping) -> ForgeResult<Vec<CodeTableEntry>> {
        self.check_len(mapping)?;
        let codes = self.encoder.encode(mapping, None);
        let mut rows: Vec<(usize, CodeTableEntry)> = self
            .corpus
            .objects
            .iter()
            .zip(codes)
            .map(|(object, info)| {
                (
                    object.original_order,
                    CodeTableEntry {
                        name: object.name.clone(),
                        full: self.prism.decode(info.full.actual),
                        full_rank: info.full.rank,
                        short: self.prism.decode(info.short.actual),
                        short_rank: info.short.rank,
                        frequency: object.frequency,
                    },
                )
            })
            .collect();
        self.remember(mapping);
        rows.sort_by_key(|(order, _)| *order);
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem() -> Problem {
        let config = Config::from_json(
            &serde_json::json!({
                "form": { "alphabet": "ab", "mapping": { "X": "a", "Y": "a" } },
                "encoder": { "max_length": 2 },
                "objective": { "characters_full": { "duplication": 1.0 } }
            })
            .to_string(),
        )
        .unwrap();
        ProblemBuildParams::builder()
            .config(config)
            .codables(vec![
                RawCodable::new("甲", "X Y", 3),
                RawCodable::new("乙", "Y X", 2),
                RawCodable::new("丙", "X X", 1),
            ])
            .build()
            .build_problem()
            .unwrap()
    }

    #[test]
    fn test_initial_mapping_has_collisions() {
        let mut p = problem();
        let initial = p.initial().clone();
        let eval = p.evaluate(&initial).unwrap();
        // all three objects share "aa"; only the most frequent one is unique
        assert!((eval.loss - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_code_table_follows_input_order() {
        let mut p = problem();
        let initial = p.initial().clone();
        let table = p.code_table(&initial).unwrap();
        let names: Vec<_> = table.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["甲", "乙", "丙"]);
        assert_eq!(table[0].full, "aa");
        // later claimants of a taken code need the select key
        assert_eq!(table[1].full, "aa_");
        assert_eq!(table[0].full_rank, 0);
        assert_eq!(table[2].full_rank, 2);
    }

    #[test]
    fn test_wrong_length_mapping_is_rejected() {
        let mut p = problem();
        let short = ElementMapping::new(vec![0, 1]);
        assert!(matches!(p.evaluate(&short), Err(ForgeError::Validation(_))));
    }
}
