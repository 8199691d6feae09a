#![allow(dead_code)]

use mapforge::config::Config;
use mapforge::corpus::{Assets, DistributionLoss, RawCodable};
use mapforge::optimizer::{Message, Reporter};
use mapforge::problem::{Problem, ProblemBuildParams};
use serde_json::{json, Value};
use std::sync::Mutex;

/// Builds configs as JSON so tests exercise the same parsing and
/// validation as the CLI.
pub struct ConfigBuilder {
    value: Value,
}

impl ConfigBuilder {
    pub fn new(alphabet: &str) -> Self {
        Self {
            value: json!({
                "form": { "alphabet": alphabet, "mapping": {} },
                "objective": { "characters_full": { "duplication": 1.0 } }
            }),
        }
    }

    pub fn map(mut self, name: &str, keys: &str) -> Self {
        self.value["form"]["mapping"][name] = json!(keys);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.value["encoder"]["max_length"] = json!(n);
        self
    }

    pub fn encoder(mut self, encoder: Value) -> Self {
        self.value["encoder"] = encoder;
        self
    }

    pub fn objective(mut self, objective: Value) -> Self {
        self.value["objective"] = objective;
        self
    }

    pub fn constraints(mut self, constraints: Value) -> Self {
        self.value["constraints"] = constraints;
        self
    }

    pub fn solver(mut self, solver: Value) -> Self {
        self.value["solver"] = solver;
        self
    }

    pub fn json(&self) -> String {
        self.value.to_string()
    }

    pub fn build(self) -> Config {
        Config::from_json(&self.json()).expect("test config should be valid")
    }
}

pub fn build_problem(config: Config, codables: Vec<RawCodable>, assets: Assets) -> Problem {
    ProblemBuildParams::builder()
        .config(config)
        .codables(codables)
        .assets(assets)
        .build()
        .build_problem()
        .expect("test problem should build")
}

/// Two elements on a two-key alphabet, both starting on `a`. Mapping X and
/// Y to different keys removes every duplicate.
pub fn tiny_config() -> ConfigBuilder {
    ConfigBuilder::new("ab")
        .map("X", "a")
        .map("Y", "a")
        .max_length(2)
}

pub fn tiny_corpus() -> Vec<RawCodable> {
    vec![
        RawCodable::new("甲", "X Y", 3),
        RawCodable::new("乙", "Y X", 2),
        RawCodable::new("丙", "X X", 1),
    ]
}

pub fn tiny_problem(solver: Value) -> Problem {
    build_problem(tiny_config().solver(solver).build(), tiny_corpus(), Assets::default())
}

const RICH_ALPHABET: &str = "abcdefghij";

/// Every metric group and every partial metric switched on.
pub fn rich_config() -> ConfigBuilder {
    let partial = json!({
        "duplication": 1.0,
        "key_distribution": 0.1,
        "pair_equivalence": 0.05,
        "fingering": [0.1, 0.2, 0.1, 0.05, 0.05, 0.1],
        "levels": [{ "length": 1, "frequency": 0.2 }, { "length": 2, "frequency": 0.1 }],
        "tiers": [
            { "top": 10, "duplication": 0.5, "levels": [{ "length": 2, "frequency": 0.1 }] },
            { "top": 50, "fingering": [0.01, 0.02] },
            { "duplication": 0.01 }
        ]
    });
    let mut builder = ConfigBuilder::new(RICH_ALPHABET)
        .encoder(json!({
            "max_length": 4,
            "select_keys": ["_", ";"],
            "auto_select_length": 3,
            "short_code": [
                { "length_equal": 1, "schemes": [{ "prefix": 1 }, { "prefix": 2, "count": 2 }] },
                { "length_in_range": [2, 10], "schemes": [{ "prefix": 3, "select_keys": [";"] }] }
            ]
        }))
        .objective(json!({
            "characters_full": partial,
            "characters_short": partial,
            "words_full": { "duplication": 1.0, "pair_equivalence": 0.02 },
            "words_short": { "duplication": 0.5, "key_distribution": 0.05 }
        }));
    let keys: Vec<char> = RICH_ALPHABET.chars().collect();
    for i in 0..24 {
        let name = format!("E{}", i);
        let key = keys[(i * 7) % keys.len()];
        let mapped = if i % 6 == 0 {
            format!("{}{}", key, keys[(i + 3) % keys.len()])
        } else {
            key.to_string()
        };
        builder = builder.map(&name, &mapped);
    }
    builder
}

/// Labels usable in sequences: every mapped element, second keys included.
fn rich_labels() -> Vec<String> {
    let mut labels = Vec::new();
    for i in 0..24 {
        labels.push(format!("E{}", i));
        if i % 6 == 0 {
            labels.push(format!("E{}.1", i));
        }
    }
    labels
}

pub fn rich_corpus(seed: u64) -> Vec<RawCodable> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let labels = rich_labels();
    let mut out = Vec::new();
    for i in 0..160u32 {
        let name = char::from_u32(0x4E00 + i).map(String::from).unwrap_or_default();
        let len = 1 + rng.usize(..3);
        let sequence: Vec<&str> = (0..len)
            .map(|_| labels[rng.usize(..labels.len())].as_str())
            .collect();
        let mut raw = RawCodable::new(&name, &sequence.join(" "), rng.u64(1..10_000));
        if i % 17 == 0 {
            raw.level = Some(1);
        }
        out.push(raw);
    }
    for i in 0..60u32 {
        let chars = 2 + (i as usize % 3);
        let name: String = (0..chars)
            .filter_map(|k| char::from_u32(0x5000 + i * 4 + k as u32))
            .collect();
        // a few words are too long to encode in full
        let len = if i % 20 == 0 { 5 } else { chars.min(4) };
        let sequence: Vec<&str> = (0..len)
            .map(|_| labels[rng.usize(..labels.len())].as_str())
            .collect();
        out.push(RawCodable::new(&name, &sequence.join(" "), rng.u64(1..5_000)));
    }
    out
}

pub fn rich_assets() -> Assets {
    let mut assets = Assets::default();
    for c in RICH_ALPHABET.chars() {
        assets.key_distribution.insert(
            c,
            DistributionLoss {
                ideal: 10.0,
                lt_penalty: 1.0,
                gt_penalty: 2.0,
            },
        );
    }
    let keys: Vec<char> = RICH_ALPHABET.chars().collect();
    for (i, a) in keys.iter().enumerate() {
        for (j, b) in keys.iter().enumerate() {
            assets
                .pair_equivalence
                .insert(format!("{}{}", a, b), 1.0 + ((i * 3 + j) % 5) as f64 * 0.25);
        }
    }
    assets
}

pub fn rich_problem() -> Problem {
    build_problem(rich_config().build(), rich_corpus(2024), rich_assets())
}

/// Keeps every message; optionally asks the search to stop after `limit`
/// progress messages.
#[derive(Default)]
pub struct RecordingReporter {
    pub messages: Mutex<Vec<Message>>,
    pub stop_after_progress: Option<usize>,
}

impl RecordingReporter {
    pub fn stopping_after(n: usize) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            stop_after_progress: Some(n),
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn better_scores(&self) -> Vec<f64> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::BetterSolution { score, .. } => Some(score),
                _ => None,
            })
            .collect()
    }

    pub fn progress_bests(&self) -> Vec<f64> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Progress { best, .. } => Some(best),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn post(&self, message: &Message) -> bool {
        let mut messages = self.messages.lock().unwrap();
        messages.push(message.clone());
        match self.stop_after_progress {
            Some(limit) => {
                messages
                    .iter()
                    .filter(|m| matches!(m, Message::Progress { .. }))
                    .count()
                    < limit
            }
            None => true,
        }
    }
}

pub fn assert_non_increasing(scores: &[f64]) {
    for pair in scores.windows(2) {
        assert!(
            pair[1] <= pair[0],
            "score went up from {} to {}",
            pair[0],
            pair[1]
        );
    }
}
