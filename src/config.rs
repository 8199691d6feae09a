use clap::Args;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use strum::{Display, EnumIter};

use crate::consts::{
    DEFAULT_ANNEALING_STEPS, DEFAULT_REPORT_AFTER, DEFAULT_UPDATE_INTERVAL,
    FINGERING_LABEL_COUNT, MAX_CODE_LENGTH, MAX_WORD_LENGTH,
};
use crate::error::{ForgeError, ForgeResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub form: FormConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub objective: ObjectiveConfig,
    #[serde(default)]
    pub constraints: ConstraintsConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ForgeResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ForgeResult<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects out-of-range values. Structural checks that need the element
    /// numbering (unknown elements, contradictory constraints) happen when the
    /// problem is built.
    pub fn validate(&self) -> ForgeResult<()> {
        self.form.validate()?;
        self.encoder.validate()?;
        self.objective.validate(self.encoder.max_length)?;
        self.constraints.validate()?;
        self.solver.validate()
    }
}

// --- Form ---

/// The decision variable as written by the user: element name to key string.
/// A string of several keys defines elements `name`, `name.1`, `name.2`, ...
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormConfig {
    pub alphabet: String,
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
    /// Element name to representative. Grouped elements always share the
    /// representative's keys.
    #[serde(default)]
    pub grouping: BTreeMap<String, String>,
}

impl FormConfig {
    fn validate(&self) -> ForgeResult<()> {
        if self.alphabet.is_empty() {
            return Err(ForgeError::Config("alphabet must not be empty".into()));
        }
        let mut seen = Vec::new();
        for c in self.alphabet.chars() {
            if seen.contains(&c) {
                return Err(ForgeError::Config(format!(
                    "alphabet contains '{}' twice",
                    c
                )));
            }
            seen.push(c);
        }
        for (name, keys) in &self.mapping {
            if keys.is_empty() {
                return Err(ForgeError::Config(format!(
                    "element '{}' is mapped to an empty key string",
                    name
                )));
            }
        }
        Ok(())
    }
}

// --- Encoder ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub max_length: usize,
    #[serde(default)]
    pub select_keys: Option<Vec<char>>,
    /// Codes at least this long are committed without a select key.
    /// When absent every code auto-selects.
    #[serde(default)]
    pub auto_select_length: Option<usize>,
    #[serde(default)]
    pub short_code: Option<Vec<ShortCodeConfig>>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_length: 4,
            select_keys: None,
            auto_select_length: None,
            short_code: None,
        }
    }
}

impl EncoderConfig {
    fn validate(&self) -> ForgeResult<()> {
        if self.max_length == 0 || self.max_length > MAX_CODE_LENGTH {
            return Err(ForgeError::Config(format!(
                "max_length must be within 1..={}, got {}",
                MAX_CODE_LENGTH, self.max_length
            )));
        }
        if let Some(keys) = &self.select_keys {
            if keys.is_empty() {
                return Err(ForgeError::Config(
                    "select_keys must not be empty when given".into(),
                ));
            }
        }
        if let Some(rules) = &self.short_code {
            for rule in rules {
                let (lo, hi) = rule.length_range();
                if lo == 0 || lo > hi || hi > MAX_WORD_LENGTH {
                    return Err(ForgeError::Config(format!(
                        "short code word length range {}..={} is outside 1..={}",
                        lo, hi, MAX_WORD_LENGTH
                    )));
                }
                for scheme in rule.schemes() {
                    if scheme.prefix == 0 || scheme.prefix > self.max_length {
                        return Err(ForgeError::Config(format!(
                            "short code prefix {} must be within 1..={}",
                            scheme.prefix, self.max_length
                        )));
                    }
                    if scheme.count == Some(0) {
                        return Err(ForgeError::Config(
                            "short code count must be at least 1".into(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShortCodeConfig {
    Equal {
        length_equal: usize,
        schemes: Vec<ShortCodeScheme>,
    },
    Range {
        length_in_range: (usize, usize),
        schemes: Vec<ShortCodeScheme>,
    },
}

impl ShortCodeConfig {
    pub fn length_range(&self) -> (usize, usize) {
        match self {
            ShortCodeConfig::Equal { length_equal, .. } => (*length_equal, *length_equal),
            ShortCodeConfig::Range {
                length_in_range, ..
            } => *length_in_range,
        }
    }

    pub fn schemes(&self) -> &[ShortCodeScheme] {
        match self {
            ShortCodeConfig::Equal { schemes, .. } | ShortCodeConfig::Range { schemes, .. } => {
                schemes
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortCodeScheme {
    pub prefix: usize,
    /// How many objects may share this prefix as a short code.
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub select_keys: Option<Vec<char>>,
}

// --- Objective ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricGroup {
    CharactersFull,
    CharactersShort,
    WordsFull,
    WordsShort,
}

impl MetricGroup {
    pub fn is_characters(self) -> bool {
        matches!(self, MetricGroup::CharactersFull | MetricGroup::CharactersShort)
    }

    pub fn is_short(self) -> bool {
        matches!(self, MetricGroup::CharactersShort | MetricGroup::WordsShort)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    #[serde(default)]
    pub characters_full: Option<PartialWeights>,
    #[serde(default)]
    pub characters_short: Option<PartialWeights>,
    #[serde(default)]
    pub words_full: Option<PartialWeights>,
    #[serde(default)]
    pub words_short: Option<PartialWeights>,
    /// Physical layout used to derive fingering labels. QWERTY when absent.
    #[serde(default)]
    pub keyboard: Option<KeyboardLayout>,
}

impl ObjectiveConfig {
    pub fn group(&self, group: MetricGroup) -> Option<&PartialWeights> {
        match group {
            MetricGroup::CharactersFull => self.characters_full.as_ref(),
            MetricGroup::CharactersShort => self.characters_short.as_ref(),
            MetricGroup::WordsFull => self.words_full.as_ref(),
            MetricGroup::WordsShort => self.words_short.as_ref(),
        }
    }

    fn validate(&self, max_length: usize) -> ForgeResult<()> {
        use strum::IntoEnumIterator;
        let mut any = false;
        for group in MetricGroup::iter() {
            if let Some(weights) = self.group(group) {
                weights
                    .validate(max_length)
                    .map_err(|e| ForgeError::Config(format!("objective.{}: {}", group, e)))?;
                any = true;
            }
        }
        if !any {
            return Err(ForgeError::Config(
                "objective must configure at least one metric group".into(),
            ));
        }
        if let Some(keyboard) = &self.keyboard {
            if keyboard.left.is_empty() && keyboard.right.is_empty() {
                return Err(ForgeError::Config("keyboard layout has no rows".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialWeights {
    #[serde(default)]
    pub tiers: Option<Vec<TierWeights>>,
    #[serde(default)]
    pub duplication: Option<f64>,
    #[serde(default)]
    pub key_distribution: Option<f64>,
    #[serde(default)]
    pub pair_equivalence: Option<f64>,
    /// One optional weight per fingering label, in label order.
    #[serde(default)]
    pub fingering: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub levels: Option<Vec<LevelWeights>>,
}

impl PartialWeights {
    fn validate(&self, max_length: usize) -> Result<(), String> {
        check_weight("duplication", self.duplication)?;
        check_weight("key_distribution", self.key_distribution)?;
        check_weight("pair_equivalence", self.pair_equivalence)?;
        check_fingering(self.fingering.as_deref())?;
        check_levels(self.levels.as_deref(), max_length)?;
        if let Some(tiers) = &self.tiers {
            for tier in tiers {
                if tier.top == Some(0) {
                    return Err("tier top must be at least 1".into());
                }
                check_weight("tier duplication", tier.duplication)?;
                check_fingering(tier.fingering.as_deref())?;
                check_levels(tier.levels.as_deref(), max_length)?;
            }
        }
        Ok(())
    }
}

fn check_weight(name: &str, weight: Option<f64>) -> Result<(), String> {
    match weight {
        Some(w) if !w.is_finite() || w < 0.0 => Err(format!(
            "{} weight must be finite and non-negative, got {}",
            name, w
        )),
        _ => Ok(()),
    }
}

fn check_fingering(weights: Option<&[Option<f64>]>) -> Result<(), String> {
    if let Some(weights) = weights {
        if weights.len() > FINGERING_LABEL_COUNT {
            return Err(format!(
                "at most {} fingering weights are allowed, got {}",
                FINGERING_LABEL_COUNT,
                weights.len()
            ));
        }
        for w in weights {
            check_weight("fingering", *w)?;
        }
    }
    Ok(())
}

fn check_levels(levels: Option<&[LevelWeights]>, max_length: usize) -> Result<(), String> {
    if let Some(levels) = levels {
        for level in levels {
            // actual codes carry at most one extra select key
            if level.length == 0 || level.length > max_length + 1 {
                return Err(format!(
                    "level length {} is outside 1..={}",
                    level.length,
                    max_length + 1
                ));
            }
            check_weight("level", Some(level.frequency))?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierWeights {
    #[serde(default)]
    pub top: Option<usize>,
    #[serde(default)]
    pub duplication: Option<f64>,
    #[serde(default)]
    pub levels: Option<Vec<LevelWeights>>,
    #[serde(default)]
    pub fingering: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelWeights {
    pub length: usize,
    pub frequency: f64,
}

/// Rows listed from the number row down, each row from the inner column
/// outwards (left hand `54321`, right hand `67890-=`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardLayout {
    pub left: Vec<String>,
    pub right: Vec<String>,
}

impl Default for KeyboardLayout {
    fn default() -> Self {
        Self {
            left: ["54321", "trewq", "gfdsa", "bvcxz"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            right: ["67890-=", "yuiop[]", "hjkl;'", "nm,./"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// --- Constraints ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintsConfig {
    /// Without `keys` the selected elements are fixed, with `keys` they are
    /// narrowed to those keys.
    pub elements: Vec<AtomicConstraint>,
    pub forbidden: Vec<ForbiddenConstraint>,
    /// Pairs of element names that must never share a key.
    pub apart: Vec<[String; 2]>,
}

impl ConstraintsConfig {
    fn validate(&self) -> ForgeResult<()> {
        for c in &self.elements {
            if c.element.is_none() && c.index.is_none() {
                return Err(ForgeError::Config(
                    "an element constraint needs an element, an index, or both".into(),
                ));
            }
            if matches!(&c.keys, Some(keys) if keys.is_empty()) {
                return Err(ForgeError::Config(
                    "an element constraint may not narrow to an empty key set".into(),
                ));
            }
        }
        for pair in &self.apart {
            if pair[0] == pair[1] {
                return Err(ForgeError::Config(format!(
                    "element '{}' cannot be kept apart from itself",
                    pair[0]
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtomicConstraint {
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub keys: Option<Vec<char>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForbiddenConstraint {
    pub element: String,
    #[serde(default)]
    pub index: Option<usize>,
    pub keys: Vec<char>,
}

// --- Solver ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum SolverConfig {
    SimulatedAnnealing(AnnealingConfig),
    Genetic(GeneticConfig),
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig::SimulatedAnnealing(AnnealingConfig::default())
    }
}

impl SolverConfig {
    fn validate(&self) -> ForgeResult<()> {
        match self {
            SolverConfig::SimulatedAnnealing(c) => c.validate(),
            SolverConfig::Genetic(c) => c.validate(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoolingShape {
    #[default]
    Exponential,
    Linear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    /// Both temperatures are tuned automatically when either is absent.
    pub t_max: Option<f64>,
    pub t_min: Option<f64>,
    pub steps: usize,
    pub cooling: CoolingShape,
    /// Steps between temperature updates.
    pub update_interval: usize,
    /// Steps between progress messages.
    pub report_interval: usize,
    /// Improvements found after this fraction of the run are flagged for saving.
    pub report_after: f64,
    pub mutation: MutationWeights,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            t_max: None,
            t_min: None,
            steps: DEFAULT_ANNEALING_STEPS,
            cooling: CoolingShape::default(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            report_interval: DEFAULT_UPDATE_INTERVAL,
            report_after: DEFAULT_REPORT_AFTER,
            mutation: MutationWeights::default(),
        }
    }
}

impl AnnealingConfig {
    fn validate(&self) -> ForgeResult<()> {
        if let Some(t) = self.t_max {
            if !t.is_finite() || t <= 0.0 {
                return Err(ForgeError::Config(format!("t_max must be positive, got {}", t)));
            }
        }
        if let Some(t) = self.t_min {
            if !t.is_finite() || t <= 0.0 {
                return Err(ForgeError::Config(format!("t_min must be positive, got {}", t)));
            }
        }
        if let (Some(hi), Some(lo)) = (self.t_max, self.t_min) {
            if lo > hi {
                return Err(ForgeError::Config(format!(
                    "t_min ({}) must not exceed t_max ({})",
                    lo, hi
                )));
            }
        }
        if self.steps == 0 {
            return Err(ForgeError::Config("steps must be at least 1".into()));
        }
        if self.update_interval == 0 || self.report_interval == 0 {
            return Err(ForgeError::Config(
                "update_interval and report_interval must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.report_after) {
            return Err(ForgeError::Config(format!(
                "report_after must be within [0, 1], got {}",
                self.report_after
            )));
        }
        self.mutation.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub generations: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    /// Generations between progress messages.
    pub report_interval: usize,
    pub mutation: MutationWeights,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 32,
            generations: 200,
            crossover_rate: 0.7,
            mutation_rate: 0.3,
            report_interval: 10,
            mutation: MutationWeights::default(),
        }
    }
}

impl GeneticConfig {
    fn validate(&self) -> ForgeResult<()> {
        if self.population_size < 2 {
            return Err(ForgeError::Config(format!(
                "population_size must be at least 2, got {}",
                self.population_size
            )));
        }
        if self.generations == 0 || self.report_interval == 0 {
            return Err(ForgeError::Config(
                "generations and report_interval must be at least 1".into(),
            ));
        }
        for (name, rate) in [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ForgeError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, rate
                )));
            }
        }
        self.mutation.validate()
    }
}

/// Relative odds of each mutation kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationWeights {
    pub random_move: f64,
    pub random_swap: f64,
    pub random_full_key_swap: f64,
}

impl Default for MutationWeights {
    fn default() -> Self {
        Self {
            random_move: 0.9,
            random_swap: 0.09,
            random_full_key_swap: 0.01,
        }
    }
}

impl MutationWeights {
    fn validate(&self) -> ForgeResult<()> {
        let all = [self.random_move, self.random_swap, self.random_full_key_swap];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) || all.iter().sum::<f64>() <= 0.0 {
            return Err(ForgeError::Config(
                "mutation weights must be non-negative with a positive sum".into(),
            ));
        }
        Ok(())
    }
}

// --- Run parameters ---

#[derive(Args, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    /// Seed for a reproducible run
    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    /// Wall-clock budget in seconds
    #[arg(short = 'T', long)]
    pub time_limit: Option<u64>,

    /// Worker threads for batch scoring (0 uses every core)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}
