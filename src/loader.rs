use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::corpus::{Assets, DistributionLoss, RawCodable};
use crate::error::{ForgeError, ForgeResult};

fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader)
}

fn field<'a>(record: &'a csv::StringRecord, column: usize, row: usize) -> ForgeResult<&'a str> {
    record
        .get(column)
        .map(str::trim)
        .ok_or_else(|| ForgeError::Validation(format!("row {}: missing column {}", row, column + 1)))
}

fn parse_number<T: std::str::FromStr>(s: &str, what: &str, row: usize) -> ForgeResult<T> {
    s.parse::<T>()
        .map_err(|_| ForgeError::Validation(format!("row {}: invalid {} '{}'", row, what, s)))
}

fn optional_text(record: &csv::StringRecord, column: usize) -> Option<String> {
    record
        .get(column)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Rows of `name, sequence, frequency[, level[, reading[, tag]]]`.
pub fn load_codables<P: AsRef<Path>>(path: P) -> ForgeResult<Vec<RawCodable>> {
    let file = File::open(path)?;
    load_codables_from_reader(file)
}

pub fn load_codables_from_reader<R: Read>(reader: R) -> ForgeResult<Vec<RawCodable>> {
    let mut rdr = tsv_reader(reader);
    let mut out = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row = i + 1;
        let level = match record.get(3).map(str::trim) {
            Some(s) if !s.is_empty() => Some(parse_number::<usize>(s, "level", row)?),
            _ => None,
        };
        out.push(RawCodable {
            name: field(&record, 0, row)?.to_string(),
            sequence: field(&record, 1, row)?.to_string(),
            frequency: parse_number(field(&record, 2, row)?, "frequency", row)?,
            level,
            reading: optional_text(&record, 4),
            tag: optional_text(&record, 5),
        });
    }
    debug!("Loaded {} codable objects", out.len());
    Ok(out)
}

/// Rows of `key, ideal percent, below-ideal penalty, above-ideal penalty`.
pub fn load_key_distribution<P: AsRef<Path>>(path: P) -> ForgeResult<BTreeMap<char, DistributionLoss>> {
    let file = File::open(path)?;
    load_key_distribution_from_reader(file)
}

pub fn load_key_distribution_from_reader<R: Read>(
    reader: R,
) -> ForgeResult<BTreeMap<char, DistributionLoss>> {
    let mut rdr = tsv_reader(reader);
    let mut out = BTreeMap::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row = i + 1;
        let key_text = field(&record, 0, row)?;
        let mut chars = key_text.chars();
        let key = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(ForgeError::Validation(format!(
                    "row {}: '{}' is not a single key",
                    row, key_text
                )))
            }
        };
        let loss = DistributionLoss {
            ideal: parse_number(field(&record, 1, row)?, "ideal", row)?,
            lt_penalty: parse_number(field(&record, 2, row)?, "penalty", row)?,
            gt_penalty: parse_number(field(&record, 3, row)?, "penalty", row)?,
        };
        if ![loss.ideal, loss.lt_penalty, loss.gt_penalty]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
        {
            return Err(ForgeError::Validation(format!(
                "row {}: distribution values must be finite and non-negative",
                row
            )));
        }
        out.insert(key, loss);
    }
    Ok(out)
}

/// Rows of `key n-gram, equivalence`.
pub fn load_pair_equivalence<P: AsRef<Path>>(path: P) -> ForgeResult<BTreeMap<String, f64>> {
    let file = File::open(path)?;
    load_pair_equivalence_from_reader(file)
}

pub fn load_pair_equivalence_from_reader<R: Read>(reader: R) -> ForgeResult<BTreeMap<String, f64>> {
    let mut rdr = tsv_reader(reader);
    let mut out = BTreeMap::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row = i + 1;
        let gram = field(&record, 0, row)?.to_string();
        let value: f64 = parse_number(field(&record, 1, row)?, "equivalence", row)?;
        if !value.is_finite() {
            return Err(ForgeError::Validation(format!(
                "row {}: equivalence of '{}' is not finite",
                row, gram
            )));
        }
        out.insert(gram, value);
    }
    Ok(out)
}

pub fn load_assets(
    key_distribution: Option<&Path>,
    pair_equivalence: Option<&Path>,
) -> ForgeResult<Assets> {
    Ok(Assets {
        key_distribution: match key_distribution {
            Some(p) => load_key_distribution(p)?,
            None => BTreeMap::new(),
        },
        pair_equivalence: match pair_equivalence {
            Some(p) => load_pair_equivalence(p)?,
            None => BTreeMap::new(),
        },
    })
}
