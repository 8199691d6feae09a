use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::corpus::{Assets, Corpus};
use crate::error::ForgeResult;

/// Stable fingerprint of everything that defines a search landscape, so
/// results from different runs can be told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentifier {
    pub hash: String,
}

impl RunIdentifier {
    pub fn from_parts(config: &Config, corpus: &Corpus, assets: &Assets) -> ForgeResult<Self> {
        let mut hasher = Sha256::new();

        // Form, encoder, objective, constraints and solver
        hasher.update(serde_json::to_string(config)?.as_bytes());

        // Corpus in input order, so reordering ties changes nothing
        let mut objects: Vec<_> = corpus.objects.iter().collect();
        objects.sort_by_key(|o| o.original_order);
        for o in objects {
            hasher.update(o.name.as_bytes());
            for e in &o.sequence {
                hasher.update(e.to_le_bytes());
            }
            hasher.update(o.frequency.to_le_bytes());
            hasher.update(o.level.map_or(0, |l| l + 1).to_le_bytes());
        }

        hasher.update(serde_json::to_string(assets)?.as_bytes());

        Ok(Self {
            hash: hex::encode(hasher.finalize()),
        })
    }

    pub fn short(&self) -> &str {
        &self.hash[..self.hash.len().min(12)]
    }
}
