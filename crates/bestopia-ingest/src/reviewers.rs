//! Reviewer identity assignment from two fixed, injected id pools.

use std::path::Path;

use anyhow::Context;
use bestopia_core::GenderPreference;
use rand::Rng;
use serde::Deserialize;

/// The two disjoint reviewer identity pools. Injected into the pipeline so
/// tests can substitute deterministic pools; the defaults match the seeded
/// reviewer rows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReviewerPools {
    pub women: Vec<i64>,
    pub men: Vec<i64>,
}

impl Default for ReviewerPools {
    fn default() -> Self {
        Self {
            women: vec![1, 2, 3, 4, 5, 6],
            men: vec![7, 8, 9, 10],
        }
    }
}

impl ReviewerPools {
    /// Load pools from a YAML file with `women:` and `men:` id lists.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let pools: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        anyhow::ensure!(
            !pools.women.is_empty() && !pools.men.is_empty(),
            "reviewer pools must not be empty"
        );
        Ok(pools)
    }

    /// Pick a reviewer id uniformly from the pool the preference selects,
    /// or from the union of both pools for `All`. Pools are validated
    /// non-empty at load time.
    pub fn assign<R: Rng>(&self, preference: GenderPreference, rng: &mut R) -> i64 {
        match preference {
            GenderPreference::Woman => pick(&self.women, rng),
            GenderPreference::Man => pick(&self.men, rng),
            GenderPreference::All => {
                let idx = rng.gen_range(0..self.women.len() + self.men.len());
                if idx < self.women.len() {
                    self.women[idx]
                } else {
                    self.men[idx - self.women.len()]
                }
            }
        }
    }
}

fn pick<R: Rng>(pool: &[i64], rng: &mut R) -> i64 {
    pool[rng.gen_range(0..pool.len())]
}
