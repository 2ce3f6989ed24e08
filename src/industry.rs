//! Map free-text industry names to JSIC (Japan Standard Industrial
//! Classification) codes by fuzzy matching against a seed catalog.

use ahash::AHashMap;
use log::error;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::Result;

pub const DEFAULT_LIMIT: usize = 5;

const SUBSTRING_BONUS: f64 = 0.2;
const LABEL_BONUS: f64 = 0.3;

static SEED_CSV: &str = include_str!("../data/jsic_seed.csv");
static SEED: OnceLock<Catalog> = OnceLock::new();

/// Seed catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryCandidate {
    pub label: String,
    #[serde(alias = "code")]
    pub jsic_code: String,
    /// Comma-joined synonyms; may be empty.
    #[serde(default)]
    pub keywords: String,
}

/// Ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryMatch {
    pub label: String,
    pub code: String,
    /// In `[0, 1]`.
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<IndustryCandidate>,
}

impl Catalog {
    pub fn new(entries: Vec<IndustryCandidate>) -> Self {
        Self { entries }
    }

    /// CSV with `label`, `jsic_code` (or `code`), and `keywords` columns.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let entries = rdr
            .deserialize::<IndustryCandidate>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(csv::Error::from)?;
        Self::from_reader(file)
    }

    /// Bundled JSIC seed, parsed once per process.
    pub fn seed() -> &'static Catalog {
        SEED.get_or_init(|| {
            Self::from_reader(SEED_CSV.as_bytes()).unwrap_or_else(|e| {
                error!("bundled JSIC seed is unreadable: {}", e);
                Self::default()
            })
        })
    }

    pub fn entries(&self) -> &[IndustryCandidate] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Matching-block ratio `2 * M / T` over characters, where `M` counts the
/// characters in the blocks found by repeatedly taking the longest common
/// substring and recursing on both sides. Identical strings score 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: AHashMap<char, Vec<usize>> = AHashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`;
/// earliest in `a`, then earliest in `b`, on ties.
fn longest_match(
    a: &[char],
    b2j: &AHashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut besti, mut bestj, mut bestk) = (alo, blo, 0);
    // run lengths of matches ending at (i - 1, j)
    let mut j2len: AHashMap<usize, usize> = AHashMap::new();
    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: AHashMap<usize, usize> = AHashMap::new();
        for &j in b2j.get(c).map(Vec::as_slice).unwrap_or_default() {
            if j < blo {
                continue;
            }
            if j >= bhi {
                break;
            }
            let k = j
                .checked_sub(1)
                .and_then(|p| j2len.get(&p))
                .copied()
                .unwrap_or(0)
                + 1;
            next.insert(j, k);
            if k > bestk {
                besti = i + 1 - k;
                bestj = j + 1 - k;
                bestk = k;
            }
        }
        j2len = next;
    }
    (besti, bestj, bestk)
}

/// Score of a normalized (trimmed, lowercased) query against one entry.
pub fn score(query: &str, candidate: &IndustryCandidate) -> f64 {
    let label = candidate.label.trim().to_lowercase();
    if label == query {
        return 1.0;
    }
    let combined = format!("{},{}", label, candidate.keywords.trim().to_lowercase());
    let mut s = similarity(query, &combined);
    if combined.contains(query) {
        s = (s + SUBSTRING_BONUS).min(1.0);
    }
    if label.contains(query) {
        s = (s + LABEL_BONUS).min(1.0);
    }
    s
}

/// Rank `catalog` against `query`, best first; ties keep catalog order.
pub fn rank(query: &str, catalog: &[IndustryCandidate], limit: usize) -> Vec<IndustryMatch> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    let mut ranked: Vec<IndustryMatch> = catalog
        .iter()
        .map(|c| IndustryMatch {
            label: c.label.clone(),
            code: c.jsic_code.clone(),
            score: score(&query, c),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

/// [`rank`] against the bundled seed catalog.
pub fn guess_jsic(query: &str, limit: usize) -> Vec<IndustryMatch> {
    rank(query, Catalog::seed().entries(), limit)
}
