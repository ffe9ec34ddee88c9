//! Hitters and rosters.
//!
//! A `Hitter` is an immutable record of season counting stats. Rates derived
//! from those counts are not validated here: a hitter with zero at-bats can be
//! constructed and only fails when an evaluation tries to sample from it.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Separator used when joining player names into a lineup identifier.
pub const LINEUP_DELIMITER: &str = " | ";

/// A single hitter's season line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hitter {
    /// Display name. Unique within a roster.
    pub name: String,
    /// Total plate appearances (denominator for walk and hit-by-pitch rates).
    pub plate_appearances: u32,
    /// Official at-bats (denominator for hit-type rates).
    pub at_bats: u32,
    /// All hits, including extra-base hits.
    pub hits: u32,
    /// Two-base hits.
    pub doubles: u32,
    /// Three-base hits.
    pub triples: u32,
    /// Home runs.
    pub home_runs: u32,
    /// Bases on balls.
    pub walks: u32,
    /// Times hit by a pitch.
    pub hit_by_pitch: u32,
    /// Probability of taking an extra base as a runner on a hit.
    pub pace: f64,
}

impl Hitter {
    /// Start building a hitter with all counts zeroed.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> HitterBuilder {
        HitterBuilder::new(name)
    }
}

impl fmt::Display for Hitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Fluent builder for `Hitter`.
#[derive(Debug, Clone)]
pub struct HitterBuilder {
    hitter: Hitter,
}

impl HitterBuilder {
    /// Create a builder for the named hitter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            hitter: Hitter {
                name: name.into(),
                plate_appearances: 0,
                at_bats: 0,
                hits: 0,
                doubles: 0,
                triples: 0,
                home_runs: 0,
                walks: 0,
                hit_by_pitch: 0,
                pace: 0.0,
            },
        }
    }

    #[must_use]
    pub fn plate_appearances(mut self, n: u32) -> Self {
        self.hitter.plate_appearances = n;
        self
    }

    #[must_use]
    pub fn at_bats(mut self, n: u32) -> Self {
        self.hitter.at_bats = n;
        self
    }

    #[must_use]
    pub fn hits(mut self, n: u32) -> Self {
        self.hitter.hits = n;
        self
    }

    #[must_use]
    pub fn doubles(mut self, n: u32) -> Self {
        self.hitter.doubles = n;
        self
    }

    #[must_use]
    pub fn triples(mut self, n: u32) -> Self {
        self.hitter.triples = n;
        self
    }

    #[must_use]
    pub fn home_runs(mut self, n: u32) -> Self {
        self.hitter.home_runs = n;
        self
    }

    #[must_use]
    pub fn walks(mut self, n: u32) -> Self {
        self.hitter.walks = n;
        self
    }

    #[must_use]
    pub fn hit_by_pitch(mut self, n: u32) -> Self {
        self.hitter.hit_by_pitch = n;
        self
    }

    #[must_use]
    pub fn pace(mut self, pace: f64) -> Self {
        self.hitter.pace = pace;
        self
    }

    /// Finish the hitter. Rate validity is checked at evaluation time.
    #[must_use]
    pub fn build(self) -> Hitter {
        self.hitter
    }
}

/// An ordered, shared, read-only collection of hitters.
///
/// Cloning is cheap; all clones share the same hitter storage.
#[derive(Debug, Clone)]
pub struct Roster {
    hitters: Arc<[Hitter]>,
}

impl Roster {
    /// Create a roster, rejecting empty input and duplicate names.
    pub fn new(hitters: Vec<Hitter>) -> Result<Self, ConfigurationError> {
        if hitters.is_empty() {
            return Err(ConfigurationError::EmptyRoster);
        }

        let mut seen = HashSet::with_capacity(hitters.len());
        for h in &hitters {
            if !seen.insert(h.name.as_str()) {
                return Err(ConfigurationError::DuplicateHitter {
                    name: h.name.clone(),
                });
            }
        }

        Ok(Self {
            hitters: hitters.into(),
        })
    }

    /// Parse a roster from a JSON array of hitter records.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let hitters: Vec<Hitter> =
            serde_json::from_str(json).map_err(|e| ConfigurationError::Parse {
                message: format!("roster: {e}"),
            })?;
        Self::new(hitters)
    }

    /// Load a roster from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Parse {
            message: format!("failed to read roster {}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }

    /// The 2021 nine-man sample roster bundled with the crate.
    pub fn sample_2021() -> Result<Self, ConfigurationError> {
        Self::from_json_str(include_str!("../data/roster_2021.json"))
    }

    /// Number of hitters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hitters.len()
    }

    /// Always false for a constructed roster; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hitters.is_empty()
    }

    /// Hitter at roster position `idx`.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Hitter> {
        self.hitters.get(idx)
    }

    /// All hitters in roster order.
    #[must_use]
    pub fn hitters(&self) -> &[Hitter] {
        &self.hitters
    }

    /// Resolve a batting order given as roster indices.
    ///
    /// Returns `None` if any index is out of range.
    #[must_use]
    pub fn order<'a>(&'a self, indices: &[usize]) -> Option<Vec<&'a Hitter>> {
        indices.iter().map(|&i| self.hitters.get(i)).collect()
    }

    /// Delimiter-joined player names for a batting order.
    #[must_use]
    pub fn lineup_id(&self, indices: &[usize]) -> String {
        indices
            .iter()
            .map(|&i| self.hitters.get(i).map_or("?", |h| h.name.as_str()))
            .collect::<Vec<_>>()
            .join(LINEUP_DELIMITER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hitter(name: &str) -> Hitter {
        Hitter::builder(name)
            .plate_appearances(100)
            .at_bats(90)
            .hits(25)
            .build()
    }

    #[test]
    fn builder_sets_fields() {
        let h = Hitter::builder("Ward")
            .plate_appearances(375)
            .at_bats(324)
            .hits(81)
            .doubles(19)
            .home_runs(8)
            .walks(38)
            .hit_by_pitch(7)
            .pace(0.4)
            .build();
        assert_eq!(h.name, "Ward");
        assert_eq!(h.at_bats, 324);
        assert_eq!(h.triples, 0);
        assert!((h.pace - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn roster_rejects_empty() {
        assert_eq!(Roster::new(Vec::new()).unwrap_err(), ConfigurationError::EmptyRoster);
    }

    #[test]
    fn roster_rejects_duplicate_names() {
        let err = Roster::new(vec![hitter("A"), hitter("B"), hitter("A")]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateHitter {
                name: "A".to_string()
            }
        );
    }

    #[test]
    fn lineup_id_joins_names_in_order() {
        let roster = Roster::new(vec![hitter("A"), hitter("B"), hitter("C")]).unwrap();
        assert_eq!(roster.lineup_id(&[2, 0, 1]), "C | A | B");
    }

    #[test]
    fn order_rejects_out_of_range_index() {
        let roster = Roster::new(vec![hitter("A"), hitter("B")]).unwrap();
        assert!(roster.order(&[0, 1]).is_some());
        assert!(roster.order(&[0, 2]).is_none());
    }

    #[test]
    fn sample_roster_parses() {
        let roster = Roster::sample_2021().unwrap();
        assert_eq!(roster.len(), 9);
        assert_eq!(roster.hitters()[0].name, "Ohtani Shohei");
        assert_eq!(roster.hitters()[1].home_runs, 40);
    }

    #[test]
    fn from_json_reports_parse_errors() {
        let err = Roster::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { .. }));
    }
}
