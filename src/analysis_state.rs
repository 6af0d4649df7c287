use crate::particles::{self, DataPoint, Particle, PulseRing};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DENSITY_BUCKETS: usize = 100;

/// Service-assigned sequence identifier. Kept as raw JSON so numeric and
/// string ids are echoed back unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub serde_json::Value);

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(s) => write!(f, "{s}"),
            other => write!(f, "{other}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadedSequence {
    pub id: SequenceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub length: usize,
    #[serde(default)]
    pub gc_content: Option<f64>,
}

impl UploadedSequence {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Sequence"
        } else {
            &self.name
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub position: usize,
    #[serde(default)]
    pub context_before: String,
    #[serde(default)]
    pub context_after: String,
}

/// The outcome of one search, applied to the state in a single step.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchApplied {
    pub pattern: String,
    pub matches: Vec<SearchResult>,
    pub algorithm: String,
    pub search_time_ms: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct AnalysisState {
    pub sequence_length: usize,
    pub gc_content: f64,
    pub matches: Vec<SearchResult>,
    pub pattern: Option<String>,
    pub algorithm: Option<String>,
    pub search_time_ms: Option<f64>,
    pub is_searching: bool,
    pub particles: Vec<Particle>,
    pub pulse_rings: Vec<PulseRing>,
    pub data_points: Vec<DataPoint>,
}

impl AnalysisState {
    pub fn has_sequence(&self) -> bool {
        self.sequence_length > 0
    }

    pub fn burst_particle_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_burst()).count()
    }

    /// Seeds sequence statistics; results from a previous sequence no longer apply.
    pub fn apply_upload(&mut self, sequence: &UploadedSequence) {
        self.sequence_length = sequence.length;
        self.gc_content = sequence.gc_content.unwrap_or(0.0);
        self.matches.clear();
        self.pattern = None;
        self.algorithm = None;
        self.search_time_ms = None;
        self.data_points.clear();
    }

    pub fn apply_search(&mut self, applied: SearchApplied) {
        self.is_searching = false;
        self.pattern = Some(applied.pattern);
        self.matches = applied.matches;
        self.algorithm = Some(applied.algorithm);
        self.search_time_ms = applied.search_time_ms;
        self.data_points = if !self.matches.is_empty() && self.sequence_length > 0 {
            particles::density_points(&self.density())
        } else {
            vec![]
        };
    }

    pub fn density(&self) -> Vec<usize> {
        density_buckets(&self.matches, self.sequence_length)
    }
}

/// Histogram of match positions over `DENSITY_BUCKETS` equal-width bins.
/// Bucket index is `floor(position / sequence_length * 100)`; positions
/// outside the sequence are ignored.
pub fn density_buckets(matches: &[SearchResult], sequence_length: usize) -> Vec<usize> {
    let mut buckets = vec![0; DENSITY_BUCKETS];
    if sequence_length == 0 {
        return buckets;
    }
    for m in matches {
        let bucket = m.position as u128 * DENSITY_BUCKETS as u128 / sequence_length as u128;
        if let Some(slot) = buckets.get_mut(bucket as usize) {
            *slot += 1;
        }
    }
    buckets
}

pub fn max_density(buckets: &[usize]) -> usize {
    buckets.iter().copied().max().unwrap_or(0)
}
