//! Ranking tables ordering candidate technology switches.
//!
//! Every switch the allocators may perform is scored ahead of time from its cost and emissions
//! impact, then coarsened into discrete rank tiers by a binning strategy. Lower rank = more
//! desirable. Ties within a tier are intentional and resolved by uniform random choice, so that
//! switches indistinguishable within the metrics' noise floor do not get a spurious ordering.
use crate::region::RegionID;
use crate::technology::{ProductID, TechnologyID};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// Placeholder origin technology for greenfield ranking entries
pub const GREENFIELD_ORIGIN: &str = "New-build";

/// Placeholder destination technology for decommission ranking entries
pub const DECOMMISSION_DESTINATION: &str = "Decommissioned";

/// The kind of switch a ranking entry describes
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum SwitchType {
    /// Retire an asset without replacement
    #[string = "decommission"]
    Decommission,
    /// Build a new asset
    #[string = "greenfield"]
    Greenfield,
    /// Switch an existing asset's technology mid-life
    #[string = "brownfield_renovation"]
    BrownfieldRenovation,
    /// Replace an asset's technology at end of life
    #[string = "brownfield_rebuild"]
    BrownfieldRebuild,
}

impl SwitchType {
    /// The ranking table this switch type is ordered by
    pub fn rank_type(self) -> RankType {
        match self {
            SwitchType::Decommission => RankType::Decommission,
            SwitchType::Greenfield => RankType::Greenfield,
            SwitchType::BrownfieldRenovation | SwitchType::BrownfieldRebuild => {
                RankType::Brownfield
            }
        }
    }
}

/// Key distinguishing the three ranking tables kept per year
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum RankType {
    /// Ranking of decommission candidates
    #[string = "decommission"]
    Decommission,
    /// Ranking of greenfield builds
    #[string = "greenfield"]
    Greenfield,
    /// Ranking of brownfield switches (renovation and rebuild share a table)
    #[string = "brownfield"]
    Brownfield,
}

/// One candidate switch with its precomputed rank.
#[derive(Clone, Debug, PartialEq)]
pub struct RankingEntry {
    /// The product the switch applies to
    pub product: ProductID,
    /// The region the switch applies to
    pub region: RegionID,
    /// Technology switched away from
    pub origin: TechnologyID,
    /// Technology switched to
    pub destination: TechnologyID,
    /// The kind of switch
    pub switch_type: SwitchType,
    /// The year the switch is ranked for
    pub year: u32,
    /// Rank tier; lower = better
    pub rank: u32,
    /// Cost metric the rank was derived from (e.g. levelised cost of product)
    pub cost: f64,
    /// Change in emissions intensity caused by the switch (negative = abating)
    pub emissions_delta: f64,
}

/// The ranking table consulted by one allocator in one year.
///
/// Allocators prune entries as candidates turn out to be infeasible; an empty table terminates
/// the allocator's loop.
#[derive(Clone, Debug, Default)]
pub struct RankingTable {
    entries: Vec<RankingEntry>,
}

impl RankingTable {
    /// Create a table from pre-ranked entries
    pub fn new(entries: Vec<RankingEntry>) -> Self {
        Self { entries }
    }

    /// Whether the table has no entries left
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries left in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over the remaining entries
    pub fn iter(&self) -> impl Iterator<Item = &RankingEntry> {
        self.entries.iter()
    }

    /// Select the best-ranked entry among those matching `filter`.
    ///
    /// Entries tied on rank are chosen among uniformly at random. Returns `None` if no entry
    /// matches.
    pub fn select_best<R: Rng>(
        &self,
        rng: &mut R,
        filter: impl Fn(&RankingEntry) -> bool,
    ) -> Option<RankingEntry> {
        let best_rank = self
            .entries
            .iter()
            .filter(|entry| filter(entry))
            .map(|entry| entry.rank)
            .min()?;
        let ties: Vec<&RankingEntry> = self
            .entries
            .iter()
            .filter(|entry| filter(entry) && entry.rank == best_rank)
            .collect();
        ties.choose(rng).map(|entry| (*entry).clone())
    }

    /// Remove the first entry equal to `entry`, if present
    pub fn remove_entry(&mut self, entry: &RankingEntry) {
        if let Some(position) = self.entries.iter().position(|e| e == entry) {
            self.entries.remove(position);
        }
    }

    /// Remove every entry switching *to* the given technology, optionally scoped to one region.
    ///
    /// Entries where origin equals destination are kept: staying put remains allowed even when
    /// the destination technology is capped out.
    pub fn remove_all_with_destination(
        &mut self,
        technology: &TechnologyID,
        region: Option<&RegionID>,
    ) {
        self.entries.retain(|entry| {
            entry.destination != *technology
                || entry.origin == entry.destination
                || region.is_some_and(|r| entry.region != *r)
        });
    }
}

/// How continuous switch scores are coarsened into rank tiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, DeserializeLabeledStringEnum, SerializeLabeledStringEnum)]
pub enum BinningStrategy {
    /// Fixed number of equal-width bins over the blended score
    #[string = "histogram"]
    Histogram,
    /// Bin width set by the cost metric's assumed relative uncertainty
    #[string = "uncertainty"]
    Uncertainty,
}

/// Weights blending normalised cost and emissions delta into one score
#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)]
pub struct RankWeights {
    /// Weight on the normalised cost metric
    pub cost: f64,
    /// Weight on the normalised emissions delta
    pub emissions: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            cost: 1.0,
            emissions: 0.0,
        }
    }
}

/// Parameters controlling rank assignment
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct RankingParams {
    /// The binning strategy to use
    pub strategy: BinningStrategy,
    /// Number of bins for histogram binning
    pub bin_count: usize,
    /// Relative uncertainty of the cost metric, for uncertainty binning
    pub cost_uncertainty: f64,
    /// Blend weights for histogram binning
    pub weights: RankWeights,
    /// Divide cost by the emissions delta before ranking, rewarding cost per tonne abated
    pub rank_by_abatement: bool,
}

impl Default for RankingParams {
    fn default() -> Self {
        Self {
            strategy: BinningStrategy::Histogram,
            bin_count: 50,
            cost_uncertainty: 0.05,
            weights: RankWeights::default(),
            rank_by_abatement: false,
        }
    }
}

/// Assign rank tiers to one group of entries sharing a grouping key (product, year and table).
///
/// Mutates the `rank` field in place. A group whose score range collapses gets rank 1
/// throughout.
pub fn assign_ranks(entries: &mut [RankingEntry], params: &RankingParams) {
    if entries.is_empty() {
        return;
    }
    let metrics: Vec<f64> = entries
        .iter()
        .map(|entry| cost_metric(entry, params))
        .collect();

    let raw_bins = match params.strategy {
        BinningStrategy::Histogram => histogram_bins(entries, &metrics, params),
        BinningStrategy::Uncertainty => uncertainty_bins(&metrics, params),
    };

    // Densify so rank tiers are consecutive starting at 1
    let mut distinct: Vec<usize> = raw_bins.clone();
    distinct.sort_unstable();
    distinct.dedup();
    for (entry, raw) in entries.iter_mut().zip(&raw_bins) {
        let dense = distinct.binary_search(raw).unwrap_or_else(|i| i);
        entry.rank = u32::try_from(dense + 1).unwrap_or(u32::MAX);
    }
}

fn cost_metric(entry: &RankingEntry, params: &RankingParams) -> f64 {
    if params.rank_by_abatement && entry.emissions_delta != 0.0 {
        entry.cost / entry.emissions_delta.abs()
    } else {
        entry.cost
    }
}

/// Min-max normalisation with a neutral fallback when the range collapses
fn normalise(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range == 0.0 {
        0.0
    } else {
        (value - min) / range
    }
}

fn histogram_bins(entries: &[RankingEntry], metrics: &[f64], params: &RankingParams) -> Vec<usize> {
    let (cost_min, cost_max) = min_max(metrics);
    let deltas: Vec<f64> = entries.iter().map(|entry| entry.emissions_delta).collect();
    let (delta_min, delta_max) = min_max(&deltas);

    let scores: Vec<f64> = metrics
        .iter()
        .zip(&deltas)
        .map(|(&cost, &delta)| {
            params.weights.cost * normalise(cost, cost_min, cost_max)
                + params.weights.emissions * normalise(delta, delta_min, delta_max)
        })
        .collect();

    let (score_min, score_max) = min_max(&scores);
    let range = score_max - score_min;
    if range == 0.0 || params.bin_count == 0 {
        return vec![0; scores.len()];
    }
    let width = range / params.bin_count as f64;
    scores
        .iter()
        .map(|&score| {
            let bin = ((score - score_min) / width) as usize;
            bin.min(params.bin_count - 1)
        })
        .collect()
}

fn uncertainty_bins(metrics: &[f64], params: &RankingParams) -> Vec<usize> {
    let mean_abs = metrics.iter().map(|m| m.abs()).sum::<f64>() / metrics.len() as f64;
    let width = params.cost_uncertainty * mean_abs;
    let (min, _) = min_max(metrics);
    if width <= 0.0 {
        // No noise floor: every distinct metric value is its own tier
        let mut sorted: Vec<f64> = metrics.to_vec();
        sorted.sort_unstable_by(f64::total_cmp);
        sorted.dedup();
        return metrics
            .iter()
            .map(|m| sorted.iter().position(|s| s == m).unwrap_or(0))
            .collect();
    }
    metrics.iter().map(|&m| ((m - min) / width) as usize).collect()
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}
