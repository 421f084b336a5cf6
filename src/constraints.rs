//! Feasibility constraints evaluated against tentative asset stacks.
//!
//! Allocators apply a candidate switch to a cloned stack and run the enabled constraints over
//! it before committing. All checks are read-only; the caller decides how to react to a failure
//! (prune one ranking entry, prune a destination technology, or abandon the switch).
use crate::asset::{AssetFilter, AssetStack};
use crate::carbon_budget::CarbonBudget;
use crate::demand::DemandMap;
use crate::emissions::EmissionFactorMap;
use crate::ranking::RankType;
use crate::rampup::RampUpMap;
use crate::region::{RegionAliasMap, RegionID};
use crate::technology::{ProductID, TechnologyClassification, TechnologyID};
use crate::units::{Capacity, Dimensionless, Emissions};
use anyhow::Result;
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The named constraints a scenario can enable
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum ConstraintKind {
    /// Stack emissions within the carbon budget's annual limit
    #[string = "emissions"]
    Emissions,
    /// Asset additions per technology within the ramp-up cap
    #[string = "ramp_up"]
    RampUp,
    /// Regional production above the configured share of regional demand
    #[string = "regional_production"]
    RegionalProduction,
    /// Production of specified technologies below a share of global demand
    #[string = "demand_share"]
    DemandShare,
    /// Captured CO2 within storage capacity
    #[string = "co2_storage"]
    Co2Storage,
    /// Electrolysis capacity additions within the annual cap
    #[string = "electrolysis_capacity"]
    ElectrolysisCapacity,
}

/// Pass/fail outcome per evaluated constraint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintResults {
    outcomes: IndexMap<ConstraintKind, bool>,
}

impl ConstraintResults {
    /// Record the outcome of one constraint
    pub fn record(&mut self, kind: ConstraintKind, pass: bool) {
        self.outcomes.insert(kind, pass);
    }

    /// Whether every evaluated constraint passed
    pub fn all_pass(&self) -> bool {
        self.outcomes.values().all(|&pass| pass)
    }

    /// The constraints that failed, in evaluation order
    pub fn failed(&self) -> impl Iterator<Item = ConstraintKind> + '_ {
        self.outcomes
            .iter()
            .filter(|&(_, &pass)| !pass)
            .map(|(&kind, _)| kind)
    }

    /// The outcome of one constraint, if it was evaluated
    pub fn get(&self, kind: ConstraintKind) -> Option<bool> {
        self.outcomes.get(&kind).copied()
    }
}

/// Minimum regional production as a share of regional demand
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct RegionalProductionParams {
    /// Share applied to regions without an override
    pub default_share: f64,
    /// Per-region overrides
    #[serde(default)]
    pub overrides: IndexMap<RegionID, f64>,
}

impl RegionalProductionParams {
    /// The minimum production share for the given region
    pub fn share(&self, region: &RegionID) -> Dimensionless {
        Dimensionless(*self.overrides.get(region).unwrap_or(&self.default_share))
    }
}

/// Cap on specified technologies' production as a share of global demand
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct DemandShareParams {
    /// The technologies the cap applies to
    pub technologies: Vec<TechnologyID>,
    /// Maximum share of global demand
    pub max_share: f64,
}

/// Whether CO2 storage capacity bounds annual or cumulative captured volumes
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum StorageMode {
    /// Capacity bounds the running total of captured CO2
    #[string = "cumulative"]
    Cumulative,
    /// Capacity bounds each year's captured CO2 on its own
    #[string = "incremental"]
    Incremental,
}

/// Whether CO2 storage is checked as one global pool or region by region
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum StorageScope {
    /// One global capacity pool
    #[string = "global"]
    Global,
    /// A capacity pool per region
    #[string = "regional"]
    Regional,
}

/// CO2 storage constraint parameters
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Co2StorageParams {
    /// Annual or cumulative accounting
    pub mode: StorageMode,
    /// Global or per-region capacity pools
    pub scope: StorageScope,
}

/// Available CO2 storage capacity by region and year.
///
/// Global capacities are stored under the "Global" pseudo-region. A missing row means the pool
/// is unconstrained that year.
pub type Co2StorageMap = IndexMap<(RegionID, u32), Emissions>;

/// Electrolysis capacity addition constraint parameters
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct ElectrolysisParams {
    /// The electrolysis-based technologies
    pub technologies: Vec<TechnologyID>,
    /// Electrolyser capacity implied by one standard asset (GW)
    pub capacity_per_asset: f64,
    /// Maximum capacity addition per year (GW)
    pub max_annual_addition: f64,
}

/// Everything the constraint checker reads, borrowed from the orchestrator for one check.
pub struct ConstraintContext<'a> {
    /// The year the tentative stack is planned for
    pub year: u32,
    /// The committed stack the tentative one was derived from
    pub old_stack: &'a AssetStack,
    /// Demand volumes
    pub demand: &'a DemandMap,
    /// Emission factors
    pub emission_factors: &'a EmissionFactorMap,
    /// The annual emissions limit curve
    pub carbon_budget: &'a CarbonBudget,
    /// Ramp-up caps per technology
    pub rampups: &'a RampUpMap,
    /// Region aliases for folding subregional production
    pub region_aliases: &'a RegionAliasMap,
    /// The constraints enabled for the scenario
    pub enabled: &'a [ConstraintKind],
    /// Regional production minimums
    pub regional_production: Option<&'a RegionalProductionParams>,
    /// Demand share cap
    pub demand_share: Option<&'a DemandShareParams>,
    /// CO2 storage parameters
    pub co2_storage: Option<&'a Co2StorageParams>,
    /// CO2 storage capacities
    pub co2_storage_capacity: &'a Co2StorageMap,
    /// CO2 captured in previous years, for cumulative storage accounting
    pub cumulative_captured: Emissions,
    /// Electrolysis capacity parameters
    pub electrolysis: Option<&'a ElectrolysisParams>,
    /// Year from which greenfield emissions checks switch to residual mode
    pub residual_cutover_year: Option<u32>,
}

impl ConstraintContext<'_> {
    /// Evaluate every enabled constraint against the tentative stack.
    ///
    /// `rank_type` identifies the allocator asking; greenfield checks use the residual
    /// emissions mode after the configured cutover year.
    pub fn check(
        &self,
        tentative: &AssetStack,
        product: &ProductID,
        rank_type: RankType,
    ) -> Result<ConstraintResults> {
        let mut results = ConstraintResults::default();
        for &kind in self.enabled {
            let pass = match kind {
                ConstraintKind::Emissions => self.check_emissions(tentative, rank_type)?,
                ConstraintKind::RampUp => self.check_rampup(tentative),
                ConstraintKind::RegionalProduction => {
                    self.check_regional_production(tentative, product)?
                }
                ConstraintKind::DemandShare => self.check_demand_share(tentative, product)?,
                ConstraintKind::Co2Storage => self.check_co2_storage(tentative),
                ConstraintKind::ElectrolysisCapacity => self.check_electrolysis(tentative),
            };
            results.record(kind, pass);
        }
        Ok(results)
    }

    /// Scope 1 and 2 emissions within the annual limit.
    ///
    /// After the cutover year, greenfield checks compare only end-state assets' emissions
    /// against the final year's residual limit.
    fn check_emissions(&self, tentative: &AssetStack, rank_type: RankType) -> Result<bool> {
        let residual_mode = rank_type == RankType::Greenfield
            && self.residual_cutover_year.is_some_and(|c| self.year >= c);
        let (emissions, limit) = if residual_mode {
            let emissions = tentative.calculate_emissions(
                self.year,
                self.emission_factors,
                Some(TechnologyClassification::EndState),
                None,
            );
            (emissions, self.carbon_budget.final_limit())
        } else {
            let emissions =
                tentative.calculate_emissions(self.year, self.emission_factors, None, None);
            (emissions, self.carbon_budget.annual_limit(self.year)?)
        };
        Ok(emissions.co2_scope1_and_2() <= limit)
    }

    /// Asset additions per technology within the ramp-up cap
    fn check_rampup(&self, tentative: &AssetStack) -> bool {
        let new_counts = tentative.technology_asset_counts();
        let old_counts = self.old_stack.technology_asset_counts();
        for (technology, curve) in self.rampups {
            let Some(cap) = curve.cap(self.year) else {
                continue;
            };
            let new = new_counts.get(technology).copied().unwrap_or(0);
            let old = old_counts.get(technology).copied().unwrap_or(0);
            if new.saturating_sub(old) > cap as usize {
                return false;
            }
        }
        true
    }

    /// Production per region at least the configured share of regional demand
    fn check_regional_production(
        &self,
        tentative: &AssetStack,
        product: &ProductID,
    ) -> Result<bool> {
        let Some(params) = self.regional_production else {
            return Ok(true);
        };
        let volumes = tentative.get_regional_production_volume(product, self.region_aliases);
        for (region, demand) in self.demand.get_regional(product, self.year) {
            let required = params.share(&region) * demand;
            let produced = volumes.get(&region).copied().unwrap_or_default();
            if produced < required {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Specified technologies' production at most the configured share of global demand
    fn check_demand_share(&self, tentative: &AssetStack, product: &ProductID) -> Result<bool> {
        let Some(params) = self.demand_share else {
            return Ok(true);
        };
        let global_demand = self.demand.get(product, self.year, None)?;
        let produced: crate::units::Volume = params
            .technologies
            .iter()
            .map(|technology| {
                tentative.get_annual_production_volume(
                    &AssetFilter::product(product).with_technology(technology),
                )
            })
            .sum();
        Ok(produced <= Dimensionless(params.max_share) * global_demand)
    }

    /// Captured CO2 within the available storage capacity
    fn check_co2_storage(&self, tentative: &AssetStack) -> bool {
        let Some(params) = self.co2_storage else {
            return true;
        };
        match params.scope {
            StorageScope::Global => {
                let captured =
                    tentative.calculate_co2_captured(self.year, self.emission_factors, None);
                self.storage_ok(&crate::demand::GLOBAL_REGION.into(), captured)
            }
            StorageScope::Regional => {
                let regions: indexmap::IndexSet<RegionID> =
                    tentative.iter().map(|asset| asset.region.clone()).collect();
                regions.iter().all(|region| {
                    let captured = tentative.calculate_co2_captured(
                        self.year,
                        self.emission_factors,
                        Some(region),
                    );
                    self.storage_ok(region, captured)
                })
            }
        }
    }

    fn storage_ok(&self, region: &RegionID, captured: Emissions) -> bool {
        let Some(capacity) = self
            .co2_storage_capacity
            .get(&(region.clone(), self.year))
            .copied()
        else {
            // No capacity row: the pool is unconstrained
            return true;
        };
        let total = match self.co2_storage.map(|p| p.mode) {
            Some(StorageMode::Cumulative) => self.cumulative_captured + captured,
            _ => captured,
        };
        total <= capacity
    }

    /// Electrolysis capacity additions within the annual cap
    fn check_electrolysis(&self, tentative: &AssetStack) -> bool {
        let Some(params) = self.electrolysis else {
            return true;
        };
        let count = |stack: &AssetStack| -> usize {
            params
                .technologies
                .iter()
                .map(|technology| {
                    stack.get_number_of_assets(&AssetFilter {
                        technology: Some(technology.clone()),
                        ..AssetFilter::default()
                    })
                })
                .sum()
        };
        let added = count(tentative).saturating_sub(count(self.old_stack));
        let addition = Capacity(added as f64 * params.capacity_per_asset);
        addition <= Capacity(params.max_annual_addition)
    }
}
