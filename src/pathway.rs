//! The pathway holds all simulation state: per-year stacks, rankings, input tables and the
//! transition log.
//!
//! Allocators borrow its fields directly (the random source mutably, the tables immutably), so
//! the fields are crate-visible rather than wrapped in accessors.
use crate::asset::AssetStack;
use crate::carbon_budget::CarbonBudget;
use crate::config::ScenarioConfig;
use crate::constraints::Co2StorageMap;
use crate::demand::DemandMap;
use crate::emissions::EmissionFactorMap;
use crate::ranking::{RankType, RankingTable};
use crate::rampup::{RampUpMap, build_rampup_curves};
use crate::region::RegionID;
use crate::technology::{ProductID, TechnologyMap};
use crate::transition::{Transition, TransitionRegistry};
use crate::units::{Emissions, Volume};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// All state for one simulation run.
pub struct SimulationPathway {
    /// The scenario parameters
    pub(crate) config: ScenarioConfig,
    /// Committed asset stacks by year
    pub(crate) stacks: IndexMap<u32, AssetStack>,
    /// Ranking tables by year and table kind
    pub(crate) rankings: IndexMap<(u32, RankType), RankingTable>,
    /// Demand volumes
    pub(crate) demand: DemandMap,
    /// Emission factors
    pub(crate) emission_factors: EmissionFactorMap,
    /// Technology characteristics
    pub(crate) technologies: TechnologyMap,
    /// Annual emissions limits
    pub(crate) carbon_budget: CarbonBudget,
    /// Ramp-up caps per technology
    pub(crate) rampups: RampUpMap,
    /// CO2 storage capacities
    pub(crate) co2_storage_capacity: Co2StorageMap,
    /// Log of applied transitions
    pub(crate) transitions: TransitionRegistry,
    /// Seeded random source for tie-breaking
    pub(crate) rng: ChaCha8Rng,
    /// CO2 captured in committed years, for cumulative storage accounting
    pub(crate) cumulative_captured: Emissions,
}

impl SimulationPathway {
    /// Assemble a pathway from the scenario configuration and loaded input tables.
    ///
    /// The carbon budget curve is anchored at the initial stack's emissions in the start year.
    pub fn new(
        config: ScenarioConfig,
        initial_stack: AssetStack,
        demand: DemandMap,
        emission_factors: EmissionFactorMap,
        technologies: TechnologyMap,
        rankings: IndexMap<(u32, RankType), RankingTable>,
        co2_storage_capacity: Co2StorageMap,
    ) -> Result<Self> {
        let initial_emissions = initial_stack
            .calculate_emissions(config.start_year, &emission_factors, None, None)
            .co2_scope1_and_2();
        let carbon_budget = CarbonBudget::new(
            config.start_year,
            config.end_year,
            initial_emissions,
            &config.carbon_budget,
        )?;
        let rampups = build_rampup_curves(&technologies, config.end_year, &config.rampup);
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let stacks = [(config.start_year, initial_stack)].into_iter().collect();

        Ok(Self {
            config,
            stacks,
            rankings,
            demand,
            emission_factors,
            technologies,
            carbon_budget,
            rampups,
            co2_storage_capacity,
            transitions: TransitionRegistry::default(),
            rng,
            cumulative_captured: Emissions(0.0),
        })
    }

    /// The scenario configuration
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// The committed stack for the given year
    pub fn get_stack(&self, year: u32) -> Result<&AssetStack> {
        self.stacks
            .get(&year)
            .with_context(|| format!("No asset stack for year {year}"))
    }

    /// Remove and return the stack for the given year, for in-place mutation by an allocator
    pub(crate) fn take_stack(&mut self, year: u32) -> Result<AssetStack> {
        self.stacks
            .shift_remove(&year)
            .with_context(|| format!("No asset stack for year {year}"))
    }

    /// Put a (possibly mutated) stack back for the given year
    pub(crate) fn put_stack(&mut self, year: u32, stack: AssetStack) {
        self.stacks.insert(year, stack);
    }

    /// The demand for a product in a year, summed globally when `region` is `None`
    pub fn get_demand(
        &self,
        product: &ProductID,
        year: u32,
        region: Option<&RegionID>,
    ) -> Result<Volume> {
        self.demand.get(product, year, region)
    }

    /// A working copy of the ranking table for the given year and kind.
    ///
    /// Allocators prune their copy as candidates prove infeasible; the stored table is not
    /// modified. A missing table is empty, which terminates the allocator immediately.
    pub fn get_ranking(&self, year: u32, rank_type: RankType) -> RankingTable {
        self.rankings
            .get(&(year, rank_type))
            .cloned()
            .unwrap_or_default()
    }

    /// Append a transition to the log
    pub(crate) fn record_transition(&mut self, transition: Transition) {
        self.transitions.record(transition);
    }

    /// The transitions recorded so far
    pub fn transitions(&self) -> &TransitionRegistry {
        &self.transitions
    }

    /// The emission factors table
    pub fn emission_factors(&self) -> &EmissionFactorMap {
        &self.emission_factors
    }
}
