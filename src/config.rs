//! Scenario configuration, read from a TOML file.
use crate::carbon_budget::CarbonBudgetParams;
use crate::constraints::{
    Co2StorageParams, ConstraintKind, DemandShareParams, ElectrolysisParams,
    RegionalProductionParams,
};
use crate::ranking::RankingParams;
use crate::rampup::RampUpParams;
use crate::region::RegionAliasMap;
use crate::technology::{ProductID, TechnologyID};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::fs;
use std::path::Path;

/// The file name of the scenario configuration within a model directory
pub const SCENARIO_FILE_NAME: &str = "scenario.toml";

/// The scenario family, governing how aggressively the allocators decarbonise
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum PathwayKind {
    /// Business as usual: no decarbonisation pressure beyond the enabled constraints
    #[string = "bau"]
    BusinessAsUsual,
    /// Fastest abatement: brownfield switches run every year up to the renovation cap
    #[string = "fa"]
    FastestAbatement,
    /// Lowest cost: brownfield action stops once the year's budget is already met
    #[string = "lc"]
    LowestCost,
}

/// Decommission assets of the listed technologies regardless of surplus, from a given year on
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ForcedDecommissionParams {
    /// Technologies to phase out
    pub technologies: Vec<TechnologyID>,
    /// First year the forced phase-out applies
    pub from_year: u32,
    /// Share of each technology's remaining assets removed per year
    pub annual_share: f64,
}

/// Parameters for one simulation scenario.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ScenarioConfig {
    /// The products whose fleets are simulated
    pub products: Vec<ProductID>,
    /// First year of the model horizon
    pub start_year: u32,
    /// Last year of the model horizon
    pub end_year: u32,
    /// The scenario family
    pub pathway_kind: PathwayKind,
    /// Seed for the tie-breaking random source
    pub seed: u64,
    /// Capacity of a newly built standard asset (Mt product per year)
    pub standard_asset_capacity: f64,
    /// Assets running below this capacity utilisation are decommission candidates
    pub cuf_lower_threshold: f64,
    /// Assets running above this capacity utilisation are rebuild candidates; also the
    /// utilisation assumed for newly built assets
    pub cuf_upper_threshold: f64,
    /// Years between brownfield investments in the same asset
    pub investment_cycle: u32,
    /// Minimum age before an asset may be decommissioned
    pub decommission_min_age: u32,
    /// Share of the fleet the brownfield allocator may switch per year
    pub annual_renovation_share: f64,
    /// First year brownfield renovations are allowed
    pub renovation_start_year: Option<u32>,
    /// First year brownfield rebuilds are allowed
    pub rebuild_start_year: Option<u32>,
    /// The constraints enabled for this scenario
    pub constraints: Vec<ConstraintKind>,
    /// Regional production minimums
    pub regional_production: Option<RegionalProductionParams>,
    /// Cap on one region's share of global demand served by new builds
    pub max_global_demand_share_one_region: Option<f64>,
    /// Subregion to canonical region mapping
    #[serde(default)]
    pub region_aliases: RegionAliasMap,
    /// Carbon budget curve parameters
    pub carbon_budget: CarbonBudgetParams,
    /// Ramp-up curve parameters
    pub rampup: RampUpParams,
    /// Demand share cap parameters
    pub demand_share: Option<DemandShareParams>,
    /// CO2 storage constraint parameters
    pub co2_storage: Option<Co2StorageParams>,
    /// Electrolysis capacity constraint parameters
    pub electrolysis: Option<ElectrolysisParams>,
    /// Forced phase-out of legacy technologies
    pub forced_decommission: Option<ForcedDecommissionParams>,
    /// Year from which greenfield emissions checks use residual mode
    pub residual_emissions_cutover_year: Option<u32>,
    /// Rank assignment parameters
    #[serde(default)]
    pub ranking: RankingParams,
    /// The log level to use for the program
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ScenarioConfig {
    /// Read the scenario configuration from the given TOML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path).with_context(|| {
            format!(
                "Could not read scenario file {}",
                path.as_ref().to_string_lossy()
            )
        })?;
        let config: ScenarioConfig =
            toml::from_str(&contents).context("Could not parse scenario file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.products.is_empty(), "No products configured");
        ensure!(
            self.start_year < self.end_year,
            "Start year must precede end year"
        );
        ensure!(
            self.standard_asset_capacity > 0.0,
            "Standard asset capacity must be positive"
        );
        for (name, value) in [
            ("cuf_lower_threshold", self.cuf_lower_threshold),
            ("cuf_upper_threshold", self.cuf_upper_threshold),
            ("annual_renovation_share", self.annual_renovation_share),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "{name} must lie between 0 and 1"
            );
        }
        ensure!(
            self.cuf_lower_threshold <= self.cuf_upper_threshold,
            "cuf_lower_threshold must not exceed cuf_upper_threshold"
        );
        ensure!(
            self.cuf_upper_threshold > 0.0,
            "cuf_upper_threshold must be positive"
        );
        Ok(())
    }
}
