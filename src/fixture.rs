//! Common test fixtures.
use crate::asset::{Asset, AssetStack};
use crate::carbon_budget::{BudgetShape, CarbonBudgetParams};
use crate::config::{PathwayKind, ScenarioConfig};
use crate::constraints::{Co2StorageMap, ConstraintKind};
use crate::demand::DemandMap;
use crate::emissions::{EmissionFactorMap, EmissionFactors};
use crate::pathway::SimulationPathway;
use crate::ranking::{
    DECOMMISSION_DESTINATION, GREENFIELD_ORIGIN, RankType, RankingEntry, RankingParams,
    RankingTable, SwitchType,
};
use crate::rampup::{RampUpParams, RampUpShape};
use crate::technology::{TechnologyCharacteristics, TechnologyClassification, TechnologyMap};
use crate::units::{Capacity, Dimensionless, EmissionsIntensity, Volume};
use indexmap::IndexMap;
use rstest::fixture;

/// A conventional ammonia asset commissioned in 2010
#[fixture]
pub fn sample_asset() -> Asset {
    Asset::new(
        "Ammonia".into(),
        "Natural Gas SMR".into(),
        "Europe".into(),
        2010,
        Capacity(2.0),
        Dimensionless(0.95),
        25,
        TechnologyClassification::Initial,
    )
}

/// A small ammonia fleet: two gas-based assets in Europe and a coal-based one in Brazil
#[fixture]
pub fn sample_stack() -> AssetStack {
    let asset = |technology: &str, region: &str, commission_year| {
        Asset::new(
            "Ammonia".into(),
            technology.into(),
            region.into(),
            commission_year,
            Capacity(2.0),
            Dimensionless(0.95),
            25,
            TechnologyClassification::Initial,
        )
    };
    AssetStack::new([
        asset("Natural Gas SMR", "Europe", 2010),
        asset("Natural Gas SMR", "Europe", 2012),
        asset("Coal Gasification", "Brazil", 2008),
    ])
}

/// Emission factors for the technologies in [`sample_stack`], for the years 2025 to 2035
#[fixture]
pub fn sample_emission_factors() -> EmissionFactorMap {
    let mut map = EmissionFactorMap::default();
    for year in 2025..=2035 {
        map.insert(
            "Ammonia".into(),
            "Europe".into(),
            "Natural Gas SMR".into(),
            year,
            EmissionFactors {
                co2_scope1: EmissionsIntensity(1.8),
                co2_scope2: EmissionsIntensity(0.2),
                co2_scope3_upstream: EmissionsIntensity(0.4),
                co2_captured: EmissionsIntensity(0.1),
            },
        );
        map.insert(
            "Ammonia".into(),
            "Brazil".into(),
            "Coal Gasification".into(),
            year,
            EmissionFactors {
                co2_scope1: EmissionsIntensity(3.2),
                co2_scope2: EmissionsIntensity(0.3),
                co2_scope3_upstream: EmissionsIntensity(0.5),
                co2_captured: EmissionsIntensity(0.0),
            },
        );
    }
    map
}

/// A scenario configuration matching the sample fleet
#[fixture]
pub fn sample_config() -> ScenarioConfig {
    ScenarioConfig {
        products: vec!["Ammonia".into()],
        start_year: 2025,
        end_year: 2050,
        pathway_kind: PathwayKind::FastestAbatement,
        seed: 42,
        standard_asset_capacity: 2.0,
        cuf_lower_threshold: 0.6,
        cuf_upper_threshold: 0.9,
        investment_cycle: 15,
        decommission_min_age: 10,
        annual_renovation_share: 0.34,
        renovation_start_year: None,
        rebuild_start_year: None,
        constraints: vec![ConstraintKind::Emissions],
        regional_production: None,
        max_global_demand_share_one_region: None,
        region_aliases: IndexMap::new(),
        carbon_budget: CarbonBudgetParams {
            total_budget: 5000.0,
            action_start: 2030,
            end_value: 1.0,
            shape: BudgetShape::Linear,
        },
        rampup: RampUpParams {
            shape: RampUpShape::Exponential,
            initial_cap: 4,
            growth_rate: 0.25,
            window: 12,
            peak_multiplier: 3.0,
            classifications: vec![
                TechnologyClassification::Transition,
                TechnologyClassification::EndState,
            ],
        },
        demand_share: None,
        co2_storage: None,
        electrolysis: None,
        forced_decommission: None,
        residual_emissions_cutover_year: None,
        ranking: RankingParams::default(),
        log_level: "off".to_string(),
    }
}

/// Technology characteristics for the sample technologies in both sample regions
#[fixture]
pub fn sample_technologies() -> TechnologyMap {
    let mut map = TechnologyMap::default();
    let rows = [
        ("Natural Gas SMR", TechnologyClassification::Initial, 25, 2020),
        ("Coal Gasification", TechnologyClassification::Initial, 25, 2020),
        ("Electrolyser", TechnologyClassification::EndState, 30, 2025),
    ];
    for region in ["Europe", "Brazil"] {
        for (technology, classification, lifetime, expected_maturity) in rows {
            for year in 2025..=2035 {
                map.insert(
                    ("Ammonia".into(), region.into(), technology.into(), year),
                    TechnologyCharacteristics {
                        classification,
                        lifetime,
                        wacc: Dimensionless(0.08),
                        expected_maturity,
                    },
                );
            }
        }
    }
    map
}

/// Ranking tables for the sample fleet covering the years 2026 to 2030
#[fixture]
pub fn sample_rankings() -> IndexMap<(u32, RankType), RankingTable> {
    let entry = |region: &str,
                 origin: &str,
                 destination: &str,
                 switch_type,
                 year,
                 rank,
                 cost| RankingEntry {
        product: "Ammonia".into(),
        region: region.into(),
        origin: origin.into(),
        destination: destination.into(),
        switch_type,
        year,
        rank,
        cost,
        emissions_delta: -1.5,
    };

    let mut rankings = IndexMap::new();
    for year in 2026..=2030 {
        rankings.insert(
            (year, RankType::Brownfield),
            RankingTable::new(vec![
                entry(
                    "Europe",
                    "Natural Gas SMR",
                    "Electrolyser",
                    SwitchType::BrownfieldRenovation,
                    year,
                    1,
                    50.0,
                ),
                entry(
                    "Brazil",
                    "Coal Gasification",
                    "Electrolyser",
                    SwitchType::BrownfieldRenovation,
                    year,
                    2,
                    60.0,
                ),
            ]),
        );
        rankings.insert(
            (year, RankType::Greenfield),
            RankingTable::new(vec![
                entry(
                    "Europe",
                    GREENFIELD_ORIGIN,
                    "Electrolyser",
                    SwitchType::Greenfield,
                    year,
                    1,
                    55.0,
                ),
                entry(
                    "Brazil",
                    GREENFIELD_ORIGIN,
                    "Electrolyser",
                    SwitchType::Greenfield,
                    year,
                    2,
                    65.0,
                ),
            ]),
        );
        rankings.insert(
            (year, RankType::Decommission),
            RankingTable::new(vec![
                entry(
                    "Brazil",
                    "Coal Gasification",
                    DECOMMISSION_DESTINATION,
                    SwitchType::Decommission,
                    year,
                    1,
                    10.0,
                ),
                entry(
                    "Europe",
                    "Natural Gas SMR",
                    DECOMMISSION_DESTINATION,
                    SwitchType::Decommission,
                    year,
                    2,
                    20.0,
                ),
            ]),
        );
    }
    rankings
}

/// Demand for the sample fleet: Europe and Brazil over the whole horizon
#[fixture]
pub fn sample_demand() -> DemandMap {
    let mut map = DemandMap::default();
    for year in 2025..=2050 {
        map.insert("Ammonia".into(), "Europe".into(), year, Volume(4.0));
        map.insert("Ammonia".into(), "Brazil".into(), year, Volume(2.0));
    }
    map
}

/// A fully assembled pathway over the sample fleet and tables
#[fixture]
pub fn sample_pathway(
    sample_config: ScenarioConfig,
    sample_stack: AssetStack,
    sample_demand: DemandMap,
    sample_emission_factors: EmissionFactorMap,
    sample_technologies: TechnologyMap,
    sample_rankings: IndexMap<(u32, RankType), RankingTable>,
) -> SimulationPathway {
    SimulationPathway::new(
        sample_config,
        sample_stack,
        sample_demand,
        sample_emission_factors,
        sample_technologies,
        sample_rankings,
        Co2StorageMap::default(),
    )
    .expect("sample pathway should assemble")
}
