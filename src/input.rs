//! Routines for loading the model's input tables from CSV files.
//!
//! The tables are produced by upstream preprocessing and treated as opaque inputs: demand,
//! technology characteristics, emission factors, the initial fleet and the candidate technology
//! switches (which are ranked here at load time).
use crate::asset::{Asset, AssetStack};
use crate::config::ScenarioConfig;
use crate::constraints::Co2StorageMap;
use crate::demand::DemandMap;
use crate::emissions::{EmissionFactorMap, EmissionFactors};
use crate::pathway::SimulationPathway;
use crate::ranking::{RankType, RankingEntry, RankingParams, RankingTable, SwitchType, assign_ranks};
use crate::region::RegionID;
use crate::technology::{ProductID, TechnologyClassification, TechnologyID, TechnologyMap};
use crate::units::{Capacity, Dimensionless, Emissions, EmissionsIntensity, Volume};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// The input file name for the initial fleet
const INITIAL_ASSETS_FILE_NAME: &str = "initial_assets.csv";

/// The input file name for demand volumes
const DEMAND_FILE_NAME: &str = "demand.csv";

/// The input file name for technology characteristics
const TECHNOLOGIES_FILE_NAME: &str = "technology_characteristics.csv";

/// The input file name for emission factors
const EMISSION_FACTORS_FILE_NAME: &str = "emission_factors.csv";

/// The input file name for candidate technology switches
const SWITCHES_FILE_NAME: &str = "technology_switches.csv";

/// The optional input file name for CO2 storage capacities
const CO2_STORAGE_FILE_NAME: &str = "co2_storage.csv";

/// Read a series of type `T`s from a CSV file into a `Vec<T>`.
///
/// # Arguments
///
/// * `csv_file_path`: Path to the CSV file
pub fn read_vec_from_csv<T: DeserializeOwned>(csv_file_path: &Path) -> Result<Vec<T>> {
    let error_context = || format!("Error reading {}", csv_file_path.to_string_lossy());
    let mut reader = csv::Reader::from_path(csv_file_path).with_context(error_context)?;

    let mut vec = Vec::new();
    for result in reader.deserialize() {
        let record: T = result.with_context(error_context)?;
        vec.push(record);
    }
    ensure!(!vec.is_empty(), "CSV file {} is empty", csv_file_path.to_string_lossy());

    Ok(vec)
}

/// A row of the initial fleet table
#[derive(Debug, Deserialize)]
struct AssetRecord {
    product: ProductID,
    technology: TechnologyID,
    region: RegionID,
    commission_year: u32,
    capacity: f64,
    cuf: f64,
    /// Whether the asset can switch to a power-purchase-agreement route (defaults to yes)
    ppa_eligible: Option<bool>,
}

/// A row of the demand table
#[derive(Debug, Deserialize)]
struct DemandRecord {
    product: ProductID,
    region: RegionID,
    year: u32,
    demand: f64,
}

/// A row of the technology characteristics table
#[derive(Debug, Deserialize)]
struct TechnologyRecord {
    product: ProductID,
    region: RegionID,
    technology: TechnologyID,
    year: u32,
    classification: TechnologyClassification,
    lifetime: u32,
    wacc: f64,
    expected_maturity: u32,
}

/// A row of the emission factors table
#[derive(Debug, Deserialize)]
struct EmissionFactorRecord {
    product: ProductID,
    region: RegionID,
    technology: TechnologyID,
    year: u32,
    co2_scope1: f64,
    co2_scope2: f64,
    co2_scope3_upstream: f64,
    co2_captured: f64,
}

/// A row of the candidate switches table
#[derive(Debug, Deserialize)]
struct SwitchRecord {
    product: ProductID,
    region: RegionID,
    technology_origin: TechnologyID,
    technology_destination: TechnologyID,
    switch_type: SwitchType,
    year: u32,
    cost: f64,
    emissions_delta: f64,
}

/// A row of the CO2 storage capacity table
#[derive(Debug, Deserialize)]
struct StorageRecord {
    region: RegionID,
    year: u32,
    capacity: f64,
}

/// Load all input tables from `model_dir` and assemble a pathway for the given scenario.
pub fn load_model(model_dir: &Path, config: ScenarioConfig) -> Result<SimulationPathway> {
    let technologies = load_technologies(&model_dir.join(TECHNOLOGIES_FILE_NAME))?;
    let demand = load_demand(&model_dir.join(DEMAND_FILE_NAME))?;
    let emission_factors = load_emission_factors(&model_dir.join(EMISSION_FACTORS_FILE_NAME))?;
    let rankings = load_rankings(&model_dir.join(SWITCHES_FILE_NAME), &config.ranking)?;
    let co2_storage_capacity = load_co2_storage(&model_dir.join(CO2_STORAGE_FILE_NAME))?;
    let initial_stack = load_initial_stack(
        &model_dir.join(INITIAL_ASSETS_FILE_NAME),
        &technologies,
        config.start_year,
    )?;

    SimulationPathway::new(
        config,
        initial_stack,
        demand,
        emission_factors,
        technologies,
        rankings,
        co2_storage_capacity,
    )
}

fn load_technologies(path: &Path) -> Result<TechnologyMap> {
    let mut map = TechnologyMap::default();
    for record in read_vec_from_csv::<TechnologyRecord>(path)? {
        map.insert(
            (record.product, record.region, record.technology, record.year),
            crate::technology::TechnologyCharacteristics {
                classification: record.classification,
                lifetime: record.lifetime,
                wacc: Dimensionless(record.wacc),
                expected_maturity: record.expected_maturity,
            },
        );
    }
    Ok(map)
}

fn load_demand(path: &Path) -> Result<DemandMap> {
    let mut map = DemandMap::default();
    for record in read_vec_from_csv::<DemandRecord>(path)? {
        map.insert(
            record.product,
            record.region,
            record.year,
            Volume(record.demand),
        );
    }
    Ok(map)
}

fn load_emission_factors(path: &Path) -> Result<EmissionFactorMap> {
    let mut map = EmissionFactorMap::default();
    for record in read_vec_from_csv::<EmissionFactorRecord>(path)? {
        map.insert(
            record.product,
            record.region,
            record.technology,
            record.year,
            EmissionFactors {
                co2_scope1: EmissionsIntensity(record.co2_scope1),
                co2_scope2: EmissionsIntensity(record.co2_scope2),
                co2_scope3_upstream: EmissionsIntensity(record.co2_scope3_upstream),
                co2_captured: EmissionsIntensity(record.co2_captured),
            },
        );
    }
    Ok(map)
}

/// Load the candidate switches and rank them.
///
/// Ranks are assigned within each (product, year, table) group so that tiers are comparable
/// only where the allocators compare them.
fn load_rankings(
    path: &Path,
    params: &RankingParams,
) -> Result<IndexMap<(u32, RankType), RankingTable>> {
    let mut groups: IndexMap<(ProductID, u32, RankType), Vec<RankingEntry>> = IndexMap::new();
    for record in read_vec_from_csv::<SwitchRecord>(path)? {
        let rank_type = record.switch_type.rank_type();
        let entry = RankingEntry {
            product: record.product,
            region: record.region,
            origin: record.technology_origin,
            destination: record.technology_destination,
            switch_type: record.switch_type,
            year: record.year,
            rank: 0,
            cost: record.cost,
            emissions_delta: record.emissions_delta,
        };
        groups
            .entry((entry.product.clone(), entry.year, rank_type))
            .or_default()
            .push(entry);
    }

    let mut tables: IndexMap<(u32, RankType), Vec<RankingEntry>> = IndexMap::new();
    for ((_, year, rank_type), mut group) in groups {
        assign_ranks(&mut group, params);
        tables.entry((year, rank_type)).or_default().extend(group);
    }
    Ok(tables
        .into_iter()
        .map(|(key, entries)| (key, RankingTable::new(entries)))
        .collect())
}

/// Load the CO2 storage capacities, if the file is present.
fn load_co2_storage(path: &Path) -> Result<Co2StorageMap> {
    let mut map = Co2StorageMap::default();
    if !path.exists() {
        return Ok(map);
    }
    for record in read_vec_from_csv::<StorageRecord>(path)? {
        map.insert((record.region, record.year), Emissions(record.capacity));
    }
    Ok(map)
}

/// Load the initial fleet, taking each asset's lifetime and classification from the technology
/// characteristics at the start year.
fn load_initial_stack(
    path: &Path,
    technologies: &TechnologyMap,
    start_year: u32,
) -> Result<AssetStack> {
    let mut stack = AssetStack::default();
    for record in read_vec_from_csv::<AssetRecord>(path)? {
        let characteristics = technologies
            .get(&record.product, &record.region, &record.technology, start_year)
            .with_context(|| {
                format!(
                    "No characteristics for technology {} ({}, {}) in {start_year}",
                    record.technology, record.product, record.region
                )
            })?;
        let mut asset = Asset::new(
            record.product,
            record.technology,
            record.region,
            record.commission_year,
            Capacity(record.capacity),
            Dimensionless(record.cuf),
            characteristics.lifetime,
            characteristics.classification,
        );
        asset.ppa_eligible = record.ppa_eligible.unwrap_or(true);
        stack.append(asset);
    }
    Ok(stack)
}
