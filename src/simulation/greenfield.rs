//! The greenfield allocator builds new assets to meet growing demand.
//!
//! Per product it first tops up every region whose production falls short of its configured
//! minimum share of regional demand, then tops up globally until total production meets total
//! demand. Each build selects the best-ranked feasible candidate, appends it to a cloned stack
//! and constraint-checks it; when the candidate pool is exhausted the remaining demand stays
//! unmet and carries into the next year's comparison.
use crate::asset::{Asset, AssetFilter, AssetStack};
use crate::constraints::{ConstraintKind, StorageScope};
use crate::pathway::SimulationPathway;
use crate::ranking::{RankType, RankingTable, SwitchType};
use crate::region::{RegionAliasMap, RegionID, canonical_region, regions_counting_towards};
use crate::simulation::constraint_context;
use crate::technology::ProductID;
use crate::transition::Transition;
use crate::units::{Capacity, Dimensionless, Volume};
use anyhow::Result;
use log::{debug, warn};

/// Build new assets until demand is met or no feasible candidate remains.
pub fn build_assets(pathway: &mut SimulationPathway, year: u32) -> Result<()> {
    let products = pathway.config().products.clone();
    for product in &products {
        build_product(pathway, product, year)?;
    }
    Ok(())
}

/// Shared parameters for one product's build loop
struct BuildParams<'a> {
    product: &'a ProductID,
    year: u32,
    capacity: Capacity,
    cuf: Dimensionless,
    per_asset_volume: Volume,
    total_demand: Volume,
    max_region_share: Option<f64>,
    aliases: &'a RegionAliasMap,
    enabled: &'a [ConstraintKind],
    old_stack: &'a AssetStack,
    storage_regional: bool,
}

fn build_product(pathway: &mut SimulationPathway, product: &ProductID, year: u32) -> Result<()> {
    let mut ranking = pathway.get_ranking(year, RankType::Greenfield);
    let old_stack = pathway.get_stack(year - 1)?.clone();
    let total_demand = pathway.get_demand(product, year, None)?;
    let regional_demand = pathway.demand.get_regional(product, year);

    let config = pathway.config();
    let capacity = Capacity(config.standard_asset_capacity);
    let cuf = Dimensionless(config.cuf_upper_threshold);
    let aliases = config.region_aliases.clone();
    let regional_params = config.regional_production.clone();
    let storage_regional = config
        .co2_storage
        .as_ref()
        .is_some_and(|p| p.scope == StorageScope::Regional);
    // Meeting regional production is this allocator's own job, not a gate on its candidates
    let enabled: Vec<ConstraintKind> = config
        .constraints
        .iter()
        .copied()
        .filter(|&kind| kind != ConstraintKind::RegionalProduction)
        .collect();

    let mut stack = pathway.take_stack(year)?;
    let params = BuildParams {
        product,
        year,
        capacity,
        cuf,
        per_asset_volume: capacity.at_utilisation(cuf),
        total_demand,
        max_region_share: pathway.config().max_global_demand_share_one_region,
        aliases: &aliases,
        enabled: &enabled,
        old_stack: &old_stack,
        storage_regional,
    };

    // Phase 1: top up regions below their minimum production share
    if let Some(regional) = &regional_params {
        for (region, demand) in &regional_demand {
            let required = regional.share(region) * *demand;
            let produced = stack
                .get_regional_production_volume(product, &aliases)
                .get(region)
                .copied()
                .unwrap_or_default();
            if produced >= required {
                continue;
            }
            let deficit = required - produced;
            let needed = (deficit.value() / params.per_asset_volume.value()).ceil() as u32;
            debug!(
                "{region} is {:.2} Mt short of its {product} minimum, needs {needed} new assets",
                deficit.value()
            );
            let allowed = regions_counting_towards(region, &aliases);
            for _ in 0..needed {
                if !select_and_build(pathway, &mut stack, &mut ranking, &params, Some(&allowed))? {
                    warn!("No feasible new {product} asset for {region}, leaving a shortfall");
                    break;
                }
            }
        }
    }

    // Phase 2: top up globally until total demand is met
    while stack.get_annual_production_volume(&AssetFilter::product(product)) < total_demand {
        if !select_and_build(pathway, &mut stack, &mut ranking, &params, None)? {
            warn!("Global {product} demand for {year} cannot be met, leaving a shortfall");
            break;
        }
    }

    pathway.put_stack(year, stack);
    Ok(())
}

/// Build one new asset from the best-ranked feasible candidate.
///
/// Returns `Ok(false)` when the candidate pool is exhausted, a normal stop.
fn select_and_build(
    pathway: &mut SimulationPathway,
    stack: &mut AssetStack,
    ranking: &mut RankingTable,
    params: &BuildParams,
    allowed_regions: Option<&[RegionID]>,
) -> Result<bool> {
    loop {
        let region_volumes = stack.get_regional_production_volume(params.product, params.aliases);
        let Some(entry) = ranking.select_best(&mut pathway.rng, |e| {
            e.product == *params.product
                && allowed_regions.is_none_or(|regions| regions.contains(&e.region))
                && region_within_cap(&e.region, &region_volumes, params)
        }) else {
            return Ok(false);
        };

        let Some(characteristics) = pathway
            .technologies
            .get(params.product, &entry.region, &entry.destination, params.year)
            .cloned()
        else {
            // Technology not available in this region and year
            ranking.remove_entry(&entry);
            continue;
        };

        let mut asset = Asset::new(
            params.product.clone(),
            entry.destination.clone(),
            entry.region.clone(),
            params.year,
            params.capacity,
            params.cuf,
            characteristics.lifetime,
            characteristics.classification,
        );
        asset.newly_built = true;

        let mut tentative = stack.clone();
        tentative.append(asset);
        let ctx = constraint_context(pathway, params.old_stack, params.year, params.enabled);
        let results = ctx.check(&tentative, params.product, RankType::Greenfield)?;

        if results.all_pass() {
            *stack = tentative;
            debug!("Built a {} asset in {}", entry.destination, entry.region);
            pathway.record_transition(Transition {
                year: params.year,
                switch_type: SwitchType::Greenfield,
                product: params.product.clone(),
                region: entry.region.clone(),
                origin: None,
                destination: Some(entry.destination.clone()),
            });
            return Ok(true);
        }
        match results.failed().next() {
            Some(
                ConstraintKind::RampUp
                | ConstraintKind::DemandShare
                | ConstraintKind::ElectrolysisCapacity,
            ) => ranking.remove_all_with_destination(&entry.destination, None),
            Some(ConstraintKind::Co2Storage) => {
                let region = params.storage_regional.then_some(&entry.region);
                ranking.remove_all_with_destination(&entry.destination, region);
            }
            _ => ranking.remove_entry(&entry),
        }
    }
}

/// Whether building one more standard asset in the region stays within the cap on one region's
/// share of global demand
fn region_within_cap(
    region: &RegionID,
    region_volumes: &indexmap::IndexMap<RegionID, Volume>,
    params: &BuildParams,
) -> bool {
    let Some(max_share) = params.max_region_share else {
        return true;
    };
    let canonical = canonical_region(region, params.aliases);
    let current = region_volumes.get(&canonical).copied().unwrap_or_default();
    current + params.per_asset_volume <= Dimensionless(max_share) * params.total_demand
}
