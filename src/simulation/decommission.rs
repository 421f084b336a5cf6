//! The decommission allocator removes surplus capacity.
//!
//! Per product, assets are retired while production exceeds demand by at least one typical
//! asset's volume, following the decommission ranking. Exhaustion of the ranking or of the
//! eligible assets is a normal stop, the surplus simply persists.
use crate::asset::{Asset, AssetFilter, AssetID};
use crate::pathway::SimulationPathway;
use crate::ranking::{RankType, SwitchType};
use crate::technology::ProductID;
use crate::transition::Transition;
use crate::units::{Dimensionless, Volume};
use anyhow::Result;
use log::debug;
use rand::seq::SliceRandom;

/// Remove assets until each product's surplus falls below one typical asset's volume.
pub fn decommission_assets(pathway: &mut SimulationPathway, year: u32) -> Result<()> {
    let products = pathway.config().products.clone();
    for product in &products {
        decommission_product(pathway, product, year)?;
        force_decommission_legacy(pathway, product, year)?;
    }
    Ok(())
}

fn decommission_product(
    pathway: &mut SimulationPathway,
    product: &ProductID,
    year: u32,
) -> Result<()> {
    let mut ranking = pathway.get_ranking(year, RankType::Decommission);
    let demand = pathway.get_demand(product, year, None)?;
    let config = pathway.config();
    let typical_volume = Volume(config.standard_asset_capacity * config.cuf_upper_threshold);
    let cuf_threshold = Dimensionless(config.cuf_lower_threshold);
    let min_age = config.decommission_min_age;

    let mut stack = pathway.take_stack(year)?;
    let mut surplus = stack.get_annual_production_volume(&AssetFilter::product(product)) - demand;
    debug!("Decommission for {product} in {year}: surplus {:.2} Mt", surplus.value());

    while surplus >= typical_volume {
        let Some(entry) = ranking.select_best(&mut pathway.rng, |e| e.product == *product) else {
            // Ranking exhausted: no eligible asset, a normal stop
            break;
        };
        let matching: Vec<AssetID> = stack
            .get_eligible_for_decommission(year, cuf_threshold, min_age)
            .into_iter()
            .filter(|&id| {
                stack.get(id).is_some_and(|asset| {
                    asset.product == *product
                        && asset.technology == entry.origin
                        && asset.region == entry.region
                })
            })
            .collect();
        let Some(id) = matching.choose(&mut pathway.rng).copied() else {
            ranking.remove_entry(&entry);
            continue;
        };
        let Some(asset) = stack.remove(id) else {
            break;
        };
        surplus = surplus - asset.annual_production_volume();
        debug!(
            "Decommissioned a {} asset in {}, surplus now {:.2} Mt",
            asset.technology,
            asset.region,
            surplus.value()
        );
        pathway.record_transition(Transition {
            year,
            switch_type: SwitchType::Decommission,
            product: product.clone(),
            region: asset.region,
            origin: Some(asset.technology),
            destination: None,
        });
    }

    pathway.put_stack(year, stack);
    Ok(())
}

/// Phase out legacy technologies regardless of surplus, from the configured year on.
fn force_decommission_legacy(
    pathway: &mut SimulationPathway,
    product: &ProductID,
    year: u32,
) -> Result<()> {
    let Some(params) = pathway.config().forced_decommission.clone() else {
        return Ok(());
    };
    if year < params.from_year {
        return Ok(());
    }

    let mut stack = pathway.take_stack(year)?;
    for technology in &params.technologies {
        let ids: Vec<AssetID> = stack
            .filtered(&AssetFilter::product(product).with_technology(technology))
            .map(Asset::id)
            .collect();
        let count = (params.annual_share * ids.len() as f64).ceil() as usize;
        let chosen: Vec<AssetID> = ids
            .choose_multiple(&mut pathway.rng, count)
            .copied()
            .collect();
        for id in chosen {
            if let Some(asset) = stack.remove(id) {
                debug!("Forced decommission of a {technology} asset in {}", asset.region);
                pathway.record_transition(Transition {
                    year,
                    switch_type: SwitchType::Decommission,
                    product: product.clone(),
                    region: asset.region,
                    origin: Some(asset.technology),
                    destination: None,
                });
            }
        }
    }
    pathway.put_stack(year, stack);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetStack;
    use crate::config::{ForcedDecommissionParams, ScenarioConfig};
    use crate::constraints::Co2StorageMap;
    use crate::demand::DemandMap;
    use crate::emissions::EmissionFactorMap;
    use crate::fixture::{sample_config, sample_technologies};
    use crate::ranking::{DECOMMISSION_DESTINATION, RankingEntry, RankingTable};
    use crate::technology::TechnologyClassification;
    use crate::units::Capacity;
    use float_cmp::assert_approx_eq;
    use indexmap::IndexMap;
    use rstest::rstest;

    /// Ten identical legacy assets, each producing one Mt per year
    fn legacy_stack() -> AssetStack {
        AssetStack::new((0..10).map(|_| {
            Asset::new(
                "Ammonia".into(),
                "Legacy".into(),
                "Europe".into(),
                2000,
                Capacity(2.0),
                Dimensionless(0.5),
                40,
                TechnologyClassification::Initial,
            )
        }))
    }

    fn legacy_pathway(config: ScenarioConfig, demand_volume: f64) -> SimulationPathway {
        let mut demand = DemandMap::default();
        for year in 2025..=2030 {
            demand.insert("Ammonia".into(), "Europe".into(), year, Volume(demand_volume));
        }
        let mut rankings = IndexMap::new();
        for year in 2026..=2030 {
            rankings.insert(
                (year, RankType::Decommission),
                RankingTable::new(vec![RankingEntry {
                    product: "Ammonia".into(),
                    region: "Europe".into(),
                    origin: "Legacy".into(),
                    destination: DECOMMISSION_DESTINATION.into(),
                    switch_type: SwitchType::Decommission,
                    year,
                    rank: 1,
                    cost: 10.0,
                    emissions_delta: 0.0,
                }]),
            );
        }
        SimulationPathway::new(
            config,
            legacy_stack(),
            demand,
            EmissionFactorMap::default(),
            sample_technologies(),
            rankings,
            Co2StorageMap::default(),
        )
        .unwrap()
    }

    fn shrinking_demand_config(sample_config: ScenarioConfig) -> ScenarioConfig {
        ScenarioConfig {
            standard_asset_capacity: 1.0,
            cuf_lower_threshold: 0.6,
            cuf_upper_threshold: 0.6,
            decommission_min_age: 0,
            ..sample_config
        }
    }

    #[rstest]
    fn test_shrinking_demand_removes_exact_surplus(sample_config: ScenarioConfig) {
        // Production of 10 against a demand of 8: exactly two assets go
        let mut pathway = legacy_pathway(shrinking_demand_config(sample_config), 8.0);
        let stack = pathway.get_stack(2025).unwrap().clone();
        pathway.put_stack(2026, stack);

        decommission_assets(&mut pathway, 2026).unwrap();

        let stack = pathway.get_stack(2026).unwrap();
        assert_eq!(stack.asset_count(), 8);
        let production = stack.get_annual_production_volume(&AssetFilter::product(&"Ammonia".into()));
        assert_approx_eq!(f64, production.value(), 8.0);
        assert_eq!(pathway.transitions().count_of(SwitchType::Decommission), 2);
    }

    #[rstest]
    fn test_small_surplus_is_tolerated(sample_config: ScenarioConfig) {
        // Surplus of 0.5 is below one typical asset's volume
        let mut pathway = legacy_pathway(shrinking_demand_config(sample_config), 9.5);
        let stack = pathway.get_stack(2025).unwrap().clone();
        pathway.put_stack(2026, stack);

        decommission_assets(&mut pathway, 2026).unwrap();

        assert_eq!(pathway.get_stack(2026).unwrap().asset_count(), 10);
        assert!(pathway.transitions().is_empty());
    }

    #[rstest]
    fn test_no_eligible_asset_is_a_normal_stop(sample_config: ScenarioConfig) {
        // Assets too young to retire: the ranking entry is pruned and the allocator stops
        let config = ScenarioConfig {
            decommission_min_age: 50,
            ..shrinking_demand_config(sample_config)
        };
        let mut pathway = legacy_pathway(config, 8.0);
        let stack = pathway.get_stack(2025).unwrap().clone();
        pathway.put_stack(2026, stack);

        decommission_assets(&mut pathway, 2026).unwrap();

        assert_eq!(pathway.get_stack(2026).unwrap().asset_count(), 10);
    }

    #[rstest]
    fn test_forced_decommission_phases_out_legacy(sample_config: ScenarioConfig) {
        let config = ScenarioConfig {
            forced_decommission: Some(ForcedDecommissionParams {
                technologies: vec!["Legacy".into()],
                from_year: 2027,
                annual_share: 0.5,
            }),
            ..shrinking_demand_config(sample_config)
        };
        let mut pathway = legacy_pathway(config, 10.0);
        let stack = pathway.get_stack(2025).unwrap().clone();
        pathway.put_stack(2026, stack.clone());
        decommission_assets(&mut pathway, 2026).unwrap();
        // Before the phase-out year nothing is forced
        assert_eq!(pathway.get_stack(2026).unwrap().asset_count(), 10);

        pathway.put_stack(2027, stack);
        decommission_assets(&mut pathway, 2027).unwrap();
        assert_eq!(pathway.get_stack(2027).unwrap().asset_count(), 5);
    }
}
