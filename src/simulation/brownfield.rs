//! The brownfield allocator switches existing assets to better-ranked technologies.
//!
//! Per product and year it works through the brownfield ranking: select the best-ranked switch,
//! pick a matching eligible asset at random, apply the switch to a cloned stack, and commit only
//! if the enabled constraints pass. Failures prune the ranking (one entry for an emissions
//! failure, the whole destination technology for capacity-type failures) and the loop retries.
//! The year's switching is capped at a configured share of the fleet.
use crate::asset::AssetID;
use crate::constraints::{ConstraintKind, StorageScope};
use crate::pathway::SimulationPathway;
use crate::ranking::{RankType, SwitchType};
use crate::simulation::constraint_context;
use crate::technology::{ProductID, TechnologyID};
use crate::transition::Transition;
use crate::units::Dimensionless;
use anyhow::Result;
use indexmap::IndexSet;
use log::debug;
use rand::seq::SliceRandom;

/// Switch assets to better-ranked technologies, up to the annual renovation cap.
pub fn switch_assets(pathway: &mut SimulationPathway, year: u32) -> Result<()> {
    let products = pathway.config().products.clone();
    for product in &products {
        switch_product(pathway, product, year)?;
    }
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn switch_product(pathway: &mut SimulationPathway, product: &ProductID, year: u32) -> Result<()> {
    let mut ranking = pathway.get_ranking(year, RankType::Brownfield);
    if ranking.is_empty() {
        debug!("No brownfield ranking for {product} in {year}");
        return Ok(());
    }
    let annual_limit = pathway.carbon_budget.annual_limit(year)?;
    let old_stack = pathway.get_stack(year - 1)?.clone();
    let config = pathway.config();
    let lowest_cost = config.pathway_kind == crate::config::PathwayKind::LowestCost;
    let investment_cycle = config.investment_cycle;
    let cuf_threshold = Dimensionless(config.cuf_upper_threshold);
    let renovation_share = config.annual_renovation_share;
    let renovation_start = config.renovation_start_year;
    let rebuild_start = config.rebuild_start_year;
    let storage_regional = config
        .co2_storage
        .as_ref()
        .is_some_and(|p| p.scope == StorageScope::Regional);
    let enabled = config.constraints.clone();

    let mut stack = pathway.take_stack(year)?;
    let cap = (renovation_share * stack.asset_count() as f64).floor() as usize;
    let mut pool: IndexSet<AssetID> = stack
        .get_eligible_for_brownfield(year, investment_cycle, cuf_threshold)
        .into_iter()
        .collect();
    let mut commits = 0;

    while commits < cap {
        if lowest_cost {
            let emissions = stack
                .calculate_emissions(year, &pathway.emission_factors, None, None)
                .co2_scope1_and_2();
            if emissions <= annual_limit {
                debug!("Budget already met for {product} in {year}, stopping brownfield action");
                break;
            }
        }

        let Some(entry) = ranking.select_best(&mut pathway.rng, |e| {
            e.product == *product && switch_allowed(e.switch_type, renovation_start, rebuild_start, year)
        }) else {
            break;
        };

        let matching: Vec<AssetID> = pool
            .iter()
            .copied()
            .filter(|&id| {
                stack.get(id).is_some_and(|asset| {
                    asset.product == *product
                        && asset.technology == entry.origin
                        && asset.region == entry.region
                        && (!is_ppa_route(&entry.destination) || asset.ppa_eligible)
                })
            })
            .collect();
        let Some(id) = matching.choose(&mut pathway.rng).copied() else {
            ranking.remove_entry(&entry);
            continue;
        };
        let Some(characteristics) = pathway
            .technologies
            .get(product, &entry.region, &entry.destination, year)
            .cloned()
        else {
            ranking.remove_entry(&entry);
            continue;
        };

        let update_commission_year = entry.switch_type == SwitchType::BrownfieldRebuild;
        if entry.origin == entry.destination {
            // Bookkeeping pass: no constraint check, does not count toward the cap
            stack.update_asset(
                id,
                &entry.destination,
                characteristics.classification,
                characteristics.lifetime,
                entry.switch_type,
                update_commission_year,
                year,
            );
            pool.shift_remove(&id);
            continue;
        }

        let mut tentative = stack.clone();
        tentative.update_asset(
            id,
            &entry.destination,
            characteristics.classification,
            characteristics.lifetime,
            entry.switch_type,
            update_commission_year,
            year,
        );

        let ctx = constraint_context(pathway, &old_stack, year, &enabled);
        let results = ctx.check(&tentative, product, RankType::Brownfield)?;

        let commit = if results.all_pass() {
            true
        } else {
            match results.failed().next() {
                Some(ConstraintKind::Emissions) => {
                    // The switch may still go ahead if it reduces emissions versus not switching
                    let current = stack
                        .calculate_emissions(year, &pathway.emission_factors, None, None)
                        .co2_scope1_and_2();
                    let switched = tentative
                        .calculate_emissions(year, &pathway.emission_factors, None, None)
                        .co2_scope1_and_2();
                    if switched < current {
                        true
                    } else {
                        ranking.remove_entry(&entry);
                        false
                    }
                }
                Some(
                    ConstraintKind::RampUp
                    | ConstraintKind::DemandShare
                    | ConstraintKind::ElectrolysisCapacity,
                ) => {
                    ranking.remove_all_with_destination(&entry.destination, None);
                    false
                }
                Some(ConstraintKind::Co2Storage) => {
                    let region = storage_regional.then_some(&entry.region);
                    ranking.remove_all_with_destination(&entry.destination, region);
                    false
                }
                Some(ConstraintKind::RegionalProduction) | None => {
                    ranking.remove_entry(&entry);
                    false
                }
            }
        };

        if commit {
            stack = tentative;
            pool.shift_remove(&id);
            commits += 1;
            debug!(
                "Switched an asset from {} to {} in {} ({commits}/{cap})",
                entry.origin, entry.destination, entry.region
            );
            pathway.record_transition(Transition {
                year,
                switch_type: entry.switch_type,
                product: product.clone(),
                region: entry.region.clone(),
                origin: Some(entry.origin.clone()),
                destination: Some(entry.destination.clone()),
            });
        }
    }

    pathway.put_stack(year, stack);
    Ok(())
}

/// Whether the switch type is allowed yet in the given year
fn switch_allowed(
    switch_type: SwitchType,
    renovation_start: Option<u32>,
    rebuild_start: Option<u32>,
    year: u32,
) -> bool {
    match switch_type {
        SwitchType::BrownfieldRenovation => renovation_start.is_none_or(|start| year >= start),
        SwitchType::BrownfieldRebuild => rebuild_start.is_none_or(|start| year >= start),
        SwitchType::Decommission | SwitchType::Greenfield => true,
    }
}

/// Destinations backed by a power purchase agreement carry "PPA" in their name
fn is_ppa_route(technology: &TechnologyID) -> bool {
    technology.0.contains("PPA")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Asset, AssetStack};
    use crate::config::{PathwayKind, ScenarioConfig};
    use crate::constraints::Co2StorageMap;
    use crate::ranking::RankingEntry;
    use crate::fixture::{
        sample_config, sample_demand, sample_emission_factors, sample_pathway, sample_rankings,
        sample_stack, sample_technologies,
    };
    use crate::ranking::RankingTable;
    use crate::technology::TechnologyClassification;
    use crate::units::Capacity;
    use indexmap::IndexMap;
    use rstest::rstest;

    fn entry(region: &str, origin: &str, destination: &str, rank: u32) -> RankingEntry {
        RankingEntry {
            product: "Ammonia".into(),
            region: region.into(),
            origin: origin.into(),
            destination: destination.into(),
            switch_type: SwitchType::BrownfieldRenovation,
            year: 2026,
            rank,
            cost: 50.0,
            emissions_delta: -1.5,
        }
    }

    fn pathway_with(
        config: ScenarioConfig,
        stack: AssetStack,
        entries: Vec<RankingEntry>,
    ) -> SimulationPathway {
        let rankings = [((2026, RankType::Brownfield), RankingTable::new(entries))]
            .into_iter()
            .collect();
        SimulationPathway::new(
            config,
            stack,
            sample_demand(),
            sample_emission_factors(),
            sample_technologies(),
            rankings,
            Co2StorageMap::default(),
        )
        .unwrap()
    }

    fn advance(pathway: &mut SimulationPathway) {
        let stack = pathway.get_stack(2025).unwrap().clone();
        pathway.put_stack(2026, stack);
    }

    #[rstest]
    fn test_commits_capped_by_renovation_share(sample_pathway: SimulationPathway) {
        let mut pathway = sample_pathway;
        advance(&mut pathway);
        switch_assets(&mut pathway, 2026).unwrap();
        // floor(0.34 x 3 assets) = 1
        assert_eq!(
            pathway.transitions().count_of(SwitchType::BrownfieldRenovation),
            1
        );
    }

    #[rstest]
    fn test_prunes_entry_without_eligible_assets_and_commits_next(
        sample_config: ScenarioConfig,
        sample_stack: AssetStack,
    ) {
        let config = ScenarioConfig {
            annual_renovation_share: 1.0,
            ..sample_config
        };
        // Rank 1 matches no asset in the stack; rank 2 matches the SMR assets
        let entries = vec![
            entry("Europe", "Coal Gasification", "Methane Pyrolysis", 1),
            entry("Europe", "Natural Gas SMR", "Electrolyser", 2),
        ];
        let mut pathway = pathway_with(config, sample_stack, entries);
        advance(&mut pathway);

        switch_assets(&mut pathway, 2026).unwrap();

        let stack = pathway.get_stack(2026).unwrap();
        assert!(stack.iter().any(|a| a.technology == "Electrolyser".into()));
        assert!(stack.iter().all(|a| a.technology != "Methane Pyrolysis".into()));
    }

    #[rstest]
    fn test_ppa_route_requires_ppa_eligibility(sample_config: ScenarioConfig) {
        let config = ScenarioConfig {
            annual_renovation_share: 1.0,
            ..sample_config
        };
        let mut asset = Asset::new(
            "Ammonia".into(),
            "Natural Gas SMR".into(),
            "Europe".into(),
            2010,
            Capacity(2.0),
            Dimensionless(0.95),
            25,
            TechnologyClassification::Initial,
        );
        asset.ppa_eligible = false;
        let stack = AssetStack::new([asset]);
        let entries = vec![entry("Europe", "Natural Gas SMR", "Electrolyser PPA", 1)];
        let mut pathway = pathway_with(config, stack, entries);
        advance(&mut pathway);

        switch_assets(&mut pathway, 2026).unwrap();

        let stack = pathway.get_stack(2026).unwrap();
        assert!(stack.iter().all(|a| a.technology == "Natural Gas SMR".into()));
        assert!(pathway.transitions().is_empty());
    }

    #[rstest]
    fn test_lowest_cost_stops_once_budget_met(
        sample_config: ScenarioConfig,
        sample_stack: AssetStack,
        sample_rankings: IndexMap<(u32, RankType), RankingTable>,
    ) {
        let config = ScenarioConfig {
            pathway_kind: PathwayKind::LowestCost,
            annual_renovation_share: 1.0,
            ..sample_config
        };
        // The budget is anchored at the initial stack's emissions, so the limit is already met
        let mut pathway = SimulationPathway::new(
            config,
            sample_stack,
            sample_demand(),
            sample_emission_factors(),
            sample_technologies(),
            sample_rankings,
            Co2StorageMap::default(),
        )
        .unwrap();
        advance(&mut pathway);

        switch_assets(&mut pathway, 2026).unwrap();

        assert!(pathway.transitions().is_empty());
    }

    #[rstest]
    fn test_same_technology_pass_does_not_count_toward_cap(
        sample_config: ScenarioConfig,
        sample_stack: AssetStack,
    ) {
        let config = ScenarioConfig {
            annual_renovation_share: 0.4,
            ..sample_config
        };
        // Rank 1 keeps the European assets' technology unchanged; rank 2 is a real switch in
        // Brazil. With a cap of one, the bookkeeping passes must not use it up.
        let entries = vec![
            entry("Europe", "Natural Gas SMR", "Natural Gas SMR", 1),
            entry("Brazil", "Coal Gasification", "Electrolyser", 2),
        ];
        let mut pathway = pathway_with(config, sample_stack, entries);
        advance(&mut pathway);

        switch_assets(&mut pathway, 2026).unwrap();

        let stack = pathway.get_stack(2026).unwrap();
        assert!(stack.iter().any(|a| a.stay_same));
        assert!(
            stack
                .iter()
                .any(|a| a.region == "Brazil".into() && a.technology == "Electrolyser".into())
        );
        assert_eq!(
            pathway.transitions().count_of(SwitchType::BrownfieldRenovation),
            1
        );
    }
}
