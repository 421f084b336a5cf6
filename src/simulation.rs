//! The year-by-year simulation loop.
//!
//! Each simulated year starts from a clone of the previous year's committed stack and passes it
//! through the three allocators in fixed order: decommission frees capacity, brownfield switches
//! technology on existing assets, greenfield adds new capacity. The mutated stack is then frozen
//! as that year's snapshot.
use crate::asset::AssetStack;
use crate::constraints::{ConstraintContext, ConstraintKind};
use crate::pathway::SimulationPathway;
use anyhow::Result;
use log::info;

pub mod brownfield;
pub mod decommission;
pub mod greenfield;

/// Run the simulation over the whole model horizon.
pub fn run(pathway: &mut SimulationPathway) -> Result<()> {
    let start_year = pathway.config().start_year;
    let end_year = pathway.config().end_year;
    for year in start_year..end_year {
        let next = year + 1;
        info!("Simulating year {next}");

        let stack = pathway.get_stack(year)?.clone();
        pathway.put_stack(next, stack);

        decommission::decommission_assets(pathway, next)?;
        brownfield::switch_assets(pathway, next)?;
        greenfield::build_assets(pathway, next)?;

        let captured = pathway
            .get_stack(next)?
            .calculate_co2_captured(next, &pathway.emission_factors, None);
        pathway.cumulative_captured = pathway.cumulative_captured + captured;
    }
    Ok(())
}

/// Assemble a constraint context for checking tentative stacks planned for `year`.
///
/// `old_stack` is the previously committed stack the tentative one derives from; `enabled`
/// overrides the scenario's constraint list where an allocator excludes a constraint it is
/// itself responsible for satisfying.
pub(crate) fn constraint_context<'a>(
    pathway: &'a SimulationPathway,
    old_stack: &'a AssetStack,
    year: u32,
    enabled: &'a [ConstraintKind],
) -> ConstraintContext<'a> {
    let config = pathway.config();
    ConstraintContext {
        year,
        old_stack,
        demand: &pathway.demand,
        emission_factors: &pathway.emission_factors,
        carbon_budget: &pathway.carbon_budget,
        rampups: &pathway.rampups,
        region_aliases: &config.region_aliases,
        enabled,
        regional_production: config.regional_production.as_ref(),
        demand_share: config.demand_share.as_ref(),
        co2_storage: config.co2_storage.as_ref(),
        co2_storage_capacity: &pathway.co2_storage_capacity,
        cumulative_captured: pathway.cumulative_captured,
        electrolysis: config.electrolysis.as_ref(),
        residual_cutover_year: config.residual_emissions_cutover_year,
    }
}
