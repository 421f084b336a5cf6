//! Demand data for each product, region and year.
use crate::region::RegionID;
use crate::technology::ProductID;
use crate::units::Volume;
use anyhow::{Context, Result};
use indexmap::IndexMap;

/// The pseudo-region representing global demand
pub const GLOBAL_REGION: &str = "Global";

/// A map of demand volumes, keyed by product, region and year
#[derive(Debug, Clone, Default)]
pub struct DemandMap(pub IndexMap<(ProductID, RegionID, u32), Volume>);

impl DemandMap {
    /// Get the demand for the given product and year.
    ///
    /// If `region` is `None`, global demand is returned: the value stored under the "Global"
    /// pseudo-region if present, otherwise the sum over all regions.
    pub fn get(&self, product: &ProductID, year: u32, region: Option<&RegionID>) -> Result<Volume> {
        match region {
            Some(region) => self
                .0
                .get(&(product.clone(), region.clone(), year))
                .copied()
                .with_context(|| {
                    format!("No demand data for product {product} in {region} for year {year}")
                }),
            None => {
                let global: RegionID = GLOBAL_REGION.into();
                if let Some(demand) = self.0.get(&(product.clone(), global, year)) {
                    return Ok(*demand);
                }

                let mut found = false;
                let total = self
                    .0
                    .iter()
                    .filter(|((p, _, y), _)| p == product && *y == year)
                    .map(|(_, demand)| {
                        found = true;
                        *demand
                    })
                    .sum();
                anyhow::ensure!(
                    found,
                    "No demand data for product {product} in year {year}"
                );
                Ok(total)
            }
        }
    }

    /// Get the regional demand for the given product and year, excluding the global pseudo-region.
    pub fn get_regional(&self, product: &ProductID, year: u32) -> IndexMap<RegionID, Volume> {
        self.0
            .iter()
            .filter(|((p, region, y), _)| {
                p == product && *y == year && region.0.as_ref() != GLOBAL_REGION
            })
            .map(|((_, region, _), demand)| (region.clone(), *demand))
            .collect()
    }

    /// Insert a demand entry
    pub fn insert(&mut self, product: ProductID, region: RegionID, year: u32, demand: Volume) {
        self.0.insert((product, region, year), demand);
    }
}
