//! Per-scope emission factors and aggregated stack emissions.
use crate::region::RegionID;
use crate::technology::{ProductID, TechnologyID};
use crate::units::{Emissions, EmissionsIntensity};
use indexmap::IndexMap;

/// Emission factors for one technology producing one product in one region and year.
///
/// Units: t GHG per t product.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmissionFactors {
    /// Direct (scope 1) CO2 emissions
    pub co2_scope1: EmissionsIntensity,
    /// Energy-related (scope 2) CO2 emissions
    pub co2_scope2: EmissionsIntensity,
    /// Upstream (scope 3) CO2 emissions
    pub co2_scope3_upstream: EmissionsIntensity,
    /// CO2 captured and sent to storage
    pub co2_captured: EmissionsIntensity,
}

/// A map of [`EmissionFactors`], keyed by product, region, technology and year
#[derive(Debug, Clone, Default)]
pub struct EmissionFactorMap(
    pub IndexMap<(ProductID, RegionID, TechnologyID, u32), EmissionFactors>,
);

impl EmissionFactorMap {
    /// Look up emission factors; technologies with no matching row emit zero.
    pub fn get(
        &self,
        product: &ProductID,
        region: &RegionID,
        technology: &TechnologyID,
        year: u32,
    ) -> EmissionFactors {
        self.0
            .get(&(product.clone(), region.clone(), technology.clone(), year))
            .copied()
            .unwrap_or_default()
    }

    /// Insert emission factors for the given key
    pub fn insert(
        &mut self,
        product: ProductID,
        region: RegionID,
        technology: TechnologyID,
        year: u32,
        factors: EmissionFactors,
    ) {
        self.0.insert((product, region, technology, year), factors);
    }
}

/// Total emissions of an asset stack by scope, in Mt GHG per year.
#[derive(Debug, Clone, Copy, Default, PartialEq, derive_more::Add)]
pub struct StackEmissions {
    /// Direct (scope 1) CO2 emissions
    pub co2_scope1: Emissions,
    /// Energy-related (scope 2) CO2 emissions
    pub co2_scope2: Emissions,
    /// Upstream (scope 3) CO2 emissions
    pub co2_scope3_upstream: Emissions,
    /// CO2 captured and sent to storage
    pub co2_captured: Emissions,
}

impl StackEmissions {
    /// Combined scope 1 and 2 CO2 emissions, the quantity bounded by the carbon budget.
    pub fn co2_scope1_and_2(&self) -> Emissions {
        self.co2_scope1 + self.co2_scope2
    }
}
