//! Technologies and their characteristics (classification, lifetime, expected maturity).
use crate::id::define_id_type;
use crate::region::RegionID;
use crate::units::Dimensionless;
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::rc::Rc;

define_id_type! {TechnologyID}
define_id_type! {ProductID}

/// A technology's maturity tier, governing which switches are allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, DeserializeLabeledStringEnum, SerializeLabeledStringEnum)]
pub enum TechnologyClassification {
    /// Conventional technology present at the start of the horizon
    #[string = "initial"]
    Initial,
    /// Intermediate technology on the way to full decarbonisation
    #[string = "transition"]
    Transition,
    /// Technology compatible with the end of the pathway
    #[string = "end-state"]
    EndState,
}

/// Characteristics of one technology for a given product, region and year.
#[derive(Debug, Clone, PartialEq)]
pub struct TechnologyCharacteristics {
    /// The technology's maturity tier
    pub classification: TechnologyClassification,
    /// Lifetime of an asset built with this technology (years)
    pub lifetime: u32,
    /// Weighted average cost of capital
    pub wacc: Dimensionless,
    /// Year in which the technology is expected to reach maturity
    pub expected_maturity: u32,
}

/// Key for looking up technology characteristics
pub type TechnologyKey = (ProductID, RegionID, TechnologyID, u32);

/// A map of [`TechnologyCharacteristics`], keyed by product, region, technology and year
#[derive(Debug, Clone, Default)]
pub struct TechnologyMap(pub IndexMap<TechnologyKey, Rc<TechnologyCharacteristics>>);

impl TechnologyMap {
    /// Look up the characteristics for the given product, region, technology and year.
    ///
    /// Returns `None` if the characteristics table has no matching row; callers treat this as
    /// "technology not available here" rather than an error.
    pub fn get(
        &self,
        product: &ProductID,
        region: &RegionID,
        technology: &TechnologyID,
        year: u32,
    ) -> Option<&Rc<TechnologyCharacteristics>> {
        self.0
            .get(&(product.clone(), region.clone(), technology.clone(), year))
    }

    /// Iterate over all distinct technologies in the map with their characteristics.
    ///
    /// Classification and expected maturity are constant across products, regions and years, so
    /// the first row found for each technology is returned.
    pub fn iter_technologies(
        &self,
    ) -> impl Iterator<Item = (&TechnologyID, &Rc<TechnologyCharacteristics>)> {
        let mut seen = indexmap::IndexSet::new();
        self.0.iter().filter_map(move |((_, _, tech, _), chars)| {
            seen.insert(tech.clone()).then_some((tech, chars))
        })
    }

    /// Insert characteristics for the given key
    pub fn insert(&mut self, key: TechnologyKey, characteristics: TechnologyCharacteristics) {
        self.0.insert(key, Rc::new(characteristics));
    }
}
