//! Regions represent the geographical areas in which assets are located.
//!
//! Some sectors map "low-cost power" subregions onto their parent region; aliases fold the
//! subregion's production into the parent for demand accounting, while ranking lookups accept
//! either name.
use crate::id::define_id_type;
use indexmap::IndexMap;

define_id_type! {RegionID}

/// Maps a subregion onto the canonical region its production counts towards.
///
/// Keys are subregions (e.g. "Brazil"), values the canonical region (e.g. "Latin America").
pub type RegionAliasMap = IndexMap<RegionID, RegionID>;

/// Fold a region through the alias map, returning the canonical region.
pub fn canonical_region(region: &RegionID, aliases: &RegionAliasMap) -> RegionID {
    aliases.get(region).unwrap_or(region).clone()
}

/// All region names that count towards the given canonical region (itself plus any aliases).
pub fn regions_counting_towards(region: &RegionID, aliases: &RegionAliasMap) -> Vec<RegionID> {
    let mut regions = vec![region.clone()];
    regions.extend(
        aliases
            .iter()
            .filter(|(_, canonical)| *canonical == region)
            .map(|(subregion, _)| subregion.clone()),
    );
    regions
}
