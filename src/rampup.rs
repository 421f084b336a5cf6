//! Technology ramp-up curves capping how many assets of a technology can be added per year.
//!
//! A curve covers a ramp window starting at the technology's expected maturity year. Outside the
//! window the technology is unconstrained (before maturity no curve applies because no switch to
//! the technology is ranked, and after the window the supply chain is assumed to have scaled).
use crate::technology::{TechnologyClassification, TechnologyID, TechnologyMap};
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The shape of a ramp-up curve over its window
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum RampUpShape {
    /// Compounding growth from the initial cap
    #[string = "exponential"]
    Exponential,
    /// Rapid rise to a multiple of the baseline, then convex decay back toward it
    #[string = "rayleigh"]
    Rayleigh,
}

/// Scenario parameters for ramp-up curve generation
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct RampUpParams {
    /// Curve shape
    pub shape: RampUpShape,
    /// Maximum asset additions in the first year of the window
    pub initial_cap: u32,
    /// Annual growth rate of the cap (exponential shape)
    pub growth_rate: f64,
    /// Length of the ramp window in years
    pub window: u32,
    /// Peak cap as a multiple of the initial cap (Rayleigh shape)
    pub peak_multiplier: f64,
    /// Technology classifications the cap applies to
    #[serde(default = "default_classifications")]
    pub classifications: Vec<TechnologyClassification>,
}

fn default_classifications() -> Vec<TechnologyClassification> {
    vec![
        TechnologyClassification::Transition,
        TechnologyClassification::EndState,
    ]
}

/// Annual asset-addition caps for one technology over its ramp window.
#[derive(Clone, Debug, PartialEq)]
pub struct RampUpCurve {
    caps: IndexMap<u32, u32>,
}

impl RampUpCurve {
    /// Generate the curve for a window starting at `start_year`, clipped to `horizon_end`.
    pub fn new(start_year: u32, horizon_end: u32, params: &RampUpParams) -> Self {
        let window_end = start_year.saturating_add(params.window).min(horizon_end);
        let caps = (start_year..=window_end)
            .map(|year| {
                let t = f64::from(year - start_year);
                let cap = match params.shape {
                    RampUpShape::Exponential => {
                        f64::from(params.initial_cap) * (1.0 + params.growth_rate).powf(t)
                    }
                    RampUpShape::Rayleigh => rayleigh_cap(t, params),
                };
                (year, cap.round() as u32)
            })
            .collect();
        Self { caps }
    }

    /// The maximum number of asset additions allowed in the given year.
    ///
    /// Returns `None` outside the ramp window, meaning unconstrained.
    pub fn cap(&self, year: u32) -> Option<u32> {
        self.caps.get(&year).copied()
    }
}

/// Baseline plus a Rayleigh-shaped bump peaking at `peak_multiplier` times the baseline.
fn rayleigh_cap(t: f64, params: &RampUpParams) -> f64 {
    let sigma = f64::from(params.window) / 3.0;
    let density = |x: f64| (x / (sigma * sigma)) * (-x * x / (2.0 * sigma * sigma)).exp();
    // The Rayleigh density peaks at x = sigma
    let peak = density(sigma);
    let baseline = f64::from(params.initial_cap);
    baseline + (params.peak_multiplier - 1.0) * baseline * density(t) / peak
}

/// Ramp-up curves per technology
pub type RampUpMap = IndexMap<TechnologyID, RampUpCurve>;

/// Build ramp-up curves for every technology whose classification the scenario constrains.
///
/// Each technology's window starts at its expected maturity year.
pub fn build_rampup_curves(
    technologies: &TechnologyMap,
    horizon_end: u32,
    params: &RampUpParams,
) -> RampUpMap {
    technologies
        .iter_technologies()
        .filter(|(_, characteristics)| {
            params
                .classifications
                .contains(&characteristics.classification)
        })
        .map(|(technology, characteristics)| {
            (
                technology.clone(),
                RampUpCurve::new(characteristics.expected_maturity, horizon_end, params),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Dimensionless;
    use rstest::rstest;

    fn params(shape: RampUpShape) -> RampUpParams {
        RampUpParams {
            shape,
            initial_cap: 4,
            growth_rate: 0.25,
            window: 12,
            peak_multiplier: 3.0,
            classifications: default_classifications(),
        }
    }

    #[test]
    fn test_exponential_curve_compounds() {
        let curve = RampUpCurve::new(2030, 2050, &params(RampUpShape::Exponential));
        assert_eq!(curve.cap(2030), Some(4));
        assert_eq!(curve.cap(2031), Some(5));
        assert_eq!(curve.cap(2034), Some(10)); // 4 * 1.25^4 ~ 9.77
    }

    #[rstest]
    #[case(RampUpShape::Exponential)]
    #[case(RampUpShape::Rayleigh)]
    fn test_outside_window_is_unconstrained(#[case] shape: RampUpShape) {
        let curve = RampUpCurve::new(2030, 2050, &params(shape));
        assert_eq!(curve.cap(2029), None);
        assert_eq!(curve.cap(2043), None);
        assert!(curve.cap(2042).is_some());
    }

    #[test]
    fn test_window_clipped_to_horizon() {
        let curve = RampUpCurve::new(2045, 2050, &params(RampUpShape::Exponential));
        assert!(curve.cap(2050).is_some());
        assert_eq!(curve.cap(2051), None);
    }

    #[test]
    fn test_rayleigh_rises_then_decays_toward_baseline() {
        let curve = RampUpCurve::new(2030, 2060, &params(RampUpShape::Rayleigh));
        let start = curve.cap(2030).unwrap();
        let peak = curve.cap(2034).unwrap(); // sigma = 4 years into the window
        let late = curve.cap(2042).unwrap();
        assert_eq!(start, 4);
        assert_eq!(peak, 12); // 3x the baseline
        assert!(late < peak);
        assert!(late >= start);
    }

    #[test]
    fn test_curves_built_only_for_constrained_classifications() {
        let mut technologies = TechnologyMap::default();
        for (name, classification, maturity) in [
            ("Natural Gas SMR", TechnologyClassification::Initial, 2020),
            ("Electrolyser", TechnologyClassification::EndState, 2028),
        ] {
            technologies.insert(
                ("Ammonia".into(), "Europe".into(), name.into(), 2025),
                crate::technology::TechnologyCharacteristics {
                    classification,
                    lifetime: 25,
                    wacc: Dimensionless(0.08),
                    expected_maturity: maturity,
                },
            );
        }

        let curves = build_rampup_curves(&technologies, 2050, &params(RampUpShape::Exponential));
        assert_eq!(curves.len(), 1);
        let curve = curves.get(&TechnologyID::from("Electrolyser")).unwrap();
        assert_eq!(curve.cap(2028), Some(4));
    }
}
