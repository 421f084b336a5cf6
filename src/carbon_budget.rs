//! The carbon budget curve bounding the sector's annual scope 1 and 2 emissions.
//!
//! The curve is generated once per run from the scenario parameters and consulted by the
//! emissions constraint. Annual limits stay flat at the sector's initial emissions level until
//! the action start year, then decline towards a residual end value, with the cumulative sum
//! validated against the total budget.
use crate::units::Emissions;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The shape of the decline from the action start year to the end of the horizon
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum BudgetShape {
    /// Straight line from the action start to the residual end value
    #[string = "linear"]
    Linear,
    /// Steep decline to the halfway level over the first third of the window, then linear
    #[string = "piecewise"]
    Piecewise,
}

/// Scenario parameters for the carbon budget curve
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct CarbonBudgetParams {
    /// Total cumulative scope 1 and 2 budget over the horizon (Mt CO2)
    pub total_budget: f64,
    /// First year in which annual limits start declining
    pub action_start: u32,
    /// Residual annual emissions permitted in the final year (Mt CO2 per year)
    pub end_value: f64,
    /// Decline shape
    pub shape: BudgetShape,
}

/// Annual emissions limits for every year of the horizon.
#[derive(Clone, Debug)]
pub struct CarbonBudget {
    limits: IndexMap<u32, Emissions>,
    total: Emissions,
}

impl CarbonBudget {
    /// Generate the annual limit curve.
    ///
    /// `initial_emissions` is the sector's emissions level at the start of the horizon, which
    /// the curve holds flat until the action start year. A piecewise curve that would itself
    /// exceed the total budget falls back to the linear shape; a linear curve exceeding the
    /// budget is an error.
    pub fn new(
        start_year: u32,
        end_year: u32,
        initial_emissions: Emissions,
        params: &CarbonBudgetParams,
    ) -> Result<Self> {
        ensure!(start_year < end_year, "Invalid model horizon");
        ensure!(
            params.action_start >= start_year && params.action_start < end_year,
            "Carbon budget action start year {} outside model horizon",
            params.action_start
        );

        let limits = match params.shape {
            BudgetShape::Linear => linear_curve(start_year, end_year, initial_emissions, params),
            BudgetShape::Piecewise => {
                let curve = piecewise_curve(start_year, end_year, initial_emissions, params);
                if curve_total(&curve).value() > params.total_budget {
                    linear_curve(start_year, end_year, initial_emissions, params)
                } else {
                    curve
                }
            }
        };

        let total = curve_total(&limits);
        ensure!(
            total.value() <= params.total_budget,
            "Annual emissions limits sum to {:.1} Mt, exceeding the total budget of {:.1} Mt",
            total.value(),
            params.total_budget
        );
        Ok(Self { limits, total })
    }

    /// The annual emissions limit for the given year
    pub fn annual_limit(&self, year: u32) -> Result<Emissions> {
        self.limits
            .get(&year)
            .copied()
            .with_context(|| format!("No emissions limit for year {year}"))
    }

    /// The annual limit for the final year of the horizon, used by residual-mode checks
    pub fn final_limit(&self) -> Emissions {
        *self
            .limits
            .last()
            .expect("carbon budget curve is never empty")
            .1
    }

    /// Cumulative emissions permitted over the whole horizon
    pub fn total(&self) -> Emissions {
        self.total
    }
}

fn curve_total(limits: &IndexMap<u32, Emissions>) -> Emissions {
    limits.values().copied().sum()
}

fn linear_curve(
    start_year: u32,
    end_year: u32,
    initial: Emissions,
    params: &CarbonBudgetParams,
) -> IndexMap<u32, Emissions> {
    let window = f64::from(end_year - params.action_start);
    (start_year..=end_year)
        .map(|year| {
            let limit = if year <= params.action_start {
                initial.value()
            } else {
                let progress = f64::from(year - params.action_start) / window;
                initial.value() + (params.end_value - initial.value()) * progress
            };
            (year, Emissions(limit))
        })
        .collect()
}

/// Steep decline to the halfway level over the first third of the action window, then linear to
/// the residual end value.
fn piecewise_curve(
    start_year: u32,
    end_year: u32,
    initial: Emissions,
    params: &CarbonBudgetParams,
) -> IndexMap<u32, Emissions> {
    let knee_year = params.action_start + (end_year - params.action_start) / 3;
    let knee_value = (initial.value() + params.end_value) / 2.0;
    (start_year..=end_year)
        .map(|year| {
            let limit = if year <= params.action_start {
                initial.value()
            } else if year <= knee_year {
                let progress =
                    f64::from(year - params.action_start) / f64::from(knee_year - params.action_start);
                initial.value() + (knee_value - initial.value()) * progress
            } else {
                let progress = f64::from(year - knee_year) / f64::from(end_year - knee_year);
                knee_value + (params.end_value - knee_value) * progress
            };
            (year, Emissions(limit))
        })
        .collect()
}
