//! The module responsible for writing output data to disk.
use crate::asset::AssetStack;
use crate::emissions::StackEmissions;
use crate::pathway::SimulationPathway;
use crate::region::RegionID;
use crate::technology::{ProductID, TechnologyID};
use crate::transition::TransitionRegistry;
use anyhow::{Context, Result};
use csv;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "pathsim_results";

/// The output file name for the per-year fleet snapshots
const ASSETS_FILE_NAME: &str = "assets.csv";

/// The output file name for the transition log
const TRANSITIONS_FILE_NAME: &str = "transitions.csv";

/// The output file name for per-year stack emissions
const EMISSIONS_FILE_NAME: &str = "emissions.csv";

/// Get the output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model specified at `model_dir`.
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        // already exists
        return Ok(());
    }

    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// Represents an asset in the assets output CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct AssetRow {
    year: u32,
    product: ProductID,
    region: RegionID,
    technology: TechnologyID,
    commission_year: u32,
    capacity: f64,
    cuf: f64,
    retrofitted: bool,
    rebuilt: bool,
    newly_built: bool,
}

impl AssetRow {
    /// Create a new [`AssetRow`]
    fn new(year: u32, asset: &crate::asset::Asset) -> Self {
        Self {
            year,
            product: asset.product.clone(),
            region: asset.region.clone(),
            technology: asset.technology.clone(),
            commission_year: asset.commission_year,
            capacity: asset.capacity.value(),
            cuf: asset.cuf.0,
            retrofitted: asset.retrofitted,
            rebuilt: asset.rebuilt,
            newly_built: asset.newly_built,
        }
    }
}

/// Represents a row in the emissions output CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct EmissionsRow {
    year: u32,
    product: ProductID,
    co2_scope1: f64,
    co2_scope2: f64,
    co2_scope3_upstream: f64,
    co2_captured: f64,
}

/// An object for writing simulation results to file
pub struct DataWriter {
    assets_writer: csv::Writer<File>,
    transitions_writer: csv::Writer<File>,
    emissions_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            assets_writer: new_writer(ASSETS_FILE_NAME)?,
            transitions_writer: new_writer(TRANSITIONS_FILE_NAME)?,
            emissions_writer: new_writer(EMISSIONS_FILE_NAME)?,
        })
    }

    /// Write one year's fleet snapshot to the assets CSV file
    pub fn write_assets(&mut self, year: u32, stack: &AssetStack) -> Result<()> {
        for asset in stack.iter() {
            let row = AssetRow::new(year, asset);
            self.assets_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the transition log to a CSV file
    pub fn write_transitions(&mut self, transitions: &TransitionRegistry) -> Result<()> {
        for transition in transitions.iter() {
            self.transitions_writer.serialize(transition)?;
        }

        Ok(())
    }

    /// Write one year's stack emissions to the emissions CSV file
    pub fn write_emissions(
        &mut self,
        year: u32,
        product: &ProductID,
        emissions: &StackEmissions,
    ) -> Result<()> {
        let row = EmissionsRow {
            year,
            product: product.clone(),
            co2_scope1: emissions.co2_scope1.value(),
            co2_scope2: emissions.co2_scope2.value(),
            co2_scope3_upstream: emissions.co2_scope3_upstream.value(),
            co2_captured: emissions.co2_captured.value(),
        };
        self.emissions_writer.serialize(row)?;

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.assets_writer.flush()?;
        self.transitions_writer.flush()?;
        self.emissions_writer.flush()?;

        Ok(())
    }
}

/// Write all results for a completed run to `output_path`.
pub fn write_results(pathway: &SimulationPathway, output_path: &Path) -> Result<()> {
    let mut writer = DataWriter::create(output_path)?;

    let config = pathway.config();
    for year in config.start_year..=config.end_year {
        let stack = pathway.get_stack(year)?;
        writer.write_assets(year, stack)?;
        for product in &config.products {
            let emissions = stack.calculate_emissions(
                year,
                pathway.emission_factors(),
                None,
                Some(product),
            );
            writer.write_emissions(year, product, &emissions)?;
        }
    }
    writer.write_transitions(pathway.transitions())?;
    writer.flush()?;

    Ok(())
}
