//! Helpers shared by the integration tests.
use std::fs;
use std::path::Path;

/// Write a small but complete model to `dir`.
///
/// Two gas-fired assets serve a constant demand of 4 Mt with 3.8 Mt of production, so the
/// greenfield allocator must build one new asset and the brownfield allocator has switches
/// available every year.
pub fn write_model(dir: &Path) {
    fs::write(
        dir.join("scenario.toml"),
        r#"
            products = ["Ammonia"]
            start_year = 2025
            end_year = 2030
            pathway_kind = "fa"
            seed = 7
            standard_asset_capacity = 2.0
            cuf_lower_threshold = 0.6
            cuf_upper_threshold = 0.9
            investment_cycle = 15
            decommission_min_age = 10
            annual_renovation_share = 0.5
            constraints = ["emissions", "ramp_up"]
            log_level = "off"

            [carbon_budget]
            total_budget = 1000.0
            action_start = 2027
            end_value = 1.0
            shape = "linear"

            [rampup]
            shape = "exponential"
            initial_cap = 4
            growth_rate = 0.25
            window = 12
            peak_multiplier = 3.0
        "#,
    )
    .unwrap();

    fs::write(
        dir.join("initial_assets.csv"),
        "product,technology,region,commission_year,capacity,cuf,ppa_eligible\n\
         Ammonia,Natural Gas SMR,Europe,2010,2.0,0.95,\n\
         Ammonia,Natural Gas SMR,Europe,2012,2.0,0.95,\n",
    )
    .unwrap();

    let mut demand = String::from("product,region,year,demand\n");
    let mut technologies =
        String::from("product,region,technology,year,classification,lifetime,wacc,expected_maturity\n");
    let mut factors = String::from(
        "product,region,technology,year,co2_scope1,co2_scope2,co2_scope3_upstream,co2_captured\n",
    );
    let mut switches = String::from(
        "product,region,technology_origin,technology_destination,switch_type,year,cost,emissions_delta\n",
    );
    for year in 2025..=2030 {
        demand.push_str(&format!("Ammonia,Europe,{year},4.0\n"));
        technologies.push_str(&format!(
            "Ammonia,Europe,Natural Gas SMR,{year},initial,25,0.08,2020\n\
             Ammonia,Europe,Electrolyser,{year},end-state,30,0.08,2025\n"
        ));
        factors.push_str(&format!(
            "Ammonia,Europe,Natural Gas SMR,{year},1.8,0.2,0.4,0.0\n"
        ));
        if year > 2025 {
            switches.push_str(&format!(
                "Ammonia,Europe,Natural Gas SMR,Electrolyser,brownfield_renovation,{year},50.0,-1.8\n\
                 Ammonia,Europe,New-build,Electrolyser,greenfield,{year},55.0,-1.8\n"
            ));
        }
    }
    fs::write(dir.join("demand.csv"), demand).unwrap();
    fs::write(dir.join("technology_characteristics.csv"), technologies).unwrap();
    fs::write(dir.join("emission_factors.csv"), factors).unwrap();
    fs::write(dir.join("technology_switches.csv"), switches).unwrap();
}
