//! Location lookup command handlers.

use std::path::Path;

use anyhow::Result;
use rently_core::api::ApiClient;
use rently_core::config::Config;
use rently_core::locations::LocationIndex;

pub async fn districts(config: &Config, file: Option<&Path>) -> Result<()> {
    let index = load_index(config, file).await?;
    if index.is_empty() {
        println!("No districts found.");
        return Ok(());
    }

    for district in index.districts() {
        println!("{district}");
    }
    Ok(())
}

pub async fn cities(config: &Config, district: &str, file: Option<&Path>) -> Result<()> {
    let index = load_index(config, file).await?;
    match index.cities(district) {
        Some(cities) => {
            for city in cities {
                println!("{city}");
            }
            Ok(())
        }
        None => anyhow::bail!("Unknown district: {district}"),
    }
}

/// Resolution order: explicit --file, configured locations_path, then a
/// fetch from the serving origin.
async fn load_index(config: &Config, file: Option<&Path>) -> Result<LocationIndex> {
    if let Some(path) = file {
        return LocationIndex::from_path(path);
    }
    if let Some(path) = config.locations_path.as_deref() {
        return LocationIndex::from_path(Path::new(path));
    }

    let api = ApiClient::from_config(config)?;
    LocationIndex::fetch(&api)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to fetch location data: {e}"))
}
