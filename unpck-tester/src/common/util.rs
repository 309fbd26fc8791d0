use anyhow::{Context, Result};
use std::path::Path;

use unpck_game::Catalog;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse comma-separated seeds. Negative values wrap to their magnitude.
pub fn parse_seeds(s: &str) -> Result<Vec<u64>> {
    split_csv(s)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .or_else(|_| token.parse::<i64>().map(i64::unsigned_abs))
                .with_context(|| format!("invalid seed '{token}'"))
        })
        .collect()
}

/// Load a catalog from `path`, or the bundled one when no path is given.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::load_from_static());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let catalog = Catalog::from_json(&json)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    catalog
        .validate()
        .with_context(|| format!("invalid catalog {}", path.display()))?;
    Ok(catalog)
}
