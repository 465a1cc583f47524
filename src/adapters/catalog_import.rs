//! Bulk cryptocurrency catalog import from a JSON `{"SYMBOL": "Name"}` object.

use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::cryptocurrency::Cryptocurrency;
use crate::domain::error::PortfolioError;
use crate::ports::store_port::PortfolioStore;

/// Inserts every symbol not already in the catalog and returns how many were
/// added. The whole file is validated before anything is written.
pub fn import_cryptocurrencies(
    store: &dyn PortfolioStore,
    path: &Path,
) -> Result<usize, PortfolioError> {
    let file = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| PortfolioError::Import {
        file: file.clone(),
        reason: e.to_string(),
    })?;
    let entries: BTreeMap<String, String> =
        serde_json::from_str(&content).map_err(|e| PortfolioError::Import {
            file: file.clone(),
            reason: e.to_string(),
        })?;

    let coins = entries
        .iter()
        .map(|(symbol, name)| {
            Cryptocurrency::new(symbol, name).map_err(|e| PortfolioError::Import {
                file: file.clone(),
                reason: format!("{symbol}: {e}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut imported = 0;
    for coin in &coins {
        if store.insert_cryptocurrency_if_absent(coin)? {
            imported += 1;
        } else {
            tracing::debug!(symbol = %coin.symbol, "skipping existing cryptocurrency");
        }
    }
    tracing::info!(file = %file, imported, total = coins.len(), "catalog import finished");
    Ok(imported)
}
