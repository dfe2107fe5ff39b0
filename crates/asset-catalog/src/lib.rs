use scanner_core::{AssetCategory, Instrument, Market, ScannerError};
use std::path::Path;

/// Files the loader looks for in a catalog directory, with the market and
/// category their rows belong to.
pub const CATALOG_SOURCES: &[(&str, Market, AssetCategory)] = &[
    ("equities.csv", Market::Domestic, AssetCategory::Equity),
    (
        "real_estate_funds.csv",
        Market::Domestic,
        AssetCategory::RealEstateFund,
    ),
    ("etfs.csv", Market::Domestic, AssetCategory::Etf),
    (
        "depositary_receipts.csv",
        Market::Domestic,
        AssetCategory::DepositaryReceipt,
    ),
];

/// The instrument universe for one session
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    instruments: Vec<Instrument>,
}

impl AssetCatalog {
    /// Load every known catalog file under `dir`. A missing file leaves its
    /// category empty; a ticker listed twice keeps its first row.
    pub fn load_dir(dir: &Path) -> Result<AssetCatalog, ScannerError> {
        let mut instruments = Vec::new();

        for &(file, market, category) in CATALOG_SOURCES {
            let path = dir.join(file);
            if !path.exists() {
                tracing::debug!("no catalog file {}", path.display());
                continue;
            }
            let data = std::fs::read_to_string(&path).map_err(|e| {
                ScannerError::CatalogError(format!("{}: {}", path.display(), e))
            })?;
            instruments.extend(parse_entries(&data, market, category)?);
        }

        Ok(AssetCatalog::from_instruments(instruments))
    }

    pub fn from_instruments(instruments: Vec<Instrument>) -> AssetCatalog {
        AssetCatalog {
            instruments: dedupe_by_ticker(instruments),
        }
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Case-insensitive lookup by ticker
    pub fn get(&self, ticker: &str) -> Option<&Instrument> {
        self.instruments
            .iter()
            .find(|i| i.ticker.eq_ignore_ascii_case(ticker))
    }

    /// Instruments restricted to the given categories (empty means all)
    pub fn filter(&self, categories: &[AssetCategory]) -> Vec<Instrument> {
        self.instruments
            .iter()
            .filter(|i| categories.is_empty() || categories.contains(&i.category))
            .cloned()
            .collect()
    }

    /// Instruments whose ticker or name contains the query, restricted to
    /// the given categories (empty means all).
    pub fn search(&self, query: &str, categories: &[AssetCategory]) -> Vec<Instrument> {
        let needle = query.to_lowercase();
        self.instruments
            .iter()
            .filter(|i| categories.is_empty() || categories.contains(&i.category))
            .filter(|i| {
                i.ticker.to_lowercase().contains(&needle)
                    || i.name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Instruments per category, in catalog order
    pub fn counts(&self) -> Vec<(AssetCategory, usize)> {
        AssetCategory::all()
            .into_iter()
            .map(|category| {
                let count = self
                    .instruments
                    .iter()
                    .filter(|i| i.category == category)
                    .count();
                (category, count)
            })
            .collect()
    }
}

/// Parse catalog rows. The first column is the ticker, the second the name;
/// extra columns are ignored and rows without a ticker are skipped.
pub fn parse_entries(
    data: &str,
    market: Market,
    category: AssetCategory,
) -> Result<Vec<Instrument>, ScannerError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ScannerError::CatalogError(e.to_string()))?;
        let ticker = record.get(0).unwrap_or("").trim().to_uppercase();
        let name = record.get(1).unwrap_or("").trim().to_string();

        if ticker.is_empty() {
            continue;
        }

        rows.push(Instrument {
            name: if name.is_empty() { ticker.clone() } else { name },
            ticker,
            market,
            category,
        });
    }

    Ok(rows)
}

fn dedupe_by_ticker(instruments: Vec<Instrument>) -> Vec<Instrument> {
    let mut seen: Vec<String> = Vec::with_capacity(instruments.len());
    let mut unique = Vec::with_capacity(instruments.len());
    for instrument in instruments {
        if seen.iter().any(|t| t.eq_ignore_ascii_case(&instrument.ticker)) {
            continue;
        }
        seen.push(instrument.ticker.clone());
        unique.push(instrument);
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    const EQUITIES: &str = "\
ticker,name,sector
PETR4,Petrobras PN,Energy
VALE3,Vale ON,Materials
 itub4 ,Itau Unibanco PN,Financials
,,
";

    const FUNDS: &str = "\
ticker,name
HGLG11,CSHG Logistica
PETR4,Duplicated Ticker
";

    #[test]
    fn test_parse_entries() {
        let rows =
            parse_entries(EQUITIES, Market::Domestic, AssetCategory::Equity).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].ticker, "PETR4");
        assert_eq!(rows[0].name, "Petrobras PN");
        assert_eq!(rows[0].category, AssetCategory::Equity);
        // tickers come out trimmed and uppercased
        assert_eq!(rows[2].ticker, "ITUB4");
    }

    #[test]
    fn test_parse_entries_name_falls_back_to_ticker() {
        let rows = parse_entries(
            "ticker,name\nBOVA11,\n",
            Market::Domestic,
            AssetCategory::Etf,
        )
        .unwrap();
        assert_eq!(rows[0].name, "BOVA11");
    }

    fn sample_catalog() -> AssetCatalog {
        let mut instruments =
            parse_entries(EQUITIES, Market::Domestic, AssetCategory::Equity).unwrap();
        instruments.extend(
            parse_entries(FUNDS, Market::Domestic, AssetCategory::RealEstateFund)
                .unwrap(),
        );
        AssetCatalog::from_instruments(instruments)
    }

    #[test]
    fn test_dedupe_keeps_first_category() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 4);
        let petr = catalog.get("petr4").unwrap();
        assert_eq!(petr.category, AssetCategory::Equity);
    }

    #[test]
    fn test_filter_and_counts() {
        let catalog = sample_catalog();

        let funds = catalog.filter(&[AssetCategory::RealEstateFund]);
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].ticker, "HGLG11");

        let all = catalog.filter(&[]);
        assert_eq!(all.len(), catalog.len());

        let counts = catalog.counts();
        assert!(counts.contains(&(AssetCategory::Equity, 3)));
        assert!(counts.contains(&(AssetCategory::RealEstateFund, 1)));
        assert!(counts.contains(&(AssetCategory::Etf, 0)));
    }

    #[test]
    fn test_search() {
        let catalog = sample_catalog();

        let by_name = catalog.search("vale", &[]);
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].ticker, "VALE3");

        let wrong_category = catalog.search("vale", &[AssetCategory::Etf]);
        assert!(wrong_category.is_empty());
    }
}
