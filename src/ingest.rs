//! Loading raw price tables
//!
//! Daily series from the data vendor use numbered column names (`1. open`,
//! `2. high`, …). They are renamed to the canonical `Open/High/Low/Close/Volume`
//! and, for crypto series, `Market Cap`.

use crate::error::{FeatureError, Result};
use crate::indicators::RAW_DATE;
use crate::table::{normalize_dates, rename_if_present};
use crate::types::{CLOSE, DATE, HIGH, LOW, MARKET_CAP, OPEN, VOLUME};
use csv::ReaderBuilder;
use polars::prelude::*;
use std::path::Path;

const VENDOR_COLUMNS: [(&str, &str); 6] = [
    (RAW_DATE, DATE),
    ("1. open", OPEN),
    ("2. high", HIGH),
    ("3. low", LOW),
    ("4. close", CLOSE),
    ("5. volume", VOLUME),
];

const VENDOR_MARKET_CAP: &str = "6. market cap (USD)";

/// Rename vendor columns to canonical names; absent columns are skipped
pub fn rename_vendor_columns(df: DataFrame, crypto: bool) -> Result<DataFrame> {
    let mut df = df;
    for (old, new) in VENDOR_COLUMNS {
        df = rename_if_present(df, old, new)?;
    }
    if crypto {
        df = rename_if_present(df, VENDOR_MARKET_CAP, MARKET_CAP)?;
    }
    Ok(df)
}

/// Read a CSV file with a date column
///
/// The column whose header is `date` in any case is kept as text under the
/// name `date`. Every other column is parsed as floats, or as booleans when
/// all of its cells are `true`/`false`; empty cells are missing.
pub fn read_csv_table(path: &Path) -> Result<DataFrame> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = rdr.headers()?.clone();

    let date_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(RAW_DATE))
        .ok_or_else(|| FeatureError::MissingColumn(format!("{} in {}", RAW_DATE, path.display())))?;

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for result in rdr.records() {
        let record = result?;
        for (idx, field) in record.iter().enumerate() {
            let field = field.trim();
            if let Some(column) = cells.get_mut(idx) {
                column.push((!field.is_empty()).then(|| field.to_string()));
            }
        }
    }

    let mut columns = Vec::with_capacity(headers.len());
    for (idx, (name, column)) in headers.iter().zip(cells).enumerate() {
        if idx == date_idx {
            columns.push(Series::new(RAW_DATE, column));
        } else {
            columns.push(parse_column(name.trim(), &column, path)?);
        }
    }

    Ok(DataFrame::new(columns)?)
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Floats, falling back to booleans for flag columns
fn parse_column(name: &str, cells: &[Option<String>], path: &Path) -> Result<Series> {
    let floats: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(text) => text.parse::<f64>().ok().map(Some),
        })
        .collect();
    if let Some(values) = floats {
        return Ok(Series::new(name, values));
    }

    let flags: Option<Vec<Option<bool>>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(text) => parse_bool(text).map(Some),
        })
        .collect();
    if let Some(values) = flags {
        return Ok(Series::new(name, values));
    }

    // report a cell that is neither, or else the first non-number
    let bad = |accept_bool: bool| {
        cells.iter().enumerate().find_map(|(row, cell)| {
            let text = cell.as_deref()?;
            let ok = text.parse::<f64>().is_ok() || (accept_bool && parse_bool(text).is_some());
            (!ok).then_some((row, text))
        })
    };
    let (row, text) = bad(true).or_else(|| bad(false)).unwrap_or((0, ""));
    Err(FeatureError::DataError(format!(
        "invalid number '{}' in column '{}' at line {} of {}",
        text,
        name,
        row + 2,
        path.display()
    )))
}

/// Load a price table from a vendor or canonical CSV export
///
/// Rows keep the file order; `Date` is normalized to a date column.
pub fn load_price_csv(path: &Path, crypto: bool) -> Result<DataFrame> {
    let raw = read_csv_table(path)?;
    let df = rename_vendor_columns(raw, crypto)?;
    let df = normalize_dates(df, DATE)?;
    log::debug!("Loaded {} price rows from {}", df.height(), path.display());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{f64_values, has_column};
    use std::fs;

    #[test]
    fn test_rename_vendor_columns() {
        let df = DataFrame::new(vec![
            Series::new("date", &["2020-01-02"]),
            Series::new("1. open", &[1.0]),
            Series::new("4. close", &[2.0]),
            Series::new("6. market cap (USD)", &[3.0]),
        ])
        .unwrap();

        let stock = rename_vendor_columns(df.clone(), false).unwrap();
        assert_eq!(stock.get_column_names(), vec!["Date", "Open", "Close", "6. market cap (USD)"]);

        let crypto = rename_vendor_columns(df, true).unwrap();
        assert!(has_column(&crypto, MARKET_CAP));
    }

    #[test]
    fn test_load_vendor_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AMZN.csv");
        fs::write(
            &path,
            "date,1. open,2. high,3. low,4. close,5. volume\n\
             2020-01-03,10,11,9,10.5,1000\n\
             2020-01-02,9,10,8,9.5,\n",
        )
        .unwrap();

        let df = load_price_csv(&path, false).unwrap();

        assert_eq!(df.column(DATE).unwrap().dtype(), &DataType::Date);
        assert_eq!(f64_values(&df, CLOSE).unwrap(), vec![Some(10.5), Some(9.5)]);
        assert_eq!(f64_values(&df, VOLUME).unwrap(), vec![Some(1000.0), None]);
    }

    #[test]
    fn test_bad_number_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "Date,Close\n2020-01-02,1.0\n2020-01-03,abc\n").unwrap();

        match load_price_csv(&path, false) {
            Err(FeatureError::DataError(message)) => assert!(message.contains("line 3")),
            other => panic!("expected a data error, got {:?}", other.map(|df| df.height())),
        }
    }

    #[test]
    fn test_reload_written_feature_table() {
        use crate::metadata::FeatureMetadata;
        use crate::table::from_bars;
        use crate::transforms::add_datepart;
        use crate::types::Bar;
        use chrono::{Duration, NaiveDate};

        let start = NaiveDate::from_ymd_opt(2020, 1, 29).unwrap();
        let bars: Vec<Bar> = (0..5)
            .map(|i| Bar::new(start + Duration::days(i), 10.0, 11.0, 9.0, 10.0 + i as f64, 100.0))
            .collect();
        let (mut features, _) = add_datepart(from_bars(&bars).unwrap(), FeatureMetadata::new(), DATE).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        let mut file = fs::File::create(&path).unwrap();
        CsvWriter::new(&mut file).include_header(true).finish(&mut features).unwrap();

        let df = load_price_csv(&path, false).unwrap();

        assert_eq!(df.shape(), features.shape());
        assert_eq!(df.column(DATE).unwrap().dtype(), &DataType::Date);
        let month_end: Vec<Option<bool>> = df.column("Is_month_end").unwrap().bool().unwrap().into_iter().collect();
        // 2020-01-31 is the third row
        assert_eq!(month_end, vec![Some(false), Some(false), Some(true), Some(false), Some(false)]);
        assert_eq!(f64_values(&df, CLOSE).unwrap()[4], Some(14.0));
        assert_eq!(f64_values(&df, "Year").unwrap()[4], Some(2020.0));
    }

    #[test]
    fn test_mixed_text_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.csv");
        fs::write(&path, "Date,Flag\n2020-01-02,true\n2020-01-03,maybe\n").unwrap();

        match load_price_csv(&path, false) {
            Err(FeatureError::DataError(message)) => {
                assert!(message.contains("'maybe'"));
                assert!(message.contains("line 3"));
            }
            other => panic!("expected a data error, got {:?}", other.map(|df| df.height())),
        }
    }

    #[test]
    fn test_missing_date_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodate.csv");
        fs::write(&path, "Close\n1.0\n").unwrap();

        assert!(matches!(load_price_csv(&path, false), Err(FeatureError::MissingColumn(_))));
    }
}
