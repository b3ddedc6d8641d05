//! Donation history table scan.
//!
//! Finds the first table that talks about donations and has a header row
//! with a date column and an amount column, then collects the rows after the
//! header until the table ends. Synchronous, since `scraper` types are
//! `!Send`.

use super::text::{collapse_whitespace, first_number};
use bonus_plan::DonationRecord;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use scraper::{ElementRef, Html, Selector};

const DATE_HEADERS: &[&str] = &["date", "when", "time"];
const AMOUNT_HEADERS: &[&str] = &["amount", "points", "donated", "bonus"];
const TABLE_HINTS: &[&str] = &["donat", "millionaire"];

/// Header row position plus the date and amount column indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderRow {
    row: usize,
    date_col: usize,
    amount_col: usize,
}

/// Read donation rows from the page HTML, in table order.
pub fn read_donation_history(html: &str) -> Vec<DonationRecord> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").expect("table selector is valid");

    for table in document.select(&table_sel) {
        let text = element_text(&table).to_lowercase();
        if !TABLE_HINTS.iter().any(|hint| text.contains(hint)) {
            continue;
        }
        let rows = table_rows(&table);
        let Some(header) = find_header(&rows) else {
            continue;
        };
        let records = collect_rows(&rows, header);
        if !records.is_empty() {
            tracing::debug!(rows = records.len(), "donation history table found");
            return records;
        }
    }
    Vec::new()
}

fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn table_rows(table: &ElementRef<'_>) -> Vec<Vec<String>> {
    let row_sel = Selector::parse("tr").expect("row selector is valid");
    let cell_sel = Selector::parse("th, td").expect("cell selector is valid");
    table
        .select(&row_sel)
        .map(|row| row.select(&cell_sel).map(|cell| element_text(&cell)).collect())
        .collect()
}

fn find_header(rows: &[Vec<String>]) -> Option<HeaderRow> {
    rows.iter().enumerate().find_map(|(row, cells)| {
        let column = |names: &[&str]| {
            cells.iter().position(|cell| {
                let cell = cell.to_lowercase();
                names.iter().any(|name| cell.contains(name))
            })
        };
        let date_col = column(DATE_HEADERS)?;
        let amount_col = column(AMOUNT_HEADERS)?;
        (date_col != amount_col).then_some(HeaderRow {
            row,
            date_col,
            amount_col,
        })
    })
}

fn collect_rows(rows: &[Vec<String>], header: HeaderRow) -> Vec<DonationRecord> {
    rows.iter()
        .skip(header.row + 1)
        .filter_map(|cells| {
            let date = cells.get(header.date_col)?;
            if date.is_empty() || date.to_lowercase().contains("total") {
                return None;
            }
            let amount = first_number(cells.get(header.amount_col)?)?;
            Some(DonationRecord {
                date: normalize_date(date),
                amount,
            })
        })
        .collect()
}

/// RFC 3339 when the cell parses as a timestamp, the raw text otherwise.
pub fn normalize_date(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return parsed
                .and_utc()
                .to_rfc3339_opts(SecondsFormat::Secs, true);
        }
    }
    raw.to_string()
}
