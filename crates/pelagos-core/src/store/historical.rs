use rusqlite::{Row, params};

use crate::error::Result;
use crate::models::HistoricalRange;

use super::FerryStore;

impl FerryStore {
    pub fn replace_historical(&self, ranges: &[HistoricalRange]) -> Result<usize> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM historical_date_ranges", [])?;
            let mut stmt = tx.prepare(
                r"
                INSERT INTO historical_date_ranges(
                    origin_code, origin_name, destination_code, destination_name,
                    start_date, end_date, appear_date
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )?;
            for range in ranges {
                stmt.execute(params![
                    range.origin_code,
                    range.origin_name,
                    range.destination_code,
                    range.destination_name,
                    range.start_date,
                    range.end_date,
                    range.appear_date,
                ])?;
            }
            Ok(ranges.len())
        })
    }

    /// Looks up past or announced service windows for a port pair: exact
    /// match first, then LIKE, then the reverse direction.
    pub fn find_historical_routes(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Vec<HistoricalRange>> {
        let origin = origin.trim().to_lowercase();
        let destination = destination.trim().to_lowercase();
        let exact = self.query_historical(
            "LOWER(origin_name) = ?1 AND LOWER(destination_name) = ?2",
            &origin,
            &destination,
        )?;
        if !exact.is_empty() {
            return Ok(exact);
        }
        let fuzzy = self.query_historical(
            "LOWER(origin_name) LIKE ?1 AND LOWER(destination_name) LIKE ?2",
            &format!("%{origin}%"),
            &format!("%{destination}%"),
        )?;
        if !fuzzy.is_empty() {
            return Ok(fuzzy);
        }
        self.query_historical(
            "LOWER(origin_name) LIKE ?1 AND LOWER(destination_name) LIKE ?2",
            &format!("%{destination}%"),
            &format!("%{origin}%"),
        )
    }

    fn query_historical(
        &self,
        predicate: &str,
        first: &str,
        second: &str,
    ) -> Result<Vec<HistoricalRange>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                r"
                SELECT origin_code, origin_name, destination_code, destination_name,
                       start_date, end_date, appear_date
                FROM historical_date_ranges
                WHERE {predicate}
                ORDER BY start_date ASC
                "
            ))?;
            let rows = stmt.query_map(params![first, second], historical_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }
}

fn historical_from_row(row: &Row<'_>) -> rusqlite::Result<HistoricalRange> {
    Ok(HistoricalRange {
        origin_code: row.get(0)?,
        origin_name: row.get(1)?,
        destination_code: row.get(2)?,
        destination_name: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        appear_date: row.get(6)?,
    })
}
