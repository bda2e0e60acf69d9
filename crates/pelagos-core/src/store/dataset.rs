use rusqlite::{Row, params, params_from_iter};

use crate::error::Result;
use crate::models::{
    AccommodationPrice, DepartureOption, PortRef, PriceOption, RouteFareBreakdown,
    SchedulePreference,
};

use super::FerryStore;

/// Athens is served by three ports; queries for "Athens" fan out to these.
pub const ATHENS_PORT_NAMES: [&str; 3] = ["piraeus", "rafina", "lavrio"];

const DEPARTURE_COLUMNS: &str = r"
    company, origin_port_name, destination_port_name,
    departure_time, arrival_time, duration
";

const DATE_FILTER: &str = r"
    AND ferry_route_id IN (
        SELECT ferry_route_id FROM schedules WHERE schedule_date = ?
    )
";

impl FerryStore {
    /// Distinct ports that appear on either end of a route.
    pub fn list_ports(&self) -> Result<Vec<PortRef>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT DISTINCT p.code, p.name
                FROM ports p
                JOIN ferry_routes r ON r.origin_port_id = p.id
                UNION
                SELECT DISTINCT p.code, p.name
                FROM ports p
                JOIN ferry_routes r ON r.destination_port_id = p.id
                ORDER BY name ASC
                ",
            )?;
            let rows = stmt.query_map([], port_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Ports matching a code (exact, case-folded) or a name fragment.
    pub fn find_ports(&self, needle: &str) -> Result<Vec<PortRef>> {
        let code = needle.trim().to_uppercase();
        let name_like = format!("%{}%", needle.trim().to_lowercase());
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT DISTINCT code, name
                FROM ports
                WHERE code = ?1 OR LOWER(name) LIKE ?2
                ORDER BY name ASC
                ",
            )?;
            let rows = stmt.query_map(params![code, name_like], port_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    pub fn direct_departures(
        &self,
        origin: &str,
        destination: &str,
        date: Option<&str>,
        preference: SchedulePreference,
        limit: usize,
    ) -> Result<Vec<DepartureOption>> {
        let order_clause = match preference {
            SchedulePreference::Earliest => "departure_time ASC, arrival_time ASC",
            SchedulePreference::Latest => "departure_time DESC",
            SchedulePreference::Shortest => "duration ASC",
        };
        let mut sql = format!(
            r"
            SELECT {DEPARTURE_COLUMNS}
            FROM route_details
            WHERE LOWER(origin_port_name) LIKE ?
              AND LOWER(destination_port_name) LIKE ?
            "
        );
        let mut binds = vec![like_token(origin), like_token(destination)];
        if let Some(date) = date {
            sql.push_str(DATE_FILTER);
            binds.push(date.to_string());
        }
        sql.push_str(&format!(" ORDER BY {order_clause} LIMIT {limit}"));
        self.query_departures(&sql, &binds)
    }

    /// Departures toward a destination from any of the Athens ports.
    pub fn direct_departures_from_athens(
        &self,
        destination: &str,
        date: Option<&str>,
        preference: SchedulePreference,
        limit: usize,
    ) -> Result<Vec<DepartureOption>> {
        let order_clause = match preference {
            SchedulePreference::Earliest => "departure_time ASC, arrival_time ASC",
            SchedulePreference::Latest => "departure_time DESC",
            SchedulePreference::Shortest => "duration ASC",
        };
        let mut sql = format!(
            r"
            SELECT {DEPARTURE_COLUMNS}
            FROM route_details
            WHERE LOWER(origin_port_name) IN ('piraeus', 'rafina', 'lavrio')
              AND LOWER(destination_port_name) LIKE ?
            "
        );
        let mut binds = vec![like_token(destination)];
        if let Some(date) = date {
            sql.push_str(DATE_FILTER);
            binds.push(date.to_string());
        }
        sql.push_str(&format!(" ORDER BY {order_clause} LIMIT {limit}"));
        self.query_departures(&sql, &binds)
    }

    /// Candidate first legs for a connection search.
    pub fn departures_from(&self, origin: &str, date: Option<&str>) -> Result<Vec<DepartureOption>> {
        let mut sql = format!(
            r"
            SELECT {DEPARTURE_COLUMNS}
            FROM route_details
            WHERE LOWER(origin_port_name) LIKE ?
            "
        );
        let mut binds = vec![like_token(origin)];
        if let Some(date) = date {
            sql.push_str(DATE_FILTER);
            binds.push(date.to_string());
        }
        self.query_departures(&sql, &binds)
    }

    /// Candidate second legs for a connection search.
    pub fn departures_to(
        &self,
        destination: &str,
        date: Option<&str>,
    ) -> Result<Vec<DepartureOption>> {
        let mut sql = format!(
            r"
            SELECT {DEPARTURE_COLUMNS}
            FROM route_details
            WHERE LOWER(destination_port_name) LIKE ?
            "
        );
        let mut binds = vec![like_token(destination)];
        if let Some(date) = date {
            sql.push_str(DATE_FILTER);
            binds.push(date.to_string());
        }
        self.query_departures(&sql, &binds)
    }

    pub fn cheapest_from_port(&self, origin: &str, limit: usize) -> Result<Vec<PriceOption>> {
        let sql = format!(
            r"
            SELECT rd.origin_port_name, rd.destination_port_name, rd.company,
                   v.name, MIN(s.indicative_price) AS price
            FROM route_details rd
            JOIN schedules s ON s.ferry_route_id = rd.ferry_route_id
            JOIN vessels v ON v.id = s.vessel_id
            WHERE LOWER(rd.origin_port_name) LIKE ?
              AND s.indicative_price > 0
            GROUP BY rd.route_id, v.id
            ORDER BY price ASC
            LIMIT {limit}
            "
        );
        self.query_prices(&sql, &[like_token(origin)])
    }

    pub fn cheapest_from_athens(&self, limit: usize) -> Result<Vec<PriceOption>> {
        let sql = format!(
            r"
            SELECT rd.origin_port_name, rd.destination_port_name, rd.company,
                   v.name, MIN(s.indicative_price) AS price
            FROM route_details rd
            JOIN schedules s ON s.ferry_route_id = rd.ferry_route_id
            JOIN vessels v ON v.id = s.vessel_id
            WHERE LOWER(rd.origin_port_name) IN ('piraeus', 'rafina', 'lavrio')
              AND s.indicative_price > 0
            GROUP BY rd.route_id, v.id
            ORDER BY price ASC
            LIMIT {limit}
            "
        );
        self.query_prices(&sql, &[])
    }

    /// Per-vessel fares for a port pair, cheapest first, each with its
    /// accommodation breakdown.
    pub fn fare_breakdowns(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Vec<RouteFareBreakdown>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT rd.ferry_route_id, rd.company, rd.departure_time, rd.arrival_time,
                       v.id, v.name, MIN(s.indicative_price) AS price
                FROM route_details rd
                JOIN schedules s ON s.ferry_route_id = rd.ferry_route_id
                JOIN vessels v ON v.id = s.vessel_id
                WHERE LOWER(rd.origin_port_name) LIKE ?1
                  AND LOWER(rd.destination_port_name) LIKE ?2
                  AND s.indicative_price > 0
                GROUP BY rd.ferry_route_id, v.id
                ORDER BY price ASC
                ",
            )?;
            let rows = stmt.query_map(
                params![like_token(origin), like_token(destination)],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(4)?,
                        RouteFareBreakdown {
                            company: row.get(1)?,
                            vessel: row.get(5)?,
                            departure_time: row.get(2)?,
                            arrival_time: row.get(3)?,
                            base_price_cents: row.get(6)?,
                            accommodations: Vec::new(),
                        },
                    ))
                },
            )?;
            let mut keyed = Vec::new();
            for row in rows {
                keyed.push(row?);
            }

            let mut accom_stmt = conn.prepare(
                r"
                SELECT code, name, price
                FROM accommodations
                WHERE ferry_route_id = ?1 AND vessel_id = ?2 AND price > 0
                ORDER BY price ASC
                ",
            )?;
            let mut out = Vec::new();
            for (ferry_route_id, vessel_id, mut breakdown) in keyed {
                let accom_rows =
                    accom_stmt.query_map(params![ferry_route_id, vessel_id], |row| {
                        Ok(AccommodationPrice {
                            code: row.get(0)?,
                            name: row.get(1)?,
                            price_cents: row.get(2)?,
                        })
                    })?;
                for accom in accom_rows {
                    breakdown.accommodations.push(accom?);
                }
                out.push(breakdown);
            }
            Ok(out)
        })
    }

    /// Destinations ranked by how many distinct routes serve them.
    pub fn destination_connectivity(&self, limit: usize) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                r"
                SELECT destination_port_name, COUNT(DISTINCT route_id) AS connection_count
                FROM route_details
                GROUP BY destination_port_name
                ORDER BY connection_count DESC
                LIMIT {limit}
                "
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    pub fn connection_count(&self, origin: &str, destination: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                r"
                SELECT COUNT(DISTINCT route_id)
                FROM route_details
                WHERE LOWER(origin_port_name) LIKE ?1
                  AND LOWER(destination_port_name) LIKE ?2
                ",
                params![like_token(origin), like_token(destination)],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Current service between two ports: company, port pair, and how many
    /// distinct dates it is scheduled on.
    pub fn current_route_summary(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Vec<(String, String, String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT rd.company, rd.origin_port_name, rd.destination_port_name,
                       COUNT(DISTINCT s.schedule_date) AS scheduled_days
                FROM route_details rd
                JOIN schedules s ON s.ferry_route_id = rd.ferry_route_id
                WHERE (LOWER(rd.origin_port_name) LIKE ?1 OR rd.origin_port_code = ?2)
                  AND (LOWER(rd.destination_port_name) LIKE ?3 OR rd.destination_port_code = ?4)
                GROUP BY rd.company, rd.origin_port_name, rd.destination_port_name
                ",
            )?;
            let rows = stmt.query_map(
                params![
                    like_token(origin),
                    origin.trim().to_uppercase(),
                    like_token(destination),
                    destination.trim().to_uppercase()
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    fn query_departures(&self, sql: &str, binds: &[String]) -> Result<Vec<DepartureOption>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params_from_iter(binds.iter()), departure_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    fn query_prices(&self, sql: &str, binds: &[String]) -> Result<Vec<PriceOption>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params_from_iter(binds.iter()), |row| {
                Ok(PriceOption {
                    origin_port: row.get(0)?,
                    destination_port: row.get(1)?,
                    company: row.get(2)?,
                    vessel: row.get(3)?,
                    price_cents: row.get(4)?,
                })
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }
}

fn like_token(raw: &str) -> String {
    format!("%{}%", raw.trim().to_lowercase())
}

fn port_from_row(row: &Row<'_>) -> rusqlite::Result<PortRef> {
    Ok(PortRef {
        code: row.get(0)?,
        name: row.get(1)?,
    })
}

fn departure_from_row(row: &Row<'_>) -> rusqlite::Result<DepartureOption> {
    Ok(DepartureOption {
        company: row.get(0)?,
        origin_port: row.get(1)?,
        destination_port: row.get(2)?,
        departure_time: row.get(3)?,
        arrival_time: row.get(4)?,
        duration_minutes: row.get(5)?,
    })
}
