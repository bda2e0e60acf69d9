//! Deterministic query tools over the ferry dataset. These back the
//! specialist answers directly, short-circuit the language model for
//! recognizable question shapes, and keep the chat surface working when the
//! model is disabled or unreachable.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use chrono::{Duration, Local, NaiveDate};
use tracing::info;

use crate::error::Result;
use crate::formatter::{format_duration, format_euros};
use crate::models::{AgentKind, ConnectionOption, IslandSuggestion, PortRef, SchedulePreference};
use crate::store::{ATHENS_PORT_NAMES, FerryStore};

/// Spellings that mean "Athens" and fan out to the three Attica ports.
pub const ATHENS_ALIASES: [&str; 4] = ["athens", "athina", "αθήνα", "αθηνα"];

/// Shortest transfer accepted when chaining two legs through a port.
pub const MIN_TRANSFER_MINUTES: i64 = 60;

const DEFAULT_RESULT_LIMIT: usize = 5;
const CONNECTION_DISPLAY_LIMIT: usize = 3;

const ORIGIN_CUES: [&str; 4] = ["from", "starting at", "departing from", "leaving from"];
const DEST_CUES: [&str; 5] = ["to", "going to", "arriving at", "arriving in", "destination"];

/// Filler words trimmed off the end of an extracted place name.
const PLACE_NOISE: [&str; 14] = [
    "cost", "costs", "price", "prices", "fare", "fares", "ticket", "tickets", "please", "today",
    "tomorrow", "routes", "ferries", "ferry",
];

#[must_use]
pub fn is_athens(place: &str) -> bool {
    let lower = place.trim().to_lowercase();
    ATHENS_ALIASES.iter().any(|alias| *alias == lower)
}

fn mentions_athens(text: &str) -> bool {
    let lower = text.to_lowercase();
    ATHENS_ALIASES
        .iter()
        .any(|alias| find_word(&lower, alias).is_some())
}

/// An island group with its member islands, characteristic tags, and
/// combinations that travel well together.
#[derive(Debug)]
pub struct IslandGroup {
    pub name: &'static str,
    pub islands: &'static [&'static str],
    pub traits: &'static [&'static str],
    pub combinations: &'static [&'static [&'static str]],
}

pub static ISLAND_GROUPS: [IslandGroup; 6] = [
    IslandGroup {
        name: "Cyclades",
        islands: &[
            "MYKONOS",
            "SANTORINI",
            "NAXOS",
            "PAROS",
            "MILOS",
            "SYROS",
            "AMORGOS",
            "SIFNOS",
            "FOLEGANDROS",
            "IOS",
            "TINOS",
            "SERIFOS",
            "KYTHNOS",
        ],
        traits: &["beaches", "nightlife", "scenic", "popular", "traditional"],
        combinations: &[
            &["MYKONOS", "PAROS", "NAXOS"],
            &["SANTORINI", "NAXOS", "PAROS"],
            &["MILOS", "SIFNOS", "SERIFOS"],
            &["SYROS", "TINOS", "MYKONOS"],
            &["NAXOS", "IOS", "SANTORINI"],
            &["PAROS", "ANTIPAROS", "NAXOS"],
        ],
    },
    IslandGroup {
        name: "Dodecanese",
        islands: &[
            "RHODES", "KOS", "PATMOS", "LEROS", "KALYMNOS", "SYMI", "TILOS", "NISYROS",
        ],
        traits: &["history", "culture", "beaches", "quiet"],
        combinations: &[
            &["RHODES", "SYMI"],
            &["KOS", "KALYMNOS", "PATMOS"],
            &["RHODES", "KOS", "SYMI"],
            &["PATMOS", "LEROS", "KALYMNOS"],
        ],
    },
    IslandGroup {
        name: "Saronic",
        islands: &["AEGINA", "HYDRA", "POROS", "SPETSES", "AGISTRI"],
        traits: &["proximity", "day trips", "quiet", "culture"],
        combinations: &[
            &["HYDRA", "SPETSES", "POROS"],
            &["AEGINA", "AGISTRI", "POROS"],
            &["POROS", "HYDRA"],
        ],
    },
    IslandGroup {
        name: "Sporades",
        islands: &["SKIATHOS", "SKOPELOS", "ALONNISOS"],
        traits: &["green", "beaches", "nature"],
        combinations: &[
            &["SKIATHOS", "SKOPELOS"],
            &["SKIATHOS", "SKOPELOS", "ALONNISOS"],
        ],
    },
    IslandGroup {
        name: "Ionian",
        islands: &["CORFU", "KEFALONIA", "ZANTE", "ITHACA", "PAXOS"],
        traits: &["green", "beaches", "scenic", "culture"],
        combinations: &[
            &["CORFU", "PAXOS"],
            &["KEFALONIA", "ITHACA"],
            &["CORFU", "KEFALONIA", "ZANTE"],
        ],
    },
    IslandGroup {
        name: "North Aegean",
        islands: &["LESVOS", "CHIOS", "SAMOS", "IKARIA", "LIMNOS"],
        traits: &["quiet", "traditional", "nature"],
        combinations: &[&["CHIOS", "LESVOS"], &["SAMOS", "IKARIA"]],
    },
];

#[must_use]
pub fn group_for_island(destination: &str) -> Option<&'static IslandGroup> {
    let upper = destination.to_uppercase();
    ISLAND_GROUPS
        .iter()
        .find(|group| group.islands.iter().any(|island| upper.contains(island)))
}

/// Cheapest fares leaving a port, one line block per route.
pub fn cheapest_from(store: &FerryStore, origin: &str, limit: usize) -> Result<String> {
    info!(origin = %origin, limit, "finding cheapest routes");
    let options = if is_athens(origin) {
        store.cheapest_from_athens(limit)?
    } else {
        store.cheapest_from_port(origin, limit)?
    };
    if options.is_empty() {
        return Ok(format!(
            "No routes found departing from {origin} with price information."
        ));
    }

    let mut response = format!("The cheapest ferry routes from {origin} are:\n\n");
    for (i, option) in options.iter().enumerate() {
        response.push_str(&format!(
            "{}. {} to {}\n",
            i + 1,
            option.origin_port,
            option.destination_port
        ));
        response.push_str(&format!("   Company: {}\n", option.company));
        response.push_str(&format!(
            "   Price: {}\n\n",
            format_euros(option.price_cents)
        ));
    }
    Ok(response)
}

/// Per-vessel fare comparison for a port pair, with accommodation options.
pub fn compare_prices(store: &FerryStore, origin: &str, destination: &str) -> Result<String> {
    info!(origin = %origin, destination = %destination, "comparing ticket prices");
    let fares = if is_athens(origin) {
        let mut all = Vec::new();
        for port in ATHENS_PORT_NAMES {
            all.extend(store.fare_breakdowns(port, destination)?);
        }
        all.sort_by_key(|fare| fare.base_price_cents);
        all
    } else {
        store.fare_breakdowns(origin, destination)?
    };
    if fares.is_empty() {
        return Ok(format!(
            "No route options found from {origin} to {destination} with price information."
        ));
    }

    let mut response = format!("Price comparison for ferry routes from {origin} to {destination}:\n\n");
    for fare in &fares {
        response.push_str(&format!("Company: {}\n", fare.company));
        response.push_str(&format!("Vessel: {}\n", fare.vessel));
        response.push_str(&format!(
            "Departure: {}, Arrival: {}\n",
            fare.departure_time, fare.arrival_time
        ));
        response.push_str(&format!(
            "Basic ticket: {}\n\n",
            format_euros(fare.base_price_cents)
        ));
        if !fare.accommodations.is_empty() {
            response.push_str("Accommodation options:\n");
            for accommodation in &fare.accommodations {
                response.push_str(&format!(
                    "- {}: {}\n",
                    accommodation.name,
                    format_euros(accommodation.price_cents)
                ));
            }
            response.push('\n');
        }
    }
    if let Some(best) = fares.first() {
        response.push_str(&format!(
            "💰 Best value option: {} with basic fare at {}\n",
            best.company,
            format_euros(best.base_price_cents)
        ));
    }
    Ok(response)
}

/// Direct sailings between two ports ordered by the requested preference.
pub fn optimal_schedule(
    store: &FerryStore,
    origin: &str,
    destination: &str,
    date: Option<&str>,
    preference: SchedulePreference,
) -> Result<String> {
    info!(
        origin = %origin,
        destination = %destination,
        preference = preference.as_str(),
        "finding optimal schedule"
    );
    let departures = if is_athens(origin) {
        store.direct_departures_from_athens(destination, date, preference, DEFAULT_RESULT_LIMIT)?
    } else {
        store.direct_departures(origin, destination, date, preference, DEFAULT_RESULT_LIMIT)?
    };
    let date_suffix = date.map(|d| format!(" on {d}")).unwrap_or_default();
    if departures.is_empty() {
        return Ok(format!(
            "No direct schedules found from {origin} to {destination}{date_suffix}."
        ));
    }

    let preference_text = match preference {
        SchedulePreference::Earliest => "earliest departure",
        SchedulePreference::Latest => "latest departure",
        SchedulePreference::Shortest => "shortest duration",
    };
    let mut response = format!(
        "Optimal ferry schedules from {origin} to {destination}{date_suffix} ({preference_text}):\n\n"
    );
    for (i, leg) in departures.iter().enumerate() {
        response.push_str(&format!(
            "{}. {} to {}\n",
            i + 1,
            leg.origin_port,
            leg.destination_port
        ));
        response.push_str(&format!("   Company: {}\n", leg.company));
        response.push_str(&format!(
            "   Departure: {}, Arrival: {}\n",
            leg.departure_time, leg.arrival_time
        ));
        response.push_str(&format!(
            "   Duration: {}\n\n",
            format_duration(leg.duration_minutes)
        ));
    }

    // The list is already ordered by the preference, so the first row is the
    // one to highlight.
    if let Some(best) = departures.first() {
        match preference {
            SchedulePreference::Earliest => response.push_str(&format!(
                "⏰ Earliest option: {} departing at {} from {}\n",
                best.company, best.departure_time, best.origin_port
            )),
            SchedulePreference::Latest => response.push_str(&format!(
                "⏰ Latest option: {} departing at {} from {}\n",
                best.company, best.departure_time, best.origin_port
            )),
            SchedulePreference::Shortest => response.push_str(&format!(
                "⏰ Fastest option: {} with duration of {}\n",
                best.company,
                format_duration(best.duration_minutes)
            )),
        }
    }
    Ok(response)
}

/// Two-leg journeys through a shared intermediate port, shortest total
/// journey first. Transfers shorter than [`MIN_TRANSFER_MINUTES`] are
/// rejected; the midnight wrap is handled by mod-1440 arithmetic.
pub fn find_connections(
    store: &FerryStore,
    origin: &str,
    destination: &str,
    date: Option<&str>,
) -> Result<Vec<ConnectionOption>> {
    let first_legs = if is_athens(origin) {
        let mut legs = Vec::new();
        for port in ATHENS_PORT_NAMES {
            legs.extend(store.departures_from(port, date)?);
        }
        legs
    } else {
        store.departures_from(origin, date)?
    };
    let second_legs = store.departures_to(destination, date)?;

    let mut plans = Vec::new();
    for first in &first_legs {
        let Some(first_arrival) = time_to_minutes(&first.arrival_time) else {
            continue;
        };
        for second in &second_legs {
            if !second
                .origin_port
                .eq_ignore_ascii_case(&first.destination_port)
            {
                continue;
            }
            let Some(second_departure) = time_to_minutes(&second.departure_time) else {
                continue;
            };
            let transfer = (second_departure - first_arrival).rem_euclid(24 * 60);
            if transfer < MIN_TRANSFER_MINUTES {
                continue;
            }
            plans.push(ConnectionOption {
                via_port: first.destination_port.clone(),
                first: first.clone(),
                second: second.clone(),
                transfer_minutes: transfer,
                total_minutes: first.duration_minutes + second.duration_minutes + transfer,
            });
        }
    }
    plans.sort_by_key(|plan| plan.total_minutes);
    Ok(plans)
}

/// Direct sailings plus connecting options between two ports, in one answer.
pub fn connecting_schedules(
    store: &FerryStore,
    origin: &str,
    destination: &str,
    date: Option<&str>,
) -> Result<String> {
    info!(origin = %origin, destination = %destination, "finding connecting schedules");
    let directs = if is_athens(origin) {
        store.direct_departures_from_athens(
            destination,
            date,
            SchedulePreference::Earliest,
            CONNECTION_DISPLAY_LIMIT,
        )?
    } else {
        store.direct_departures(
            origin,
            destination,
            date,
            SchedulePreference::Earliest,
            CONNECTION_DISPLAY_LIMIT,
        )?
    };
    let connections = find_connections(store, origin, destination, date)?;
    let date_suffix = date.map(|d| format!(" on {d}")).unwrap_or_default();

    if directs.is_empty() && connections.is_empty() {
        return Ok(format!(
            "I couldn't find any direct or connecting routes from {origin} to {destination}{date_suffix}."
        ));
    }

    let mut response = String::new();
    if directs.is_empty() {
        response.push_str(&format!(
            "I couldn't find direct routes from {origin} to {destination}{date_suffix}, but I found {} connecting options:\n\n",
            connections.len()
        ));
    } else {
        response.push_str(&format!(
            "I found {} direct ferry routes from {origin} to {destination}{date_suffix}:\n\n",
            directs.len()
        ));
        for (i, leg) in directs.iter().enumerate() {
            response.push_str(&format!(
                "{}. {} to {} (Direct)\n",
                i + 1,
                leg.origin_port,
                leg.destination_port
            ));
            response.push_str(&format!("   Company: {}\n", leg.company));
            response.push_str(&format!(
                "   Departure: {}, Arrival: {}\n",
                leg.departure_time, leg.arrival_time
            ));
            response.push_str(&format!(
                "   Duration: {}\n\n",
                format_duration(leg.duration_minutes)
            ));
        }
        if !connections.is_empty() {
            response.push_str(&format!(
                "Additionally, I found {} connecting routes that might be of interest:\n\n",
                connections.len()
            ));
        }
    }

    for (i, plan) in connections.iter().take(CONNECTION_DISPLAY_LIMIT).enumerate() {
        response.push_str(&format!(
            "{}. {} → {} → {} (Connection)\n",
            i + 1,
            plan.first.origin_port,
            plan.via_port,
            plan.second.destination_port
        ));
        response.push_str(&format!(
            "   Leg 1: {} from {} to {}\n",
            plan.first.company, plan.first.origin_port, plan.first.destination_port
        ));
        response.push_str(&format!(
            "     Departure: {}, Arrival: {} (Duration: {})\n",
            plan.first.departure_time,
            plan.first.arrival_time,
            format_duration(plan.first.duration_minutes)
        ));
        response.push_str(&format!(
            "   Transfer time in {}: {}\n",
            plan.via_port,
            format_duration(plan.transfer_minutes)
        ));
        response.push_str(&format!(
            "   Leg 2: {} from {} to {}\n",
            plan.second.company, plan.second.origin_port, plan.second.destination_port
        ));
        response.push_str(&format!(
            "     Departure: {}, Arrival: {} (Duration: {})\n",
            plan.second.departure_time,
            plan.second.arrival_time,
            format_duration(plan.second.duration_minutes)
        ));
        response.push_str(&format!(
            "   Total journey time: {}\n\n",
            format_duration(plan.total_minutes)
        ));
    }

    if let Some(best) = connections.first() {
        response.push_str(&format!(
            "⏰ Recommended connection: Via {} with a {} transfer\n",
            best.via_port,
            format_duration(best.transfer_minutes)
        ));
        response.push_str(&format!(
            "   Total journey time: {}\n",
            format_duration(best.total_minutes)
        ));
    }
    Ok(response)
}

/// Islands from the known groups, ranked by how many distinct routes serve
/// them. With preferences, only islands whose group matches at least one
/// preference survive, best-scoring first.
pub fn island_recommendations(
    store: &FerryStore,
    preferences: &[String],
    count: usize,
) -> Result<Vec<IslandSuggestion>> {
    let ranked = store.destination_connectivity(50)?;
    let mut scored = Vec::new();
    for (destination, connections) in ranked {
        let Some(group) = group_for_island(&destination) else {
            continue;
        };
        let score = preferences
            .iter()
            .filter(|preference| {
                group
                    .traits
                    .iter()
                    .any(|tag| tag.eq_ignore_ascii_case(preference.trim()))
            })
            .count();
        if !preferences.is_empty() && score == 0 {
            continue;
        }
        scored.push((
            score,
            IslandSuggestion {
                island: destination,
                group: group.name.to_string(),
                connections,
                tags: group.traits.iter().map(ToString::to_string).collect(),
            },
        ));
    }
    scored.sort_by_key(|(score, suggestion)| Reverse((*score, suggestion.connections)));
    Ok(scored
        .into_iter()
        .take(count)
        .map(|(_, suggestion)| suggestion)
        .collect())
}

#[must_use]
pub fn render_island_recommendations(suggestions: &[IslandSuggestion]) -> String {
    let mut response = String::from("🏝️ **Recommended Greek Islands**\n\n");
    for (i, suggestion) in suggestions.iter().enumerate() {
        response.push_str(&format!(
            "{}. {} ({})\n",
            i + 1,
            suggestion.island,
            suggestion.group
        ));
        response.push_str(&format!("   Connections: {}\n", suggestion.connections));
        response.push_str(&format!("   Known for: {}\n\n", suggestion.tags.join(", ")));
    }
    response
}

/// Island combinations reachable from a base port, grouped by island group
/// and sized to the trip length.
pub fn island_combinations(
    store: &FerryStore,
    base_port: &str,
    trip_length_days: i64,
    preferences: &[String],
) -> Result<String> {
    info!(base_port = %base_port, trip_length_days, "suggesting island combinations");
    let ports_to_check: Vec<&str> = if is_athens(base_port) {
        ATHENS_PORT_NAMES.to_vec()
    } else {
        vec![base_port]
    };

    let mut reachable = BTreeSet::new();
    for port in &ports_to_check {
        for departure in store.departures_from(port, None)? {
            reachable.insert(departure.destination_port);
        }
    }

    let mut accessible: Vec<(&'static IslandGroup, Vec<&'static str>, Vec<&'static [&'static str]>)> =
        Vec::new();
    for group in &ISLAND_GROUPS {
        let connected: Vec<&'static str> = group
            .islands
            .iter()
            .copied()
            .filter(|island| reachable.iter().any(|name| name.contains(*island)))
            .collect();
        if connected.is_empty() {
            continue;
        }
        let combos: Vec<&'static [&'static str]> = group
            .combinations
            .iter()
            .copied()
            .filter(|combo| combo.iter().all(|island| connected.contains(island)))
            .collect();
        accessible.push((group, connected, combos));
    }

    if !preferences.is_empty() {
        let mut ranked: Vec<(usize, _)> = accessible
            .into_iter()
            .map(|entry| {
                let score = preferences
                    .iter()
                    .filter(|preference| {
                        entry
                            .0
                            .traits
                            .iter()
                            .any(|tag| tag.eq_ignore_ascii_case(preference.trim()))
                    })
                    .count();
                (score, entry)
            })
            .collect();
        ranked.sort_by_key(|(score, _)| Reverse(*score));
        accessible = ranked
            .into_iter()
            .filter(|(score, _)| *score > 0)
            .map(|(_, entry)| entry)
            .collect();
    }

    let islands_to_visit = if trip_length_days <= 5 {
        2
    } else if trip_length_days <= 10 {
        3
    } else {
        4
    };

    let mut response = format!("🏝️ **Recommended Island Combinations from {base_port}**\n\n");
    if accessible.is_empty() {
        response.push_str(&format!(
            "I couldn't find good island combinations accessible from {base_port} based on the ferry database.\n\n"
        ));
        response.push_str("Here are some popular island combinations from Athens:\n\n");
        response.push_str("1. **Cyclades Classic:** Mykonos, Paros, Naxos\n");
        response.push_str(
            "   Perfect for: First-time visitors, beaches, mix of nightlife and relaxation\n",
        );
        response.push_str("   Ideal duration: 7-10 days\n\n");
        response.push_str("2. **Cyclades Scenic:** Santorini, Folegandros, Milos\n");
        response.push_str("   Perfect for: Couples, stunning landscapes, photography\n");
        response.push_str("   Ideal duration: 8-12 days\n\n");
        response.push_str("3. **Saronic Gulf Quick Trip:** Hydra, Spetses, Poros\n");
        response.push_str("   Perfect for: Short trips, easy access from Athens\n");
        response.push_str("   Ideal duration: 4-7 days\n\n");
        return Ok(response);
    }

    let mut count = 1;
    for (group, connected, combos) in &accessible {
        response.push_str(&format!("**{} Island Combinations:**\n", group.name));
        let traits_line = group
            .traits
            .iter()
            .take(3)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        if combos.is_empty() {
            let picks: Vec<&str> = connected.iter().copied().take(islands_to_visit).collect();
            response.push_str(&format!("{count}. {}\n", picks.join(", ")));
            response.push_str(&format!("   Perfect for: {traits_line}\n"));
            response.push_str(&format!("   Ideal duration: {} days\n\n", picks.len() * 3));
            count += 1;
        } else {
            for combo in combos.iter().take(2) {
                response.push_str(&format!("{count}. {}\n", combo.join(", ")));
                response.push_str(&format!("   Perfect for: {traits_line}\n"));
                response.push_str(&format!("   Ideal duration: {} days\n\n", combo.len() * 3));
                count += 1;
            }
        }
    }

    response.push_str("💡 **Travel Planning Tips:**\n");
    response.push_str(&format!(
        "- For a {trip_length_days}-day trip, I recommend visiting {islands_to_visit} islands\n"
    ));
    response.push_str("- Spend at least 2-3 days on each island to avoid rushing\n");
    response.push_str("- Consider the ferry schedules between islands when planning\n");
    response.push_str("- Book accommodations in advance during high season (June-September)\n");
    Ok(response)
}

/// Standard wording when a query found nothing. If the pair does have
/// current service the empty result came from over-tight criteria (usually a
/// date filter), so the existing service is reported instead. Otherwise the
/// historical table is consulted for a seasonality hint and Piraeus offered
/// as a hub.
pub fn no_current_routes_answer(
    store: &FerryStore,
    origin: &str,
    destination: &str,
) -> Result<String> {
    let current = store.current_route_summary(origin, destination)?;
    if !current.is_empty() {
        let mut answer = format!(
            "I couldn't find sailings matching those exact criteria, but {origin} to {destination} does have current service:\n\n"
        );
        for (company, origin_port, destination_port, days) in &current {
            answer.push_str(&format!(
                "- {company}: {origin_port} to {destination_port}, scheduled on {days} different dates\n"
            ));
        }
        return Ok(answer);
    }

    let ranges = store.find_historical_routes(origin, destination)?;
    let mut answer = format!("I couldn't find any current ferry routes from {origin} to {destination}.");
    if let Some(range) = ranges.first() {
        match (&range.start_date, &range.end_date) {
            (Some(start), Some(end)) => answer.push_str(&format!(
                " This route has operated seasonally in the past ({start} to {end}), so it may return later in the year."
            )),
            _ => answer.push_str(" This route has operated in the past, so it may be seasonal."),
        }
    }
    if store.connection_count("piraeus", destination)? > 0 {
        answer.push_str(&format!(
            " {destination} is served from PIRAEUS, so you could look for a connection through there."
        ));
    } else {
        answer.push_str(
            " You might want to consider connecting through a major hub like PIRAEUS.",
        );
    }
    Ok(answer)
}

/// Answers recognizable question shapes without the language model.
/// Returns `None` when the question needs the full agent pipeline.
pub fn try_fast_path(store: &FerryStore, kind: AgentKind, query: &str) -> Result<Option<String>> {
    match kind {
        AgentKind::Price => {
            if let Some(origin) = detect_cheapest_query(query) {
                return cheapest_from(store, &origin, DEFAULT_RESULT_LIMIT).map(Some);
            }
            if let Some((origin, destination)) = detect_compare_query(query) {
                return compare_prices(store, &origin, &destination).map(Some);
            }
        }
        AgentKind::Travel => {
            if let Some(base) = detect_combination_query(query) {
                let days = extract_trip_days(query).unwrap_or(7);
                let preferences = extract_preferences(query);
                return island_combinations(store, &base, days, &preferences).map(Some);
            }
        }
        AgentKind::Route | AgentKind::Schedule => {}
    }
    Ok(None)
}

/// Full fallback pipeline used when the language model is disabled or has
/// failed: every intent still gets a data-backed answer.
pub fn deterministic_answer(store: &FerryStore, kind: AgentKind, query: &str) -> Result<String> {
    match kind {
        AgentKind::Price => price_answer(store, query),
        AgentKind::Schedule => schedule_answer(store, query),
        AgentKind::Travel => travel_answer(store, query),
        AgentKind::Route => route_answer(store, query),
    }
}

fn price_answer(store: &FerryStore, query: &str) -> Result<String> {
    if let Some(origin) = detect_cheapest_query(query) {
        return cheapest_from(store, &origin, DEFAULT_RESULT_LIMIT);
    }
    if let Some((origin, destination)) = detect_compare_query(query) {
        return compare_prices(store, &origin, &destination);
    }
    let ports = store.list_ports()?;
    let (origin, destination) = extract_ports(query, &ports);
    match (origin, destination) {
        (Some(origin), Some(destination)) => compare_prices(store, &origin.name, &destination.name),
        (Some(origin), None) => cheapest_from(store, &origin.name, DEFAULT_RESULT_LIMIT),
        (None, Some(destination)) if mentions_athens(query) => {
            compare_prices(store, "Athens", &destination.name)
        }
        _ if mentions_athens(query) => cheapest_from(store, "Athens", DEFAULT_RESULT_LIMIT),
        _ => Ok(
            "I can compare fares between two ports (\"compare prices from Piraeus to Naxos\") \
             or list the cheapest departures from one (\"cheapest ferries from Piraeus\")."
                .to_string(),
        ),
    }
}

fn schedule_answer(store: &FerryStore, query: &str) -> Result<String> {
    let ports = store.list_ports()?;
    let (origin, destination) = extract_ports(query, &ports);
    let origin_name = origin
        .map(|port| port.name.clone())
        .or_else(|| mentions_athens(query).then(|| "Athens".to_string()));
    let date = extract_date(query, Local::now().date_naive());
    match (origin_name, destination) {
        (Some(origin), Some(destination)) => {
            if has_preference_cue(query) {
                optimal_schedule(
                    store,
                    &origin,
                    &destination.name,
                    date.as_deref(),
                    extract_preference(query),
                )
            } else {
                connecting_schedules(store, &origin, &destination.name, date.as_deref())
            }
        }
        _ => Ok(
            "I can look up schedules once I know both ports, for example \
             \"earliest ferry from Rafina to Mykonos tomorrow\"."
                .to_string(),
        ),
    }
}

fn travel_answer(store: &FerryStore, query: &str) -> Result<String> {
    if let Some(base) = detect_combination_query(query) {
        let days = extract_trip_days(query).unwrap_or(7);
        let preferences = extract_preferences(query);
        return island_combinations(store, &base, days, &preferences);
    }
    let preferences = extract_preferences(query);
    let suggestions = island_recommendations(store, &preferences, DEFAULT_RESULT_LIMIT)?;
    if suggestions.is_empty() {
        return Ok(
            "I couldn't find island connections matching that in the current ferry data."
                .to_string(),
        );
    }
    Ok(render_island_recommendations(&suggestions))
}

fn route_answer(store: &FerryStore, query: &str) -> Result<String> {
    let ports = store.list_ports()?;
    let (origin, destination) = extract_ports(query, &ports);
    let origin_name = origin
        .map(|port| port.name.clone())
        .or_else(|| mentions_athens(query).then(|| "Athens".to_string()));
    let date = extract_date(query, Local::now().date_naive());
    match (origin_name, destination) {
        (Some(origin), Some(destination)) => {
            let answer = connecting_schedules(store, &origin, &destination.name, date.as_deref())?;
            if answer.starts_with("I couldn't find any direct or connecting routes") {
                return no_current_routes_answer(store, &origin, &destination.name);
            }
            Ok(answer)
        }
        _ => Ok(
            "I can help with ferry routes once I know both ports, for example \
             \"ferries from Piraeus to Naxos\"."
                .to_string(),
        ),
    }
}

/// "cheapest ... from X" with no destination clause.
#[must_use]
pub fn detect_cheapest_query(query: &str) -> Option<String> {
    let text = normalize_question(query);
    if !(text.contains("cheapest") || text.contains("least expensive")) {
        return None;
    }
    let tail = after_cue(&text, "from")?;
    let place = strip_trailing_noise(tail);
    if place.is_empty() || find_word(place, "to").is_some() {
        return None;
    }
    Some(place.to_string())
}

/// "compare prices ... from X to Y" / "... between X and Y".
#[must_use]
pub fn detect_compare_query(query: &str) -> Option<(String, String)> {
    let text = normalize_question(query);
    if !["price", "fare", "cost", "ticket"]
        .iter()
        .any(|word| text.contains(word))
    {
        return None;
    }
    let tail = after_cue(&text, "from").or_else(|| after_cue(&text, "between"))?;
    let (origin, destination) = split_pair(tail)?;
    let origin = strip_trailing_noise(origin);
    let destination = strip_trailing_noise(destination);
    if origin.is_empty() || destination.is_empty() {
        return None;
    }
    Some((origin.to_string(), destination.to_string()))
}

/// "island combinations from X" and close variants; yields the base port.
#[must_use]
pub fn detect_combination_query(query: &str) -> Option<String> {
    let text = normalize_question(query);
    let marker_end = ["island combinations", "combinations of islands", "island groups"]
        .iter()
        .find_map(|marker| text.find(marker).map(|pos| pos + marker.len()))?;
    let mut tail = text[marker_end..].trim();
    for cue in ["starting from", "from", "near", "in", "for"] {
        if let Some(rest) = tail.strip_prefix(cue) {
            if rest.starts_with(' ') {
                tail = rest.trim_start();
                break;
            }
        }
    }
    let base = strip_trailing_noise(tail);
    if base.is_empty() {
        return None;
    }
    Some(base.to_string())
}

fn has_preference_cue(query: &str) -> bool {
    let lower = query.to_lowercase();
    ["earliest", "latest", "fastest", "shortest", "quickest"]
        .iter()
        .any(|cue| lower.contains(cue))
}

#[must_use]
pub fn extract_preference(query: &str) -> SchedulePreference {
    let lower = query.to_lowercase();
    if lower.contains("latest") || lower.contains("last ferry") {
        SchedulePreference::Latest
    } else if lower.contains("shortest") || lower.contains("fastest") || lower.contains("quickest")
    {
        SchedulePreference::Shortest
    } else {
        SchedulePreference::Earliest
    }
}

/// Known characteristic tags mentioned in a question.
#[must_use]
pub fn extract_preferences(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let mut seen = BTreeSet::new();
    for group in &ISLAND_GROUPS {
        for tag in group.traits {
            if lower.contains(tag) {
                seen.insert((*tag).to_string());
            }
        }
    }
    seen.into_iter().collect()
}

/// Trip length in days from phrases like "7 days" or "a 10-day trip".
#[must_use]
pub fn extract_trip_days(query: &str) -> Option<i64> {
    let lower = query.to_lowercase();
    let bytes = lower.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let rest = lower[i..].trim_start_matches([' ', '-']);
            if rest.starts_with("day") {
                return lower[start..i].parse().ok();
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Date mentioned in a question, normalized to `YYYY-MM-DD`. Relative
/// phrases resolve against `today`.
#[must_use]
pub fn extract_date(text: &str, today: NaiveDate) -> Option<String> {
    for token in text.split_whitespace() {
        let cleaned = token.trim_matches(|c: char| matches!(c, ',' | '.' | '?' | '!' | ';'));
        for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
                return Some(date.format("%Y-%m-%d").to_string());
            }
        }
    }

    // "March 23, 2026" spans three whitespace tokens, "March 23 2026" too.
    let tokens: Vec<&str> = text.split_whitespace().collect();
    for window in tokens.windows(3) {
        let joined = window.join(" ");
        let candidate = joined.trim_matches(|c: char| matches!(c, '?' | '!' | ';'));
        for format in ["%B %d, %Y", "%B %d %Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, format) {
                return Some(date.format("%Y-%m-%d").to_string());
            }
        }
    }

    let lower = text.to_lowercase();
    let offset = if lower.contains("day after tomorrow") {
        2
    } else if lower.contains("tomorrow") {
        1
    } else if lower.contains("today") {
        0
    } else if lower.contains("next week") {
        7
    } else {
        return None;
    };
    Some((today + Duration::days(offset)).format("%Y-%m-%d").to_string())
}

/// Finds the origin and destination ports mentioned in a question, using the
/// known port list. Classification prefers the nearest cue word before each
/// mention ("from X", "to Y") and falls back to mention order.
#[must_use]
pub fn extract_ports<'a>(
    text: &str,
    ports: &'a [PortRef],
) -> (Option<&'a PortRef>, Option<&'a PortRef>) {
    let lower = text.to_lowercase();
    let mut mentions: Vec<(usize, &PortRef)> = Vec::new();
    for port in ports {
        let name = port.name.to_lowercase();
        let code = port.code.to_lowercase();
        let position = find_word(&lower, &name).or_else(|| find_word(&lower, &code));
        if let Some(position) = position {
            mentions.push((position, port));
        }
    }
    mentions.sort_by_key(|(position, _)| *position);

    let mut origin = None;
    let mut destination = None;
    for (position, port) in mentions {
        let before = &lower[..position];
        let origin_cue = ORIGIN_CUES
            .iter()
            .filter_map(|cue| rfind_word(before, cue).map(|pos| pos + cue.len()))
            .max();
        let dest_cue = DEST_CUES
            .iter()
            .filter_map(|cue| rfind_word(before, cue).map(|pos| pos + cue.len()))
            .max();
        match (origin_cue, dest_cue) {
            (Some(o), Some(d)) if o > d => {
                if origin.is_none() {
                    origin = Some(port);
                    continue;
                }
            }
            (Some(_), None) => {
                if origin.is_none() {
                    origin = Some(port);
                    continue;
                }
            }
            (Some(_), Some(_)) | (None, Some(_)) => {
                if destination.is_none() {
                    destination = Some(port);
                    continue;
                }
            }
            (None, None) => {}
        }
        if origin.is_none() {
            origin = Some(port);
        } else if destination.is_none() {
            destination = Some(port);
        }
    }
    (origin, destination)
}

fn normalize_question(query: &str) -> String {
    query
        .trim()
        .trim_end_matches(['?', '.', '!'])
        .trim_end()
        .to_lowercase()
}

/// First word-boundary occurrence of `word` in `text`.
pub(crate) fn find_word(text: &str, word: &str) -> Option<usize> {
    scan_word(text, word, false)
}

/// Last word-boundary occurrence of `word` in `text`.
fn rfind_word(text: &str, word: &str) -> Option<usize> {
    scan_word(text, word, true)
}

fn scan_word(text: &str, word: &str, last: bool) -> Option<usize> {
    if word.is_empty() {
        return None;
    }
    let bytes = text.as_bytes();
    let mut search = 0;
    let mut found = None;
    while let Some(pos) = text.get(search..).and_then(|rest| rest.find(word)) {
        let abs = search + pos;
        let end = abs + word.len();
        let before_ok = abs == 0 || !bytes[abs - 1].is_ascii_alphanumeric();
        let after_ok = end >= text.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            if !last {
                return Some(abs);
            }
            found = Some(abs);
        }
        search = abs + 1;
    }
    found
}

fn after_cue<'a>(text: &'a str, cue: &str) -> Option<&'a str> {
    let pos = rfind_word(text, cue)?;
    Some(text[pos + cue.len()..].trim())
}

fn split_pair(tail: &str) -> Option<(&str, &str)> {
    let (split_at, separator_len) = find_word(tail, "to")
        .map(|pos| (pos, 2))
        .or_else(|| find_word(tail, "and").map(|pos| (pos, 3)))?;
    let origin = tail[..split_at].trim();
    let destination = tail[split_at + separator_len..].trim();
    Some((origin, destination))
}

fn strip_trailing_noise(place: &str) -> &str {
    let mut place = place.trim();
    while let Some((head, last)) = place.rsplit_once(' ') {
        if PLACE_NOISE.contains(&last) {
            place = head.trim_end();
        } else {
            break;
        }
    }
    place
}

fn time_to_minutes(time: &str) -> Option<i64> {
    let (hours, minutes) = time.trim().split_once(':')?;
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    Some(hours * 60 + minutes)
}
