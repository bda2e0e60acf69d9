//! Routes a question to the specialist desk most likely to answer it.

use crate::models::AgentKind;
use crate::tools::find_word;

const PRICE_WORDS: [&str; 13] = [
    "cheapest",
    "cheap",
    "price",
    "prices",
    "cost",
    "costs",
    "fare",
    "fares",
    "ticket",
    "tickets",
    "expensive",
    "affordable",
    "budget",
];
const PRICE_PHRASES: [&str; 2] = ["how much", "least expensive"];

const SCHEDULE_WORDS: [&str; 13] = [
    "schedule",
    "schedules",
    "timetable",
    "departure",
    "departures",
    "arrival",
    "arrivals",
    "earliest",
    "latest",
    "fastest",
    "quickest",
    "when",
    "duration",
];
const SCHEDULE_PHRASES: [&str; 4] = ["how long", "travel time", "journey time", "what time"];

const TRAVEL_WORDS: [&str; 8] = [
    "island",
    "islands",
    "vacation",
    "holiday",
    "itinerary",
    "trip",
    "visit",
    "hopping",
];

/// Picks an agent kind for a free-text question. Price, schedule, and travel
/// cues are checked before the generic route default so that "how much is
/// Piraeus to Naxos" lands on the price desk rather than matching the plain
/// origin-to-destination shape.
#[must_use]
pub fn classify(query: &str) -> AgentKind {
    let lower = query.to_lowercase();
    if has_cue(&lower, &PRICE_WORDS, &PRICE_PHRASES) {
        return AgentKind::Price;
    }
    if has_cue(&lower, &SCHEDULE_WORDS, &SCHEDULE_PHRASES) {
        return AgentKind::Schedule;
    }
    if has_cue(&lower, &TRAVEL_WORDS, &[]) {
        return AgentKind::Travel;
    }
    AgentKind::Route
}

fn has_cue(lower: &str, words: &[&str], phrases: &[&str]) -> bool {
    words.iter().any(|word| find_word(lower, word).is_some())
        || phrases.iter().any(|phrase| lower.contains(phrase))
}
