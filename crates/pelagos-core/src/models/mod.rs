mod chat;
mod dataset;
mod user;

pub use chat::{AgentAnswer, AgentKind, ChatMessage, ChatRole};
pub use dataset::{
    AccommodationPrice, ConnectionOption, DatasetCounts, DepartureOption, HistoricalRange,
    ImportRunRecord, ImportStats, IslandSuggestion, PortRef, PriceOption, RouteFareBreakdown,
    SchedulePreference,
};
pub use user::{AuthSession, UserAccount};
