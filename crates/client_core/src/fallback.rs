use shared::protocol::Itinerary;
use tracing::error;

const FALLBACK_ITINERARIES: &str = include_str!("../data/fallback_itineraries.json");

/// Built-in trips shown when the assistant has not produced any.
pub fn fallback_itineraries() -> Vec<Itinerary> {
    serde_json::from_str(FALLBACK_ITINERARIES).unwrap_or_else(|error| {
        error!(%error, "bundled fallback itineraries are malformed");
        Vec::new()
    })
}
