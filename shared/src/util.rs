use chrono::{DateTime, SubsecRound, Utc};

/// Current UTC time truncated to microseconds
///
/// Truncation keeps timestamps stable across a JSON round trip.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Random order identifier
///
/// Ids are drawn uniformly from the full `u64` space. Exact collisions are
/// rejected by the store's conditional insert, nothing else checks them.
pub fn random_order_id() -> u64 {
    rand::random::<u64>()
}
