use super::super::domain::Location;

pub const SAME_DISTRICT: f64 = 100.0;
pub const SAME_STATE: f64 = 50.0;
pub const DIFFERENT_STATE: f64 = 0.0;

/// Coarse proximity on a 0-100 scale: same district, same state, or neither.
pub fn location_score(left: &Location, right: &Location) -> f64 {
    if left.same_district(right) {
        SAME_DISTRICT
    } else if left.same_state(right) {
        SAME_STATE
    } else {
        DIFFERENT_STATE
    }
}
