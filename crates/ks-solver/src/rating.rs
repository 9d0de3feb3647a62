//! Algorithm ratings used to bias turn allocation.

use serde::{Deserialize, Serialize};

/// An integer quality signal in `0..=10`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: Rating = Rating(0);
    pub const MAX: Rating = Rating(10);

    /// Clamps into `0..=10`.
    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX.0))
    }

    /// Rounds and clamps a fractional rating.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() || value <= 0.0 {
            return Self::MIN;
        }
        Self(value.round().min(Self::MAX.0 as f64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The schedule's view of one algorithm's ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    /// Static general-purpose capability, read once at registration.
    pub global: Rating,
    /// Adaptive recent-success rating.
    pub local: Rating,
    /// Moving average of turn success in `0..=10`.
    pub success: f64,
}

impl RatingRecord {
    pub fn new(global: Rating, local: Rating) -> Self {
        Self {
            global,
            local,
            success: 0.0,
        }
    }

    /// Fold one turn outcome into the adaptive local rating.
    ///
    /// `reported` is the algorithm's own current local rating; the
    /// effective local rating never drops below it.
    pub fn record_turn(&mut self, improved: bool, decay: f64, reported: Rating) {
        let sample = if improved { Rating::MAX.0 as f64 } else { 0.0 };
        self.success = decay * self.success + (1.0 - decay) * sample;
        self.local = Rating::from_f64(self.success).max(reported);
    }

    /// Combined turn-allocation weight.
    pub fn weight(&self, global_weight: f64, local_weight: f64) -> f64 {
        self.global.value() as f64 * global_weight + self.local.value() as f64 * local_weight
    }

    /// Whether either axis is nonzero. Only rated algorithms get turns,
    /// whatever the configured weights.
    pub fn is_rated(&self) -> bool {
        self.global.value() > 0 || self.local.value() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_is_clamped() {
        assert_eq!(Rating::new(42), Rating::MAX);
        assert_eq!(Rating::from_f64(-3.0), Rating::MIN);
        assert_eq!(Rating::from_f64(f64::NAN), Rating::MIN);
        assert_eq!(Rating::from_f64(6.6).value(), 7);
        assert_eq!(Rating::from_f64(99.0), Rating::MAX);
    }

    #[test]
    fn local_rating_tracks_success() {
        let mut record = RatingRecord::new(Rating::new(5), Rating::MIN);
        record.record_turn(true, 0.5, Rating::MIN);
        assert_eq!(record.local.value(), 5);
        record.record_turn(true, 0.5, Rating::MIN);
        assert_eq!(record.local.value(), 8);
        for _ in 0..10 {
            record.record_turn(false, 0.5, Rating::MIN);
        }
        assert_eq!(record.local, Rating::MIN);
    }

    #[test]
    fn reported_rating_is_a_floor() {
        let mut record = RatingRecord::new(Rating::new(5), Rating::new(3));
        record.record_turn(false, 0.8, Rating::new(3));
        assert_eq!(record.local.value(), 3);
    }

    #[test]
    fn weight_combines_axes() {
        let record = RatingRecord::new(Rating::MAX, Rating::MIN);
        assert_eq!(record.weight(1.0, 1.0), 10.0);
        assert_eq!(record.weight(0.0, 1.0), 0.0);
        assert!(record.is_rated());
        assert!(!RatingRecord::new(Rating::MIN, Rating::MIN).is_rated());
    }
}
