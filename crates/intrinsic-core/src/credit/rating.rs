use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Multiple, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Synthetic bond rating, best to worst. `Ord` follows that order, so a
/// "better" rating compares as smaller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CreditRating {
    AAA,
    AA,
    #[serde(rename = "A+")]
    Ap,
    A,
    #[serde(rename = "A-")]
    Am,
    BBB,
    #[serde(rename = "BB+")]
    BBp,
    BB,
    #[serde(rename = "B+")]
    Bp,
    B,
    #[serde(rename = "B-")]
    Bm,
    CCC,
    CC,
    C,
    D,
}

impl CreditRating {
    pub fn as_str(self) -> &'static str {
        match self {
            CreditRating::AAA => "AAA",
            CreditRating::AA => "AA",
            CreditRating::Ap => "A+",
            CreditRating::A => "A",
            CreditRating::Am => "A-",
            CreditRating::BBB => "BBB",
            CreditRating::BBp => "BB+",
            CreditRating::BB => "BB",
            CreditRating::Bp => "B+",
            CreditRating::B => "B",
            CreditRating::Bm => "B-",
            CreditRating::CCC => "CCC",
            CreditRating::CC => "CC",
            CreditRating::C => "C",
            CreditRating::D => "D",
        }
    }
}

impl fmt::Display for CreditRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rating together with the default spread over the risk-free rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingBand {
    pub rating: CreditRating,
    pub spread: Rate,
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Interest coverage bands (Damodaran large-firm style), highest threshold
/// first. A ratio strictly above `threshold` earns the band.
pub const RATING_BANDS: [(Multiple, RatingBand); 14] = [
    (dec!(8.5), band(CreditRating::AAA, dec!(0.0063))),
    (dec!(6.5), band(CreditRating::AA, dec!(0.0078))),
    (dec!(5.5), band(CreditRating::Ap, dec!(0.0098))),
    (dec!(4.25), band(CreditRating::A, dec!(0.0108))),
    (dec!(3.0), band(CreditRating::Am, dec!(0.0122))),
    (dec!(2.5), band(CreditRating::BBB, dec!(0.0156))),
    (dec!(2.25), band(CreditRating::BBp, dec!(0.0240))),
    (dec!(2.0), band(CreditRating::BB, dec!(0.0351))),
    (dec!(1.75), band(CreditRating::Bp, dec!(0.0478))),
    (dec!(1.5), band(CreditRating::B, dec!(0.0728))),
    (dec!(1.25), band(CreditRating::Bm, dec!(0.0913))),
    (dec!(0.8), band(CreditRating::CCC, dec!(0.1085))),
    (dec!(0.65), band(CreditRating::CC, dec!(0.1245))),
    (dec!(0.2), band(CreditRating::C, dec!(0.1580))),
];

/// Catch-all for coverage at or below the lowest threshold.
pub const DEFAULT_BAND: RatingBand = band(CreditRating::D, dec!(0.2000));

const fn band(rating: CreditRating, spread: Rate) -> RatingBand {
    RatingBand { rating, spread }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Map an interest coverage ratio to a synthetic rating and credit spread.
///
/// Total over all inputs: zero or negative coverage signals distress and
/// lands in `D`.
pub fn classify_coverage(coverage: Multiple) -> RatingBand {
    RATING_BANDS
        .iter()
        .find(|(threshold, _)| coverage > *threshold)
        .map(|(_, band)| *band)
        .unwrap_or(DEFAULT_BAND)
}

/// Coverage threshold that must be exceeded to earn `rating`, `None` for `D`.
pub fn threshold_for(rating: CreditRating) -> Option<Multiple> {
    RATING_BANDS
        .iter()
        .find(|(_, band)| band.rating == rating)
        .map(|(threshold, _)| *threshold)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    #[test]
    fn test_top_band() {
        let b = classify_coverage(dec!(12));
        assert_eq!(b.rating, CreditRating::AAA);
        assert_eq!(b.spread, dec!(0.0063));
    }

    #[test]
    fn test_boundary_is_strict() {
        // Exactly 8.5 does not exceed 8.5
        assert_eq!(classify_coverage(dec!(8.5)).rating, CreditRating::AA);
        assert_eq!(classify_coverage(dec!(8.5000001)).rating, CreditRating::AAA);
        assert_eq!(classify_coverage(dec!(0.2)).rating, CreditRating::D);
    }

    #[test]
    fn test_every_band_reachable() {
        for (threshold, band) in RATING_BANDS.iter() {
            let hit = classify_coverage(*threshold + dec!(0.01));
            assert_eq!(hit, *band, "just above {threshold}");
        }
    }

    #[test]
    fn test_negative_and_zero_coverage_default() {
        assert_eq!(classify_coverage(dec!(-3)), DEFAULT_BAND);
        assert_eq!(classify_coverage(Decimal::ZERO), DEFAULT_BAND);
        assert_eq!(DEFAULT_BAND.spread, dec!(0.2000));
    }

    #[test]
    fn test_table_descending() {
        for pair in RATING_BANDS.windows(2) {
            assert!(pair[0].0 > pair[1].0);
            assert!(pair[0].1.spread < pair[1].1.spread);
            assert!(pair[0].1.rating < pair[1].1.rating);
        }
    }

    #[test]
    fn test_rating_serialises_as_symbol() {
        let json = serde_json::to_string(&CreditRating::BBp).unwrap();
        assert_eq!(json, "\"BB+\"");
        assert_eq!(CreditRating::Am.to_string(), "A-");
    }

    #[test]
    fn test_threshold_lookup() {
        assert_eq!(threshold_for(CreditRating::BBB), Some(dec!(2.5)));
        assert_eq!(threshold_for(CreditRating::D), None);
    }
}
