use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use plantops_core::{DomainError, ProductId};

/// One stock record per (product, location) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: ProductId,
    pub location: String,
    pub quantity: Decimal,
    pub minimum_threshold: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// A record is low when it has drained to (or below) its threshold.
    pub fn is_low(&self) -> bool {
        is_low(self.quantity, self.minimum_threshold)
    }
}

/// Threshold-inclusive low-stock rule, shared with listing surfaces that
/// work from joined rows rather than full records.
pub fn is_low(quantity: Decimal, minimum_threshold: Decimal) -> bool {
    quantity <= minimum_threshold
}

/// Result of applying a signed delta to a stock key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// An existing record was incremented; carries the new quantity.
    Updated(Decimal),
    /// No record existed and the positive delta created one.
    Created(Decimal),
}

impl DeltaOutcome {
    pub fn quantity(&self) -> Decimal {
        match self {
            DeltaOutcome::Updated(q) | DeltaOutcome::Created(q) => *q,
        }
    }
}

/// The stock-ledger delta rule.
///
/// - existing record: unconditional increment (quantity may go negative;
///   no floor is enforced by current policy);
/// - missing record and positive delta: create with `quantity = delta`;
/// - missing record and non-positive delta: refuse; stock is never
///   conjured from nothing just to subtract from it.
///
/// The persistence layer evaluates the same rule with single-statement,
/// row-locked SQL; this function is the authoritative form of the rule and
/// decides the create-vs-refuse branch there.
pub fn apply_delta(existing: Option<Decimal>, delta: Decimal) -> Result<DeltaOutcome, DomainError> {
    match existing {
        Some(quantity) => Ok(DeltaOutcome::Updated(quantity + delta)),
        None if delta > Decimal::ZERO => Ok(DeltaOutcome::Created(delta)),
        None => Err(DomainError::NoSuchStockRecord),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn positive_delta_creates_missing_record() {
        assert_eq!(
            apply_delta(None, dec!(10)),
            Ok(DeltaOutcome::Created(dec!(10)))
        );
    }

    #[test]
    fn delta_accumulates_on_existing_record() {
        let created = apply_delta(None, dec!(10)).unwrap();
        let after = apply_delta(Some(created.quantity()), dec!(-3)).unwrap();
        assert_eq!(after, DeltaOutcome::Updated(dec!(7)));
    }

    #[test]
    fn negative_delta_on_missing_record_is_refused() {
        assert_eq!(
            apply_delta(None, dec!(-5)),
            Err(DomainError::NoSuchStockRecord)
        );
        assert_eq!(
            apply_delta(None, Decimal::ZERO),
            Err(DomainError::NoSuchStockRecord)
        );
    }

    #[test]
    fn quantity_may_go_negative() {
        // Oversell is permitted by current policy; no floor at zero.
        let after = apply_delta(Some(dec!(2)), dec!(-5)).unwrap();
        assert_eq!(after.quantity(), dec!(-3));
    }

    #[test]
    fn low_stock_is_threshold_inclusive() {
        let record = StockRecord {
            product_id: ProductId::new(1),
            location: "Main Warehouse".to_string(),
            quantity: dec!(5),
            minimum_threshold: dec!(5),
            updated_at: chrono::Utc::now(),
        };
        assert!(record.is_low());
    }

    proptest! {
        #[test]
        fn sum_of_deltas_is_order_independent(a in -1000i64..1000, b in -1000i64..1000, start in 1i64..1000) {
            let start = Decimal::from(start);
            let (a, b) = (Decimal::from(a), Decimal::from(b));

            let ab = apply_delta(Some(start), a).unwrap().quantity();
            let ab = apply_delta(Some(ab), b).unwrap().quantity();

            let ba = apply_delta(Some(start), b).unwrap().quantity();
            let ba = apply_delta(Some(ba), a).unwrap().quantity();

            // Either interleaving of two deltas nets the same quantity.
            prop_assert_eq!(ab, ba);
            prop_assert_eq!(ab, start + a + b);
        }
    }
}
