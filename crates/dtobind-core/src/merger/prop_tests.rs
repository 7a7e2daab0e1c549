//! Property-based tests for the reversible mergers
//!
//! Formatting a value and restoring the text must give the value back for the
//! patterns that keep full precision.

#[cfg(test)]
mod tests {
    use crate::merger::expression::Expression;
    use crate::merger::format::{sprintf, DateFormatMerger, DecimalFormatMerger};
    use crate::merger::SinglePropertyValueMerger;
    use crate::value::Value;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    /// Whole-second instants between 1900 and 2200
    fn instant_strategy() -> impl Strategy<Value = Value> {
        (-2_208_988_800i64..7_258_118_400i64)
            .prop_map(|secs| Value::Date(Utc.timestamp_opt(secs, 0).unwrap()))
    }

    fn params(pattern: &str) -> Vec<String> {
        vec![pattern.to_string()]
    }

    proptest! {
        /// Property: a date formatted with second precision restores to the same instant
        #[test]
        fn prop_date_format_round_trip(
            date in instant_strategy(),
            pattern in prop_oneof![
                Just("yyyy-MM-dd HH:mm:ss"),
                Just("dd/MM/yyyy'T'HH:mm:ss"),
                Just("%Y%m%d%H%M%S"),
            ]
        ) {
            let merger = DateFormatMerger;
            let text = merger.merge(&date, &params(pattern)).unwrap();
            let restored = merger.restore(&text, &params(pattern)).unwrap();
            prop_assert_eq!(restored, date);
        }

        /// Property: integers survive a grouped decimal pattern
        #[test]
        fn prop_decimal_integer_round_trip(n in -1_000_000_000_000i64..1_000_000_000_000i64) {
            let merger = DecimalFormatMerger;
            let text = merger.merge(&Value::Int(n), &params("#,##0")).unwrap();
            prop_assert_eq!(merger.restore(&text, &params("#,##0")).unwrap(), Value::Int(n));
        }

        /// Property: two-place amounts survive a two-place pattern
        #[test]
        fn prop_decimal_cents_round_trip(cents in -10_000_000i64..10_000_000i64) {
            let merger = DecimalFormatMerger;
            let amount = cents as f64 / 100.0;
            let text = merger.merge(&Value::Float(amount), &params("0.00")).unwrap();
            let restored = merger.restore(&text, &params("0.00")).unwrap();
            prop_assert_eq!(restored.as_f64(), Some(amount));
        }

        /// Property: %d agrees with the standard integer rendering
        #[test]
        fn prop_sprintf_integer(n in any::<i64>(), width in 0usize..24) {
            let format = format!("%{}d", width);
            let rendered = sprintf(&format, &[Value::Int(n)]).unwrap();
            prop_assert_eq!(rendered, format!("{:>width$}", n, width = width));
        }

        /// Property: expression parsing never panics
        #[test]
        fn prop_expression_parse_never_panics(source in "[0-9a-z+*/() .-]{0,24}") {
            let _ = Expression::parse(&source);
        }
    }
}
