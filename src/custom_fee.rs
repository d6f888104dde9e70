//! Custom fee schedule parsing.

use std::collections::BTreeSet;

use crate::domain::{
    CustomFee, EntityId, FallbackFee, FixedFee, FractionalFee, RoyaltyFee, TimestampRange,
};
use crate::record::{CustomFeeKind, CustomFeeSpec, FixedFeeSpec};

/// A parsed fee schedule plus the collectors that are paid in the enclosing token itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFees {
    pub custom_fee: CustomFee,
    pub in_token_collectors: BTreeSet<EntityId>,
}

/// Parses a submitted fee list into one fee schedule row for `entity_id`.
///
/// An empty list still yields a row carrying only the id and validity range: it marks "no
/// custom fees from this timestamp on". For token schedules (`enclosing_token` set) a
/// denominating token of `0.0.0` resolves to the token itself.
pub fn parse_custom_fees(
    specs: &[CustomFeeSpec],
    entity_id: EntityId,
    enclosing_token: Option<EntityId>,
    consensus_timestamp: i64,
) -> ParsedFees {
    let mut fixed_fees = Vec::new();
    let mut fractional_fees = Vec::new();
    let mut royalty_fees = Vec::new();
    let mut in_token_collectors = BTreeSet::new();

    for spec in specs {
        let collector_account_id = spec.collector.unwrap_or(EntityId::EMPTY);
        match &spec.fee {
            CustomFeeKind::Fixed(fixed) => {
                let denominating_token_id = denominating_token(fixed, enclosing_token);
                if enclosing_token.is_some() && denominating_token_id == enclosing_token {
                    in_token_collectors.insert(collector_account_id);
                }
                fixed_fees.push(FixedFee {
                    amount: fixed.amount,
                    collector_account_id,
                    denominating_token_id,
                    all_collectors_are_exempt: spec.all_collectors_are_exempt,
                });
            }
            CustomFeeKind::Fractional(fractional) => {
                // Fractional fees are always charged in the token being transferred.
                if enclosing_token.is_some() {
                    in_token_collectors.insert(collector_account_id);
                }
                fractional_fees.push(FractionalFee {
                    numerator: fractional.numerator,
                    denominator: fractional.denominator,
                    minimum_amount: fractional.minimum_amount,
                    maximum_amount: (fractional.maximum_amount > 0)
                        .then_some(fractional.maximum_amount),
                    net_of_transfers: fractional.net_of_transfers,
                    collector_account_id,
                    all_collectors_are_exempt: spec.all_collectors_are_exempt,
                });
            }
            CustomFeeKind::Royalty(royalty) => {
                let fallback_fee = royalty.fallback_fee.as_ref().map(|fallback| {
                    let denominating_token_id = denominating_token(fallback, enclosing_token);
                    if enclosing_token.is_some() && denominating_token_id == enclosing_token {
                        in_token_collectors.insert(collector_account_id);
                    }
                    FallbackFee {
                        amount: fallback.amount,
                        denominating_token_id,
                    }
                });
                royalty_fees.push(RoyaltyFee {
                    numerator: royalty.numerator,
                    denominator: royalty.denominator,
                    fallback_fee,
                    collector_account_id,
                    all_collectors_are_exempt: spec.all_collectors_are_exempt,
                });
            }
        }
    }

    in_token_collectors.remove(&EntityId::EMPTY);

    ParsedFees {
        custom_fee: CustomFee {
            entity_id,
            timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
            fixed_fees: non_empty(fixed_fees),
            fractional_fees: non_empty(fractional_fees),
            royalty_fees: non_empty(royalty_fees),
        },
        in_token_collectors,
    }
}

fn non_empty<T>(fees: Vec<T>) -> Option<Vec<T>> {
    (!fees.is_empty()).then_some(fees)
}

fn denominating_token(fixed: &FixedFeeSpec, enclosing_token: Option<EntityId>) -> Option<EntityId> {
    match (fixed.denominating_token_id, enclosing_token) {
        (Some(id), Some(token_id)) if id.is_empty() => Some(token_id),
        (Some(id), None) if id.is_empty() => None,
        (denominating, _) => denominating,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FractionalFeeSpec, RoyaltyFeeSpec};

    const TOKEN: EntityId = EntityId::of(500);

    fn fixed(amount: i64, denominating: Option<EntityId>, collector: i64) -> CustomFeeSpec {
        CustomFeeSpec {
            fee: CustomFeeKind::Fixed(FixedFeeSpec {
                amount,
                denominating_token_id: denominating,
            }),
            collector: Some(EntityId::of(collector)),
            all_collectors_are_exempt: false,
        }
    }

    #[test]
    fn test_empty_list_yields_single_marker_row() {
        for _ in 0..2 {
            let parsed = parse_custom_fees(&[], TOKEN, Some(TOKEN), 7);
            assert!(parsed.custom_fee.is_empty());
            assert_eq!(parsed.custom_fee.entity_id, TOKEN);
            assert_eq!(
                parsed.custom_fee.timestamp_range,
                Some(TimestampRange::open(7))
            );
            assert!(parsed.in_token_collectors.is_empty());
        }
    }

    #[test]
    fn test_sentinel_resolves_to_enclosing_token() {
        let specs = [
            fixed(10, Some(EntityId::EMPTY), 801),
            fixed(20, Some(EntityId::of(42)), 802),
            fixed(30, None, 803),
        ];
        let parsed = parse_custom_fees(&specs, TOKEN, Some(TOKEN), 7);
        let fixed_fees = parsed.custom_fee.fixed_fees.unwrap();

        assert_eq!(fixed_fees[0].denominating_token_id, Some(TOKEN));
        assert_eq!(fixed_fees[1].denominating_token_id, Some(EntityId::of(42)));
        assert_eq!(fixed_fees[2].denominating_token_id, None);
        assert_eq!(
            parsed.in_token_collectors.into_iter().collect::<Vec<_>>(),
            vec![EntityId::of(801)]
        );
        assert!(parsed.custom_fee.fractional_fees.is_none());
        assert!(parsed.custom_fee.royalty_fees.is_none());
    }

    #[test]
    fn test_fractional_and_royalty_fees() {
        let specs = [
            CustomFeeSpec {
                fee: CustomFeeKind::Fractional(FractionalFeeSpec {
                    numerator: 1,
                    denominator: 100,
                    minimum_amount: 1,
                    maximum_amount: 0,
                    net_of_transfers: true,
                }),
                collector: Some(EntityId::of(900)),
                all_collectors_are_exempt: true,
            },
            CustomFeeSpec {
                fee: CustomFeeKind::Royalty(RoyaltyFeeSpec {
                    numerator: 5,
                    denominator: 10,
                    fallback_fee: Some(FixedFeeSpec {
                        amount: 3,
                        denominating_token_id: Some(EntityId::of(77)),
                    }),
                }),
                collector: Some(EntityId::of(901)),
                all_collectors_are_exempt: false,
            },
        ];
        let parsed = parse_custom_fees(&specs, TOKEN, Some(TOKEN), 7);

        let fractional = &parsed.custom_fee.fractional_fees.as_ref().unwrap()[0];
        assert_eq!(fractional.maximum_amount, None);
        assert!(fractional.all_collectors_are_exempt);

        let royalty = &parsed.custom_fee.royalty_fees.as_ref().unwrap()[0];
        assert_eq!(
            royalty.fallback_fee.as_ref().unwrap().denominating_token_id,
            Some(EntityId::of(77))
        );
        assert_eq!(
            parsed.in_token_collectors.into_iter().collect::<Vec<_>>(),
            vec![EntityId::of(900)]
        );
    }

    #[test]
    fn test_topic_schedule_has_no_sentinel() {
        let topic = EntityId::of(600);
        let parsed = parse_custom_fees(&[fixed(5, Some(EntityId::EMPTY), 801)], topic, None, 7);
        let fixed_fees = parsed.custom_fee.fixed_fees.unwrap();
        assert_eq!(fixed_fees[0].denominating_token_id, None);
        assert!(parsed.in_token_collectors.is_empty());
    }
}
