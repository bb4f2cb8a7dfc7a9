//! Per-collection ranking aggregation.
//!
//! Pure functions over materialized catalog records. Every collection is
//! summarized independently; nothing is shared between calls, so identical
//! input always yields identical output.

use std::collections::{HashMap, HashSet};

use crate::domain::{
    BadgeId, BadgeRecord, CollectionId, CollectionRecord, CollectionSummary, EventId, EventRef,
    EventSummary, GlobalCollector, HeldBadge, Holder, NO_ACTIVITY, TopCollector,
    WalletCollectionHoldings, WalletHolding,
};

/// Number of wallets reported in `top_collectors`.
pub const TOP_COLLECTORS_LIMIT: usize = 10;

/// Catalog data that violates the model and cannot be aggregated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationError {
    /// An event was listed under a collection it does not belong to.
    #[error("event {event_id} belongs to collection {found}, listed under {expected}")]
    EventOutsideCollection {
        /// Offending event.
        event_id: EventId,
        /// Collection being aggregated.
        expected: CollectionId,
        /// Collection the event references.
        found: CollectionId,
    },

    /// A badge's collection reference disagrees with its event's collection.
    #[error("badge {badge_id} references collection {found}, its event belongs to {expected}")]
    BadgeCollectionMismatch {
        /// Offending badge.
        badge_id: BadgeId,
        /// Collection of the owning event.
        expected: CollectionId,
        /// Collection the badge references.
        found: CollectionId,
    },

    /// A badge was listed under an event it does not reference.
    #[error("badge {badge_id} references event {found}, listed under {expected}")]
    BadgeEventMismatch {
        /// Offending badge.
        badge_id: BadgeId,
        /// Event the badge was listed under.
        expected: EventId,
        /// Event the badge references.
        found: EventId,
    },

    /// A badge has more than one open holder row.
    #[error("badge {badge_id} has {count} current holders")]
    MultipleCurrentHolders {
        /// Offending badge.
        badge_id: BadgeId,
        /// Number of open holder rows.
        count: usize,
    },
}

/// Returns the wallet currently holding `record`, if any.
///
/// Burned badges and badges whose every holder row is closed have none.
///
/// # Errors
///
/// Returns [`AggregationError::MultipleCurrentHolders`] if more than one
/// holder row is open.
pub fn current_holder(record: &BadgeRecord) -> Result<Option<&Holder>, AggregationError> {
    if record.badge.is_burned {
        return Ok(None);
    }
    let mut open = record.holders.iter().filter(|h| h.is_current());
    let first = open.next();
    let extra = open.count();
    if extra > 0 {
        return Err(AggregationError::MultipleCurrentHolders {
            badge_id: record.badge.id,
            count: extra + 1,
        });
    }
    Ok(first)
}

#[derive(Debug)]
struct CollectorTally<'a> {
    wallet: &'a str,
    count: u64,
    seen_events: HashSet<EventId>,
    events: Vec<EventRef>,
}

/// Builds the [`CollectionSummary`] for one collection.
///
/// Only current holders count. A collection without badges reports zero
/// badges, [`NO_ACTIVITY`] and no collectors.
///
/// # Errors
///
/// Returns an [`AggregationError`] if the record's events or badges do not
/// agree on their owning collection and event, or a badge has several
/// current holders.
pub fn summarize_collection(
    record: &CollectionRecord,
) -> Result<CollectionSummary, AggregationError> {
    let collection_id = record.collection.id;

    let mut tallies: Vec<CollectorTally<'_>> = Vec::new();
    let mut tally_index: HashMap<&str, usize> = HashMap::new();
    let mut months: Vec<(String, u64)> = Vec::new();
    let mut events = Vec::with_capacity(record.events.len());
    let mut total_poaps = 0_u64;

    for event_record in &record.events {
        let event = &event_record.event;
        if event.collection_id != collection_id {
            return Err(AggregationError::EventOutsideCollection {
                event_id: event.id,
                expected: collection_id,
                found: event.collection_id,
            });
        }

        let mut event_poaps = 0_u64;
        let mut event_wallets: HashSet<&str> = HashSet::new();

        for badge_record in &event_record.badges {
            let badge = &badge_record.badge;
            if badge.event_id != event.id {
                return Err(AggregationError::BadgeEventMismatch {
                    badge_id: badge.id,
                    expected: event.id,
                    found: badge.event_id,
                });
            }
            if badge.collection_id != collection_id {
                return Err(AggregationError::BadgeCollectionMismatch {
                    badge_id: badge.id,
                    expected: collection_id,
                    found: badge.collection_id,
                });
            }

            let Some(holder) = current_holder(badge_record)? else {
                continue;
            };
            let wallet = holder.wallet_address.as_str();
            event_poaps += 1;
            event_wallets.insert(wallet);

            let slot = *tally_index.entry(wallet).or_insert_with(|| {
                tallies.push(CollectorTally {
                    wallet,
                    count: 0,
                    seen_events: HashSet::new(),
                    events: Vec::new(),
                });
                tallies.len() - 1
            });
            if let Some(tally) = tallies.get_mut(slot) {
                tally.count += 1;
                if tally.seen_events.insert(event.id) {
                    tally.events.push(EventRef {
                        id: event.id,
                        name: event.name.clone(),
                        month: event.month.clone(),
                        year: event.year,
                    });
                }
            }
        }

        total_poaps += event_poaps;

        let label = event.month_label();
        match months.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => *count += event_poaps,
            None => months.push((label, event_poaps)),
        }

        events.push(EventSummary {
            id: event.id,
            name: event.name.clone(),
            month: event.month.clone(),
            year: event.year,
            start_date: event.start_date,
            end_date: event.end_date,
            total_poaps: event_poaps,
            unique_collectors: event_wallets.len() as u64,
        });
    }

    Ok(CollectionSummary {
        id: collection_id,
        name: record.collection.name.clone(),
        description: record.collection.description.clone(),
        mint_authority: record.collection.mint_authority.clone(),
        total_poaps,
        unique_events: record.events.len() as u64,
        most_active_month: most_active_month(&months),
        top_collectors: rank_collectors(tallies),
        events,
    })
}

/// Picks the label with the highest count; the first one wins ties.
fn most_active_month(months: &[(String, u64)]) -> String {
    let mut best: Option<&(String, u64)> = None;
    for entry in months {
        if entry.1 > 0 && best.is_none_or(|b| entry.1 > b.1) {
            best = Some(entry);
        }
    }
    best.map_or_else(|| NO_ACTIVITY.to_string(), |(label, _)| label.clone())
}

fn rank_collectors(mut tallies: Vec<CollectorTally<'_>>) -> Vec<TopCollector> {
    // Stable: equal counts keep first-encountered order.
    tallies.sort_by(|a, b| b.count.cmp(&a.count));
    tallies
        .into_iter()
        .take(TOP_COLLECTORS_LIMIT)
        .zip(1_u32..)
        .map(|(tally, rank)| TopCollector {
            wallet: tally.wallet.to_string(),
            count: tally.count,
            rank,
            events: tally.events,
        })
        .collect()
}

/// Assigns 1-based ranks to pre-sorted `(wallet, count)` pairs.
#[must_use]
pub fn rank_wallets(sorted: Vec<(String, u64)>) -> Vec<GlobalCollector> {
    sorted
        .into_iter()
        .zip(1_u32..)
        .map(|((wallet, count), rank)| GlobalCollector {
            rank,
            wallet,
            count,
        })
        .collect()
}

/// Groups a wallet's holdings by collection, in first-encountered order.
#[must_use]
pub fn group_wallet_holdings(holdings: Vec<WalletHolding>) -> Vec<WalletCollectionHoldings> {
    let mut groups: Vec<(WalletCollectionHoldings, HashSet<EventId>)> = Vec::new();
    let mut index: HashMap<CollectionId, usize> = HashMap::new();

    for holding in holdings {
        let slot = *index.entry(holding.collection_id).or_insert_with(|| {
            groups.push((
                WalletCollectionHoldings {
                    collection_id: holding.collection_id,
                    collection_name: holding.collection_name.clone(),
                    total_poaps: 0,
                    first_poap_date: holding.minted_at,
                    latest_poap_date: holding.minted_at,
                    unique_events: 0,
                    poaps: Vec::new(),
                },
                HashSet::new(),
            ));
            groups.len() - 1
        });
        let Some((group, events)) = groups.get_mut(slot) else {
            continue;
        };
        group.total_poaps += 1;
        group.first_poap_date = group.first_poap_date.min(holding.minted_at);
        group.latest_poap_date = group.latest_poap_date.max(holding.minted_at);
        if events.insert(holding.event_id) {
            group.unique_events += 1;
        }
        group.poaps.push(HeldBadge {
            id: holding.badge_id,
            name: holding.badge_name,
            image: holding.image,
            event_name: holding.event_name,
            mint_date: holding.minted_at,
        });
    }

    groups.into_iter().map(|(group, _)| group).collect()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
pub(crate) mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::domain::{Badge, Collection, Event, EventRecord, HolderId};

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        let Some(ts) = Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).single() else {
            panic!("valid timestamp");
        };
        ts
    }

    pub(crate) fn collection(name: &str) -> Collection {
        Collection {
            id: CollectionId::new(),
            name: name.to_string(),
            description: None,
            mint_authority: None,
            is_active: true,
            total_poaps: 0,
            unique_holders: 0,
            created_at: at(1, 1),
        }
    }

    pub(crate) fn event(collection: &Collection, name: &str, month: &str, day: u32) -> Event {
        Event {
            id: EventId::new(),
            collection_id: collection.id,
            name: name.to_string(),
            month: month.to_string(),
            year: 2024,
            start_date: at(1, day),
            end_date: at(1, day),
            authority: "authority".to_string(),
            is_active: true,
            is_closed: false,
            max_supply: None,
        }
    }

    pub(crate) fn held(event: &Event, wallet: &str) -> BadgeRecord {
        let badge = Badge {
            id: BadgeId::new(),
            collection_id: event.collection_id,
            event_id: event.id,
            name: format!("{} badge", event.name),
            description: None,
            image: "ipfs://badge".to_string(),
            asset_id: uuid::Uuid::new_v4().to_string(),
            is_burned: false,
            is_frozen: false,
            created_at: event.start_date,
        };
        BadgeRecord {
            holders: vec![Holder {
                id: HolderId::new(),
                badge_id: badge.id,
                wallet_address: wallet.to_string(),
                acquired_at: badge.created_at,
                transferred_at: None,
                transferred_to: None,
            }],
            badge,
        }
    }

    pub(crate) fn record(
        collection: Collection,
        events: Vec<(Event, Vec<&str>)>,
    ) -> CollectionRecord {
        CollectionRecord {
            collection,
            events: events
                .into_iter()
                .map(|(event, wallets)| EventRecord {
                    badges: wallets.into_iter().map(|w| held(&event, w)).collect(),
                    event,
                })
                .collect(),
        }
    }

    /// Acme: "Jan Meetup" (1 badge to W1), "Feb Meetup" (badges to W1 and W2).
    pub(crate) fn acme() -> CollectionRecord {
        let acme = collection("Acme");
        let feb = event(&acme, "Feb Meetup", "February", 20);
        let jan = event(&acme, "Jan Meetup", "January", 10);
        record(acme, vec![(feb, vec!["W1", "W2"]), (jan, vec!["W1"])])
    }

    fn summarize(record: &CollectionRecord) -> CollectionSummary {
        let Ok(summary) = summarize_collection(record) else {
            panic!("aggregation failed");
        };
        summary
    }

    #[test]
    fn acme_scenario() {
        let summary = summarize(&acme());

        assert_eq!(summary.total_poaps, 3);
        assert_eq!(summary.unique_events, 2);
        assert_eq!(summary.most_active_month, "February 2024");

        let ranked: Vec<(&str, u64, u32)> = summary
            .top_collectors
            .iter()
            .map(|c| (c.wallet.as_str(), c.count, c.rank))
            .collect();
        assert_eq!(ranked, vec![("W1", 2, 1), ("W2", 1, 2)]);

        let w1_events: Vec<&str> = summary.top_collectors[0]
            .events
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        // Event order follows the record: newest first.
        assert_eq!(w1_events, vec!["Feb Meetup", "Jan Meetup"]);
    }

    #[test]
    fn collection_without_events() {
        let summary = summarize(&record(collection("Empty"), vec![]));

        assert_eq!(summary.total_poaps, 0);
        assert_eq!(summary.unique_events, 0);
        assert_eq!(summary.most_active_month, NO_ACTIVITY);
        assert!(summary.top_collectors.is_empty());
    }

    #[test]
    fn events_without_badges_still_count_as_events() {
        let c = collection("Quiet");
        let a = event(&c, "A", "March", 1);
        let b = event(&c, "B", "April", 2);
        let summary = summarize(&record(c, vec![(a, vec![]), (b, vec![])]));

        assert_eq!(summary.total_poaps, 0);
        assert_eq!(summary.unique_events, 2);
        assert_eq!(summary.most_active_month, NO_ACTIVITY);
        assert!(summary.top_collectors.is_empty());
        assert_eq!(summary.events.len(), 2);
    }

    #[test]
    fn repeat_badges_from_one_event_count_but_list_event_once() {
        let c = collection("Repeat");
        let e = event(&c, "Workshop", "May", 3);
        let summary = summarize(&record(c, vec![(e, vec!["W1", "W1", "W1"])]));

        let top = &summary.top_collectors[0];
        assert_eq!(top.count, 3);
        assert_eq!(top.events.len(), 1);
        assert_eq!(summary.events[0].unique_collectors, 1);
    }

    #[test]
    fn ranks_are_dense_and_capped_at_ten() {
        let c = collection("Big");
        let e = event(&c, "Conf", "June", 4);
        let wallets: Vec<String> = (0..15).map(|i| format!("W{i:02}")).collect();
        let mut holders: Vec<&str> = Vec::new();
        for (i, wallet) in wallets.iter().enumerate() {
            for _ in 0..=(i % 4) {
                holders.push(wallet.as_str());
            }
        }
        let summary = summarize(&record(c, vec![(e, holders)]));

        let ranks: Vec<u32> = summary.top_collectors.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, (1..=10).collect::<Vec<u32>>());
        assert!(
            summary
                .top_collectors
                .windows(2)
                .all(|w| w[0].count >= w[1].count)
        );

        let ranked_total: u64 = summary.top_collectors.iter().map(|c| c.count).sum();
        assert!(ranked_total <= summary.total_poaps);
    }

    #[test]
    fn count_conservation_is_exact_with_few_wallets() {
        let summary = summarize(&acme());
        let ranked_total: u64 = summary.top_collectors.iter().map(|c| c.count).sum();
        assert_eq!(ranked_total, summary.total_poaps);
    }

    #[test]
    fn ties_keep_first_encountered_order() {
        let c = collection("Tie");
        let first = event(&c, "First", "July", 5);
        let second = event(&c, "Second", "August", 6);
        let summary = summarize(&record(c, vec![(first, vec!["B"]), (second, vec!["A"])]));

        assert_eq!(summary.most_active_month, "July 2024");
        assert_eq!(summary.top_collectors[0].wallet, "B");
        assert_eq!(summary.top_collectors[1].wallet, "A");
    }

    #[test]
    fn months_aggregate_across_events_by_stored_label() {
        let c = collection("Months");
        let a = event(&c, "A", "March", 1);
        let b = event(&c, "B", "April", 2);
        let d = event(&c, "C", "March", 3);
        let summary = summarize(&record(
            c,
            vec![(a, vec!["W1"]), (b, vec!["W1", "W2"]), (d, vec!["W3", "W4"])],
        ));

        assert_eq!(summary.most_active_month, "March 2024");
    }

    #[test]
    fn only_current_holders_count() {
        let mut rec = acme();
        let Some(badge) = rec.events[0].badges.first_mut() else {
            panic!("expected badge");
        };
        let now = badge.badge.created_at;
        badge.holders[0].transferred_at = Some(now);
        badge.holders[0].transferred_to = Some("W9".to_string());
        badge.holders.push(Holder {
            id: HolderId::new(),
            badge_id: badge.badge.id,
            wallet_address: "W9".to_string(),
            acquired_at: now,
            transferred_at: None,
            transferred_to: None,
        });
        if let Some(burned) = rec.events[1].badges.first_mut() {
            burned.badge.is_burned = true;
        }

        let summary = summarize(&rec);
        assert_eq!(summary.total_poaps, 2);
        let wallets: Vec<&str> = summary
            .top_collectors
            .iter()
            .map(|c| c.wallet.as_str())
            .collect();
        assert_eq!(wallets, vec!["W9", "W2"]);
    }

    #[test]
    fn mismatched_collection_reference_is_rejected() {
        let mut rec = acme();
        rec.events[0].badges[0].badge.collection_id = CollectionId::new();

        assert!(matches!(
            summarize_collection(&rec),
            Err(AggregationError::BadgeCollectionMismatch { .. })
        ));
    }

    #[test]
    fn several_open_holder_rows_are_rejected() {
        let mut rec = acme();
        let badge = &mut rec.events[0].badges[0];
        let mut duplicate = badge.holders[0].clone();
        duplicate.id = HolderId::new();
        duplicate.wallet_address = "W7".to_string();
        badge.holders.push(duplicate);

        assert!(matches!(
            summarize_collection(&rec),
            Err(AggregationError::MultipleCurrentHolders { count: 2, .. })
        ));
    }

    #[test]
    fn aggregation_is_deterministic() {
        let rec = acme();
        let (Ok(first), Ok(second)) = (
            serde_json::to_string(&summarize(&rec)),
            serde_json::to_string(&summarize(&rec)),
        ) else {
            panic!("serialization failed");
        };
        assert_eq!(first, second);
    }

    #[test]
    fn wallet_holdings_group_by_collection() {
        let acme_id = CollectionId::new();
        let other_id = CollectionId::new();
        let event_a = EventId::new();
        let event_b = EventId::new();
        let holding = |collection_id, event_id, month| WalletHolding {
            collection_id,
            collection_name: "name".to_string(),
            event_id,
            event_name: "event".to_string(),
            badge_id: BadgeId::new(),
            badge_name: "badge".to_string(),
            image: "img".to_string(),
            minted_at: at(month, 1),
        };

        let groups = group_wallet_holdings(vec![
            holding(acme_id, event_a, 1),
            holding(other_id, event_b, 2),
            holding(acme_id, event_a, 3),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].collection_id, acme_id);
        assert_eq!(groups[0].total_poaps, 2);
        assert_eq!(groups[0].unique_events, 1);
        assert_eq!(groups[0].first_poap_date, at(1, 1));
        assert_eq!(groups[0].latest_poap_date, at(3, 1));
        assert_eq!(groups[1].total_poaps, 1);
    }

    #[test]
    fn global_ranks_follow_input_order() {
        let ranked = rank_wallets(vec![("A".to_string(), 5), ("B".to_string(), 5)]);
        let ranks: Vec<(u32, &str)> = ranked.iter().map(|c| (c.rank, c.wallet.as_str())).collect();
        assert_eq!(ranks, vec![(1, "A"), (2, "B")]);
    }
}
