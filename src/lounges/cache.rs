use std::collections::{BTreeMap, BTreeSet};

use crate::realtime::RealtimeEvent;

use super::Lounge;

#[derive(Debug, Clone, PartialEq)]
struct CachedLounge {
    page_id: String,
    name: String,
    members: BTreeSet<String>,
}

/// A connected session's mirror of one page's lounge listing.
///
/// Two writers feed it: the session's own action responses (optimistic) and
/// the events other sessions broadcast. Both go through [`LoungeCache::apply`],
/// so a delta that arrives twice (optimistic apply plus the echoed broadcast,
/// or a stale duplicate) lands on a set operation and changes nothing the
/// second time.
#[derive(Debug, Default, Clone)]
pub struct LoungeCache {
    lounges: BTreeMap<String, CachedLounge>,
}

impl LoungeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cache with a fresh `joinPage` hydration.
    pub fn hydrate(listing: &[Lounge]) -> Self {
        let mut cache = Self::new();
        for lounge in listing {
            cache.insert(lounge.clone());
        }
        cache
    }

    fn insert(&mut self, lounge: Lounge) {
        self.lounges.insert(
            lounge.id,
            CachedLounge {
                page_id: lounge.page_id,
                name: lounge.name,
                members: lounge.user_ids.into_iter().collect(),
            },
        );
    }

    /// The single merge rule. Add is set-union, remove is set-difference; a
    /// removal that empties a lounge drops it from the listing, matching the
    /// server's soft-hide. Events about lounges this cache no longer holds
    /// are ignored (a stale delta after a hide).
    pub fn apply(&mut self, event: &RealtimeEvent) {
        match event {
            RealtimeEvent::UserAddedToLounge { user_id, lounge_id } => {
                if let Some(lounge) = self.lounges.get_mut(lounge_id) {
                    lounge.members.insert(user_id.clone());
                }
            }
            RealtimeEvent::UserRemovedFromLounge { user_id, lounge_id } => {
                if let Some(lounge) = self.lounges.get_mut(lounge_id) {
                    lounge.members.remove(user_id);
                    if lounge.members.is_empty() {
                        self.lounges.remove(lounge_id);
                    }
                }
            }
            RealtimeEvent::NewLounge { lounge } => {
                self.insert(lounge.clone());
            }
            RealtimeEvent::UserJoinedPage { .. } => {}
        }
    }

    pub fn members_of(&self, lounge_id: &str) -> Option<Vec<String>> {
        self.lounges
            .get(lounge_id)
            .map(|lounge| lounge.members.iter().cloned().collect())
    }

    /// The listing, keyed order (non-empty lounges only, by construction).
    pub fn listing(&self) -> Vec<Lounge> {
        self.lounges
            .iter()
            .map(|(id, lounge)| Lounge {
                id: id.clone(),
                page_id: lounge.page_id.clone(),
                name: lounge.name.clone(),
                user_ids: lounge.members.iter().cloned().collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lounge(id: &str, members: &[&str]) -> Lounge {
        Lounge {
            id: id.to_owned(),
            page_id: "p1".to_owned(),
            name: format!("lounge {id}"),
            user_ids: members.iter().map(|m| (*m).to_owned()).collect(),
        }
    }

    fn add(user: &str, lounge: &str) -> RealtimeEvent {
        RealtimeEvent::UserAddedToLounge {
            user_id: user.to_owned(),
            lounge_id: lounge.to_owned(),
        }
    }

    fn remove(user: &str, lounge: &str) -> RealtimeEvent {
        RealtimeEvent::UserRemovedFromLounge {
            user_id: user.to_owned(),
            lounge_id: lounge.to_owned(),
        }
    }

    #[test]
    fn duplicate_delivery_changes_nothing() {
        let mut cache = LoungeCache::hydrate(&[lounge("l1", &["alice"])]);

        // optimistic apply followed by the echoed broadcast
        cache.apply(&add("bob", "l1"));
        cache.apply(&add("bob", "l1"));

        assert_eq!(cache.members_of("l1").unwrap(), vec!["alice", "bob"]);
    }

    #[test]
    fn removing_an_absent_member_is_a_no_op() {
        let mut cache = LoungeCache::hydrate(&[lounge("l1", &["alice"])]);

        cache.apply(&remove("bob", "l1"));
        cache.apply(&remove("bob", "l1"));

        assert_eq!(cache.members_of("l1").unwrap(), vec!["alice"]);
    }

    #[test]
    fn fold_of_deltas_matches_set_semantics() {
        let mut cache = LoungeCache::hydrate(&[lounge("l1", &[])]);
        // hydrating an empty lounge never happens server-side; stand one up
        // through its creation event instead
        cache.apply(&RealtimeEvent::NewLounge { lounge: lounge("l2", &[]) });

        cache.apply(&add("alice", "l2"));
        cache.apply(&add("alice", "l2"));
        cache.apply(&add("bob", "l2"));
        cache.apply(&remove("alice", "l2"));

        assert_eq!(cache.members_of("l2").unwrap(), vec!["bob"]);
    }

    #[test]
    fn emptied_lounge_leaves_the_listing() {
        let mut cache = LoungeCache::hydrate(&[lounge("l1", &["alice", "bob"])]);

        cache.apply(&remove("alice", "l1"));
        assert_eq!(cache.listing().len(), 1);

        cache.apply(&remove("bob", "l1"));
        assert!(cache.listing().is_empty());
        assert!(cache.members_of("l1").is_none());
    }

    #[test]
    fn stale_events_for_hidden_lounges_are_ignored() {
        let mut cache = LoungeCache::hydrate(&[lounge("l1", &["alice"])]);

        cache.apply(&remove("alice", "l1"));
        cache.apply(&remove("alice", "l1"));
        cache.apply(&add("bob", "unknown"));

        assert!(cache.listing().is_empty());
    }

    #[test]
    fn new_lounge_event_renders_without_a_refetch() {
        let mut cache = LoungeCache::new();

        cache.apply(&RealtimeEvent::NewLounge { lounge: lounge("l1", &[]) });
        cache.apply(&add("alice", "l1"));

        assert_eq!(cache.members_of("l1").unwrap(), vec!["alice"]);
    }
}
