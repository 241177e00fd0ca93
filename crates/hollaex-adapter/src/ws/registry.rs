/*
[INPUT]:  Requested subscription topics
[OUTPUT]: Desired subscription set and the topics that must go on the wire
[POS]:    WebSocket layer - subscription bookkeeping (no I/O)
[UPDATE]: When changing suppression or replay rules
*/

use std::collections::BTreeSet;

use super::topic::Topic;

/// Desired subscription set.
///
/// Every method returns the topics that need a frame; the caller sends them.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    desired: BTreeSet<Topic>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the desired set.
    ///
    /// Scoped market topics whose channel-wide topic is also requested are
    /// dropped, as [`subscribe`](Self::subscribe) would.
    pub fn replace<I: IntoIterator<Item = Topic>>(&mut self, topics: I) {
        let requested: BTreeSet<Topic> = topics.into_iter().collect();
        self.desired = requested
            .iter()
            .filter(|topic| !(topic.is_scoped() && requested.contains(&topic.unscoped())))
            .cloned()
            .collect();
    }

    /// Add topics; returns the ones that were newly added and not suppressed.
    ///
    /// A scoped market topic whose channel-wide topic is already desired is
    /// neither added nor returned.
    pub fn subscribe(&mut self, topics: &[Topic]) -> Vec<Topic> {
        let mut to_send = Vec::new();
        for topic in topics {
            if self.desired.contains(topic) || self.is_suppressed(topic) {
                continue;
            }
            self.desired.insert(topic.clone());
            to_send.push(topic.clone());
        }
        to_send
    }

    /// Remove topics; returns the ones that were present.
    pub fn unsubscribe(&mut self, topics: &[Topic]) -> Vec<Topic> {
        topics
            .iter()
            .filter(|topic| self.desired.remove(*topic))
            .cloned()
            .collect()
    }

    /// Every desired topic that should be subscribed on a fresh socket.
    pub fn replay(&self) -> Vec<Topic> {
        self.desired
            .iter()
            .filter(|topic| !self.is_suppressed(topic))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.desired.clear();
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.desired.contains(topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.desired.iter()
    }

    pub fn len(&self) -> usize {
        self.desired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.desired.is_empty()
    }

    fn is_suppressed(&self, topic: &Topic) -> bool {
        topic.is_scoped() && self.desired.contains(&topic.unscoped())
    }
}
