use crate::types::StreamMessage;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Callback invoked with an owned copy of each matching inbound record.
pub type SubscriberCallback = Arc<dyn Fn(StreamMessage) + Send + Sync>;

/// One registered consumer of inbound data records.
pub struct Subscription {
    pub id: String,
    pub callback: SubscriberCallback,
    /// `None` subscribes to every project
    pub project_filter: Option<String>,
}

/// Ordered set of independent data consumers.
///
/// Callbacks are supplied by external callers; the registry never inspects
/// them, only invokes them. Registration order is delivery order.
#[derive(Default)]
pub struct SubscriberRegistry {
    entries: Vec<Subscription>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a callback, optionally filtered to one project
    /// discriminator. Returns the subscription id.
    pub fn add(&mut self, callback: SubscriberCallback, project_filter: Option<String>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.entries.push(Subscription {
            id: id.clone(),
            callback,
            project_filter,
        });
        id
    }

    /// Remove a subscription; returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|sub| sub.id != id);
        self.entries.len() != before
    }

    /// Snapshot the subscriptions matching a record's discriminator, in
    /// registration order. A filterless subscription matches everything.
    pub fn matching(&self, project: Option<&str>) -> Vec<(String, SubscriberCallback)> {
        self.entries
            .iter()
            .filter(|sub| match (&sub.project_filter, project) {
                (None, _) => true,
                (Some(filter), Some(p)) => filter == p,
                (Some(_), None) => false,
            })
            .map(|sub| (sub.id.clone(), Arc::clone(&sub.callback)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Fan a record out to a snapshot of subscribers, isolating each callback
/// failure: a panicking callback is reported and delivery continues.
pub fn deliver(
    targets: &[(String, SubscriberCallback)],
    record: &StreamMessage,
    mut report: impl FnMut(String),
) {
    for (id, callback) in targets {
        let outcome = catch_unwind(AssertUnwindSafe(|| callback(record.clone())));
        if outcome.is_err() {
            report(format!("subscriber {} panicked during delivery", id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameKind;
    use std::sync::Mutex;

    fn record(project: Option<&str>) -> StreamMessage {
        let mut msg = StreamMessage::new(
            FrameKind::Data("gesture_frame".to_string()),
            serde_json::json!({"landmarks": []}),
        );
        msg.project = project.map(str::to_string);
        msg
    }

    fn collector() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> SubscriberCallback) {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_for_make = Arc::clone(&seen);
        let make = move |tag: &str| -> SubscriberCallback {
            let seen = Arc::clone(&seen_for_make);
            let tag = tag.to_string();
            Arc::new(move |_msg| seen.lock().unwrap().push(tag.clone()))
        };
        (seen, make)
    }

    #[test]
    fn filters_route_records_exactly() {
        let (seen, make) = collector();
        let mut registry = SubscriberRegistry::new();
        registry.add(make("alpha"), Some("alpha".to_string()));
        registry.add(make("beta"), Some("beta".to_string()));
        registry.add(make("any"), None);

        deliver(&registry.matching(Some("alpha")), &record(Some("alpha")), |_| {});
        deliver(&registry.matching(Some("beta")), &record(Some("beta")), |_| {});
        deliver(&registry.matching(Some("gamma")), &record(Some("gamma")), |_| {});

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["alpha", "any", "beta", "any", "any"]
        );
    }

    #[test]
    fn record_without_discriminator_only_reaches_unfiltered() {
        let (seen, make) = collector();
        let mut registry = SubscriberRegistry::new();
        registry.add(make("alpha"), Some("alpha".to_string()));
        registry.add(make("any"), None);

        deliver(&registry.matching(None), &record(None), |_| {});

        assert_eq!(*seen.lock().unwrap(), vec!["any"]);
    }

    #[test]
    fn removed_subscription_is_not_delivered() {
        let (seen, make) = collector();
        let mut registry = SubscriberRegistry::new();
        let id = registry.add(make("first"), None);
        registry.add(make("second"), None);

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));

        deliver(&registry.matching(Some("any")), &record(Some("any")), |_| {});
        assert_eq!(*seen.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn panicking_subscriber_does_not_block_the_rest() {
        let (seen, make) = collector();
        let mut registry = SubscriberRegistry::new();
        registry.add(make("before"), None);
        registry.add(
            Arc::new(|_msg| panic!("subscriber bug")),
            None,
        );
        registry.add(make("after"), None);

        let mut failures = Vec::new();
        deliver(&registry.matching(Some("p")), &record(Some("p")), |msg| {
            failures.push(msg)
        });

        assert_eq!(*seen.lock().unwrap(), vec!["before", "after"]);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("panicked"));
    }
}
