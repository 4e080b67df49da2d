use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::debug;

use quire_types::EntryRef;

use crate::error::{EventError, EventResult};
use crate::event::{BlogEvent, EventKind, Subject};
use crate::listener::{SubmissionEvent, SubmissionListener};

/// Default capacity of each subscriber's channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Filter for subscribing to a subset of blog events.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// If set, only events about these subjects are delivered.
    pub subjects: Option<Vec<Subject>>,
    /// If set, only events of these kinds are delivered.
    pub kinds: Option<Vec<EventKind>>,
    /// If set, only events belonging to this entry are delivered.
    pub entry: Option<EntryRef>,
}

impl EventFilter {
    /// Returns `true` if the given event matches this filter.
    pub fn matches(&self, event: &BlogEvent) -> bool {
        if let Some(ref subjects) = self.subjects {
            if !subjects.contains(&event.subject) {
                return false;
            }
        }
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if let Some(ref entry) = self.entry {
            if event.entry_ref.as_ref() != Some(entry) {
                return false;
            }
        }
        true
    }
}

/// Receiving end of a subscription.
pub struct EventStream {
    rx: broadcast::Receiver<BlogEvent>,
}

impl EventStream {
    /// Wait for the next matching event.
    pub async fn next(&mut self) -> EventResult<BlogEvent> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventError::Closed,
            broadcast::error::RecvError::Lagged(n) => EventError::Lagged(n),
        })
    }

    /// Take an already-delivered event without waiting.
    pub fn try_next(&mut self) -> EventResult<Option<BlogEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(EventError::Closed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => Err(EventError::Lagged(n)),
        }
    }
}

struct Subscriber {
    filter: EventFilter,
    sender: broadcast::Sender<BlogEvent>,
}

/// The two extension points around persistence.
///
/// * Pre-persist: [`SubmissionListener`]s registered with
///   [`add_listener`](Self::add_listener) run synchronously, in
///   registration order, on the submitting thread. They can rewrite or
///   veto a comment.
/// * Post-persist: [`broadcast`](Self::broadcast) fans a [`BlogEvent`] out
///   to every matching subscriber over a `tokio` broadcast channel.
///   Delivery never blocks the emitter; slow subscribers lag and closed
///   ones are pruned.
pub struct EventBroadcaster {
    listeners: RwLock<Vec<Arc<dyn SubmissionListener>>>,
    subscribers: RwLock<Vec<Subscriber>>,
    capacity: usize,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            subscribers: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn SubmissionListener>) {
        self.listeners
            .write()
            .expect("listener lock poisoned")
            .push(listener);
    }

    /// Run every pre-persist listener over `event`.
    pub fn process(&self, event: &mut SubmissionEvent) {
        let listeners = self.listeners.read().expect("listener lock poisoned");
        for listener in listeners.iter() {
            listener.process(event);
            debug!(
                listener = listener.name(),
                destroyed = event.is_destroyed(),
                "submission listener ran"
            );
        }
    }

    pub fn subscribe(&self, filter: EventFilter) -> EventStream {
        let (tx, rx) = broadcast::channel(self.capacity);
        self.subscribers
            .write()
            .expect("router lock poisoned")
            .push(Subscriber { filter, sender: tx });
        EventStream { rx }
    }

    /// Deliver `event` to matching subscribers. Returns how many received it.
    pub fn broadcast(&self, event: BlogEvent) -> usize {
        let mut delivered = 0;
        let mut subs = self.subscribers.write().expect("router lock poisoned");
        subs.retain(|sub| {
            if sub.filter.matches(&event) {
                let ok = sub.sender.send(event.clone()).is_ok();
                if ok {
                    delivered += 1;
                }
                ok
            } else {
                sub.sender.receiver_count() > 0
            }
        });
        debug!(event = %event.name(), id = %event.id, delivered, "event broadcast");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().expect("router lock poisoned").len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().expect("listener lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use quire_types::{CategoryPath, Metadata, ResponseId};

    use super::*;

    fn rid(s: &str) -> ResponseId {
        s.parse().unwrap()
    }

    fn submission() -> SubmissionEvent {
        SubmissionEvent {
            blog: "/blog".into(),
            entry: EntryRef::new(CategoryPath::root(), "p.txt").unwrap(),
            ip: "10.0.0.1".into(),
            author: "A".into(),
            author_email: String::new(),
            author_url: String::new(),
            body: "buy cheap pills".into(),
            metadata: Metadata::new(),
            timestamp: Utc::now(),
        }
    }

    struct SpamVeto;

    impl SubmissionListener for SpamVeto {
        fn name(&self) -> &str {
            "spam-veto"
        }

        fn process(&self, event: &mut SubmissionEvent) {
            if event.body.contains("pills") {
                event.destroy();
            }
        }
    }

    struct Counter(AtomicUsize);

    impl SubmissionListener for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn process(&self, _event: &mut SubmissionEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    // ---------------------------------------------------------------
    // Pre-persist listeners
    // ---------------------------------------------------------------

    #[test]
    fn listeners_run_in_order_and_can_veto() {
        let broadcaster = EventBroadcaster::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        broadcaster.add_listener(counter.clone());
        broadcaster.add_listener(Arc::new(SpamVeto));
        assert_eq!(broadcaster.listener_count(), 2);

        let mut event = submission();
        broadcaster.process(&mut event);
        assert!(event.is_destroyed());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    // ---------------------------------------------------------------
    // Post-persist broadcast
    // ---------------------------------------------------------------

    #[test]
    fn subscriber_receives_matching_events() {
        let broadcaster = EventBroadcaster::new();
        let mut stream = broadcaster.subscribe(EventFilter {
            kinds: Some(vec![EventKind::Added]),
            ..Default::default()
        });

        let id = rid("p.txt/A.cmt");
        broadcaster.broadcast(BlogEvent::response("/blog", EventKind::Added, &id, Utc::now()));
        broadcaster.broadcast(BlogEvent::response("/blog", EventKind::Deleted, &id, Utc::now()));

        let got = stream.try_next().unwrap().unwrap();
        assert_eq!(got.name(), "CommentAdded");
        assert_eq!(stream.try_next().unwrap(), None);
    }

    #[test]
    fn entry_filter_scopes_delivery() {
        let broadcaster = EventBroadcaster::new();
        let mine = EntryRef::new(CategoryPath::root(), "mine.txt").unwrap();
        let mut stream = broadcaster.subscribe(EventFilter {
            entry: Some(mine),
            ..Default::default()
        });

        let delivered = broadcaster.broadcast(BlogEvent::response(
            "/blog",
            EventKind::Added,
            &rid("other.txt/A.cmt"),
            Utc::now(),
        ));
        assert_eq!(delivered, 0);
        let delivered = broadcaster.broadcast(BlogEvent::response(
            "/blog",
            EventKind::Added,
            &rid("mine.txt/A.cmt"),
            Utc::now(),
        ));
        assert_eq!(delivered, 1);
        assert!(stream.try_next().unwrap().is_some());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let broadcaster = EventBroadcaster::new();
        let stream = broadcaster.subscribe(EventFilter::default());
        assert_eq!(broadcaster.subscriber_count(), 1);
        drop(stream);
        broadcaster.broadcast(BlogEvent::response(
            "/blog",
            EventKind::Added,
            &rid("p.txt/A.cmt"),
            Utc::now(),
        ));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn slow_subscriber_lags() {
        let broadcaster = EventBroadcaster::with_capacity(2);
        let mut stream = broadcaster.subscribe(EventFilter::default());
        for _ in 0..5 {
            broadcaster.broadcast(BlogEvent::response(
                "/blog",
                EventKind::Updated,
                &rid("p.txt/A.cmt"),
                Utc::now(),
            ));
        }
        assert!(matches!(stream.try_next(), Err(EventError::Lagged(_))));
    }

    #[tokio::test]
    async fn async_subscriber_receives_across_tasks() {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let mut stream = broadcaster.subscribe(EventFilter {
            subjects: Some(vec![Subject::Pingback]),
            ..Default::default()
        });

        let b = Arc::clone(&broadcaster);
        let emitter = tokio::spawn(async move {
            b.broadcast(BlogEvent::response(
                "/blog",
                EventKind::Approved,
                &rid("p.txt/X.pingback"),
                Utc::now(),
            ));
        });

        let event = stream.next().await.unwrap();
        emitter.await.unwrap();
        assert_eq!(event.name(), "PingbackApproved");
    }

    #[tokio::test]
    async fn closed_when_broadcaster_dropped() {
        let broadcaster = EventBroadcaster::new();
        let mut stream = broadcaster.subscribe(EventFilter::default());
        drop(broadcaster);
        assert_eq!(stream.next().await.unwrap_err(), EventError::Closed);
    }
}
