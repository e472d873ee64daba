//! Push notifications for row changes, and a reducer that keeps an
//! in-memory list in step with them.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::domain::{
    Branch, Category, CompletedOrder, Department, DiningTable, Hall, Ingredient, Modifier,
    Product, RestaurantId, SemiFinished, StaffUser, SubCategory, Warehouse,
};

const FEED_CAPACITY: usize = 256;

/// A row that can travel over a change feed.
pub trait Record: Clone + Send + Sync + 'static {
    fn record_id(&self) -> String;
    fn owner(&self) -> RestaurantId;
}

macro_rules! impl_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Record for $ty {
                fn record_id(&self) -> String {
                    self.id.to_string()
                }

                fn owner(&self) -> RestaurantId {
                    self.restaurant_id
                }
            }
        )*
    };
}

impl_record!(
    CompletedOrder,
    DiningTable,
    Branch,
    Hall,
    Category,
    SubCategory,
    Product,
    Modifier,
    Department,
    StaffUser,
    Ingredient,
    SemiFinished,
    Warehouse,
);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "record", rename_all = "lowercase")]
pub enum ChangeEvent<T> {
    Inserted(T),
    Updated(T),
    Deleted(T),
}

impl<T> ChangeEvent<T> {
    pub fn record(&self) -> &T {
        match self {
            ChangeEvent::Inserted(r) | ChangeEvent::Updated(r) | ChangeEvent::Deleted(r) => r,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Inserted(_) => "inserted",
            ChangeEvent::Updated(_) => "updated",
            ChangeEvent::Deleted(_) => "deleted",
        }
    }
}

/// Which rows a subscriber wants to hear about. Only equality on the
/// owning restaurant is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    All,
    Restaurant(RestaurantId),
}

impl RowFilter {
    pub fn matches<T: Record>(&self, record: &T) -> bool {
        match self {
            RowFilter::All => true,
            RowFilter::Restaurant(id) => record.owner() == *id,
        }
    }
}

/// Fan-out of change events for one kind of row.
pub struct ChangeFeed<T> {
    tx: broadcast::Sender<ChangeEvent<T>>,
}

impl<T: Record> ChangeFeed<T> {
    pub fn new() -> Self {
        Self::with_capacity(FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns how many subscribers received the event. No subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent<T>) -> usize {
        tracing::debug!(kind = event.kind(), id = %event.record().record_id(), "publishing change");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self, filter: RowFilter) -> Subscription<T> {
        let rx = self.tx.subscribe();
        let events = stream::unfold(rx, move |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) if filter.matches(event.record()) => return Some((event, rx)),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "change feed subscriber lagged, events dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });

        Subscription {
            events: Box::pin(events),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Record> Default for ChangeFeed<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A live stream of change events. Dropping it unsubscribes.
pub struct Subscription<T> {
    events: Pin<Box<dyn Stream<Item = ChangeEvent<T>> + Send>>,
}

impl<T> Subscription<T> {
    pub fn unsubscribe(self) {}
}

impl<T> Stream for Subscription<T> {
    type Item = ChangeEvent<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }
}

/// Feeds for every row kind the console lists live.
#[derive(Default)]
pub struct Feeds {
    pub orders: ChangeFeed<CompletedOrder>,
    pub tables: ChangeFeed<DiningTable>,
    pub branches: ChangeFeed<Branch>,
    pub halls: ChangeFeed<Hall>,
    pub categories: ChangeFeed<Category>,
    pub sub_categories: ChangeFeed<SubCategory>,
    pub products: ChangeFeed<Product>,
    pub modifiers: ChangeFeed<Modifier>,
    pub departments: ChangeFeed<Department>,
    pub staff: ChangeFeed<StaffUser>,
    pub ingredients: ChangeFeed<Ingredient>,
    pub semi_finished: ChangeFeed<SemiFinished>,
    pub warehouses: ChangeFeed<Warehouse>,
}

/// In-memory list kept current by applying change events, newest first.
#[derive(Debug, Clone)]
pub struct LiveCollection<T> {
    items: Vec<T>,
}

impl<T: Record> LiveCollection<T> {
    pub fn new(initial: Vec<T>) -> Self {
        Self { items: initial }
    }

    pub fn apply(&mut self, event: ChangeEvent<T>) {
        match event {
            ChangeEvent::Inserted(record) | ChangeEvent::Updated(record) => {
                let id = record.record_id();
                match self.position(&id) {
                    Some(index) => self.items[index] = record,
                    None => self.items.insert(0, record),
                }
            }
            ChangeEvent::Deleted(record) => {
                let id = record.record_id();
                self.items.retain(|item| item.record_id() != id);
            }
        }
    }

    /// Apply events from `events` until it ends or `limit` events were applied.
    pub async fn follow<S>(&mut self, events: &mut S, limit: usize) -> usize
    where
        S: Stream<Item = ChangeEvent<T>> + Unpin,
    {
        let mut applied = 0;
        while applied < limit {
            match events.next().await {
                Some(event) => {
                    self.apply(event);
                    applied += 1;
                }
                None => break,
            }
        }
        applied
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.record_id() == id)
    }
}
