// Application layer - use cases and orchestration.
// The service is the only caller of the repository; reporting stays pure.

pub mod error;
pub mod feed;
pub mod reporting;
pub mod service;
pub mod session;

pub use error::*;
pub use feed::{ChangeEvent, ChangeFeed, Feeds, LiveCollection, Record, RowFilter, Subscription};
pub use reporting::*;
pub use service::BackOfficeService;
pub use session::{RestaurantScope, Session, SessionStore, hash_password, verify_password};
