pub mod aggregator;
pub mod feed;
pub mod read_state;

pub use aggregator::NotificationAggregator;
pub use feed::NotificationFeed;
pub use read_state::ReadStateStore;
