//! Position Fix Library
//!
//! Building blocks for consuming a live stream of GNSS position fixes:
//! - The raw fix and recorded track point data model
//! - The position source and permission provider traits
//! - Subscriptions that stop delivery as soon as they are released
//! - A JSON-lines stream reader for recorded fixes
//! - A handler trait for components that consume fixes
//!
//! # Example
//!
//! ```no_run
//! use geofix::{PositionSource, SubscriptionOptions, UpdateFrequency};
//!
//! async fn follow(source: &dyn PositionSource) {
//!     let options = SubscriptionOptions::for_frequency(UpdateFrequency::OneHz);
//!     let mut subscription = source.subscribe(options).await.unwrap();
//!     while let Some(fix) = subscription.next_fix().await {
//!         println!("{}", fix);
//!     }
//! }
//! ```

pub mod error;
pub mod fix;
pub mod fix_handler;
pub mod permission;
pub mod source;
pub mod stream_reader;

// Re-export commonly used types
pub use error::SourceError;
pub use fix::{PositionFix, TrackPoint};
pub use fix_handler::FixHandler;
pub use permission::{PermissionProvider, PermissionStatus};
pub use source::{
    AccuracyTier, PositionSource, Subscription, SubscriptionHandle, SubscriptionOptions, UpdateFrequency,
};
pub use stream_reader::FixStreamReader;
