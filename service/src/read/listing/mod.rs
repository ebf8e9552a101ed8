//! [`Listing`]-related read definitions.
//!
//! [`Listing`]: crate::domain::Listing

pub mod feed;
pub mod list;

pub use self::feed::Feed;
