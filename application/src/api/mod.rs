//! GraphQL API definitions.

pub mod listing;
mod query;
pub mod scalar;

use juniper::{EmptyMutation, EmptySubscription};

use crate::{define_error, Context};

pub use self::{listing::Listing, query::Query};

/// GraphQL schema.
pub type Schema = juniper::RootNode<
    'static,
    Query,
    EmptyMutation<Context>,
    EmptySubscription<Context>,
>;

/// Creates a new [`Schema`].
#[must_use]
pub fn schema() -> Schema {
    Schema::new(Query, EmptyMutation::new(), EmptySubscription::new())
}

define_error! {
    enum ListingError {
        #[code = "LISTING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Listing` with the provided ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum FilterError {
        #[code = "INVALID_RANGE"]
        #[status = BAD_REQUEST]
        #[message = "Lower bound of the range exceeds its upper bound"]
        InvertedRange,

        #[code = "INVALID_RANGE"]
        #[status = BAD_REQUEST]
        #[message = "Range bound is out of the allowed values"]
        OutOfRange,

        #[code = "INVALID_FILTER"]
        #[status = BAD_REQUEST]
        #[message = "`ListingFilter` contains an invalid value"]
        InvalidValue,
    }
}

define_error! {
    enum PaginationError {
        #[code = "INVALID_PAGE"]
        #[status = BAD_REQUEST]
        #[message = "Page number must be positive"]
        InvalidPage,
    }
}
