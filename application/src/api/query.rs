//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{
    query::{
        self,
        listings::{Browse, Pick},
    },
    read::listing::list,
    Query as _,
};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Fetches the page of available `Listing`s matching the provided
    /// `filter`.
    ///
    /// Pages beyond the last one are clamped to it. Without any sort order
    /// `Listing`s on the page come in random order.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PAGE` - the `page` is not positive;
    /// - `INVALID_RANGE` - a `filter` range is inverted or out of allowed
    ///                     values;
    /// - `INVALID_FILTER` - a `filter` contains an invalid text value.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "listings",
            otel.name = Self::SPAN_NAME,
            page = page,
            sort = ?sort,
        ),
    )]
    pub async fn listings(
        filter: Option<api::listing::Filter>,
        #[graphql(default = 1)] page: i32,
        sort: Option<api::listing::Sort>,
        ctx: &Context,
    ) -> Result<api::listing::Page, Error> {
        let page = u32::try_from(page)
            .ok()
            .and_then(list::PageNumber::new)
            .ok_or_else(|| api::PaginationError::InvalidPage.into())
            .map_err(ctx.error())?;
        let filter = filter
            .unwrap_or_default()
            .into_list(&ctx.service().config().listings.bounds)
            .map_err(Error::from)
            .map_err(ctx.error())?;

        ctx.service()
            .execute(Browse {
                filter,
                page,
                sort: sort.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Listing` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `LISTING_NOT_EXISTS` - the `Listing` with the specified ID does not
    ///                          exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "listing",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn listing(
        id: api::listing::Id,
        ctx: &Context,
    ) -> Result<api::Listing, Error> {
        ctx.service()
            .execute(query::listing::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::ListingError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Listing`s with the specified IDs, in the same order.
    ///
    /// Repeated IDs are repeated, unknown IDs are skipped.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "listingsByIds",
            ids.len = ids.len(),
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn listings_by_ids(
        ids: Vec<api::listing::Id>,
        ctx: &Context,
    ) -> Result<Vec<api::Listing>, Error> {
        ctx.service()
            .execute(Pick(ids.into_iter().map(Into::into).collect()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|items| items.into_iter().map(Into::into).collect())
    }
}
