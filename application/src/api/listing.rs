//! [`Listing`]-related definitions.

use std::{ops::RangeInclusive, str::FromStr};

use common::{DateTime, Handler as _};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{
    graphql_object, GraphQLEnum, GraphQLInputObject, GraphQLObject,
    GraphQLScalar,
};
use service::{
    domain::{
        self,
        listing::{Mileage, Year},
    },
    query,
    read::listing::list,
};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A vehicle listing.
#[derive(Clone, Debug)]
pub struct Listing {
    /// Underlying [`domain::Listing`].
    listing: domain::Listing,

    /// [`domain::Dealership`] owning this [`Listing`], once resolved.
    ///
    /// Resolves to [`None`] if the [`domain::Dealership`] doesn't exist.
    dealership: OnceCell<Option<domain::Dealership>>,
}

impl From<domain::Listing> for Listing {
    fn from(listing: domain::Listing) -> Self {
        Self {
            listing,
            dealership: OnceCell::new(),
        }
    }
}

impl From<list::Item> for Listing {
    fn from(item: list::Item) -> Self {
        let (listing, dealership) = item.into_parts();
        Self::with_dealership(listing, dealership)
    }
}

impl Listing {
    /// Creates a new [`Listing`] with its [`domain::Dealership`] already
    /// resolved.
    #[must_use]
    pub fn with_dealership(
        listing: domain::Listing,
        dealership: Option<domain::Dealership>,
    ) -> Self {
        Self {
            listing,
            dealership: OnceCell::new_with(Some(dealership)),
        }
    }

    /// Returns the [`domain::Dealership`] owning this [`Listing`], fetching
    /// it if it hasn't been resolved yet.
    ///
    /// # Errors
    ///
    /// Errors if failed to fetch the [`domain::Dealership`].
    async fn dealership(
        &self,
        ctx: &Context,
    ) -> Result<Option<&domain::Dealership>, Error> {
        let id = self.listing.dealership_id;
        self.dealership
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::dealerships::ByIds::by(vec![id]))
                    .map_ok(|mut found| found.remove(&id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
            })
            .await
            .map(Option::as_ref)
    }
}

/// A vehicle listing.
#[graphql_object(context = Context)]
impl Listing {
    /// Unique identifier of this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.listing.id.into()
    }

    /// Unique identifier of the `Dealership` owning this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.dealershipId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn dealership_id(&self) -> DealershipId {
        self.listing.dealership_id.into()
    }

    /// Make (manufacturer) of the vehicle.
    pub fn make(&self) -> &str {
        self.listing.make.as_ref()
    }

    /// Model of the vehicle.
    pub fn model(&self) -> &str {
        self.listing.model.as_ref()
    }

    /// Model year of the vehicle.
    pub fn year(&self) -> i32 {
        i16::from(self.listing.year).into()
    }

    /// Asking price.
    pub fn price(&self) -> Price {
        self.listing.price.into()
    }

    /// Mileage of the vehicle.
    pub fn mileage(&self) -> i32 {
        self.listing.mileage.into()
    }

    /// Condition of the vehicle.
    pub fn condition(&self) -> &str {
        self.listing.condition.as_ref()
    }

    /// Category this `Listing` is published in.
    pub fn category(&self) -> &str {
        self.listing.category.as_ref()
    }

    /// Body type of the vehicle.
    #[graphql(name = "type")]
    pub fn body_type(&self) -> &str {
        self.listing.body_type.as_ref()
    }

    /// Transmission of the vehicle.
    pub fn transmission(&self) -> &str {
        self.listing.transmission.as_ref()
    }

    /// Drivetrain of the vehicle.
    pub fn drivetrain(&self) -> &str {
        self.listing.drivetrain.as_ref()
    }

    /// Exterior color of the vehicle.
    pub fn color(&self) -> &str {
        self.listing.color.as_ref()
    }

    /// Free-form description of this `Listing`, if any.
    pub fn description(&self) -> Option<&str> {
        self.listing.description.as_ref().map(AsRef::as_ref)
    }

    /// Sale status of this `Listing`.
    pub fn status(&self) -> Status {
        self.listing.status.into()
    }

    /// URLs of the vehicle images, in display order.
    pub fn images(&self) -> Vec<&str> {
        self.listing.images.iter().map(AsRef::as_ref).collect()
    }

    /// Number of times this `Listing` was viewed.
    pub fn views(&self) -> i32 {
        self.listing.views.into()
    }

    /// Number of times this `Listing` was liked.
    pub fn likes(&self) -> i32 {
        self.listing.likes.into()
    }

    /// `DateTime` when this `Listing` was published.
    pub fn listed_at(&self) -> DateTime {
        self.listing.listed_at.coerce()
    }

    /// Name of the `Dealership` owning this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.dealershipName",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn dealership_name(
        &self,
        ctx: &Context,
    ) -> Result<Option<&str>, Error> {
        Ok(self.dealership(ctx).await?.map(|d| d.name.as_ref()))
    }

    /// URL of the logo of the `Dealership` owning this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.dealershipLogo",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn dealership_logo(
        &self,
        ctx: &Context,
    ) -> Result<Option<&str>, Error> {
        Ok(self
            .dealership(ctx)
            .await?
            .and_then(|d| d.logo.as_ref())
            .map(AsRef::as_ref))
    }

    /// Contact phone of the `Dealership` owning this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.dealershipPhone",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn dealership_phone(
        &self,
        ctx: &Context,
    ) -> Result<Option<&str>, Error> {
        Ok(self
            .dealership(ctx)
            .await?
            .and_then(|d| d.phone.as_ref())
            .map(AsRef::as_ref))
    }

    /// Contact email of the `Dealership` owning this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.dealershipEmail",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn dealership_email(
        &self,
        ctx: &Context,
    ) -> Result<Option<&str>, Error> {
        Ok(self
            .dealership(ctx)
            .await?
            .and_then(|d| d.email.as_ref())
            .map(AsRef::as_ref))
    }

    /// Postal address of the `Dealership` owning this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.dealershipAddress",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn dealership_address(
        &self,
        ctx: &Context,
    ) -> Result<Option<&str>, Error> {
        Ok(self
            .dealership(ctx)
            .await?
            .and_then(|d| d.address.as_ref())
            .map(AsRef::as_ref))
    }

    /// Geographical location of the `Dealership` owning this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.dealershipLocation",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn dealership_location(
        &self,
        ctx: &Context,
    ) -> Result<Option<Location>, Error> {
        Ok(self
            .dealership(ctx)
            .await?
            .and_then(|d| d.location)
            .map(Into::into))
    }
}

/// Unique identifier of a `Listing`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::listing::Id)]
#[into(domain::listing::Id)]
#[graphql(name = "ListingId", transparent)]
pub struct Id(Uuid);

/// Unique identifier of a `Dealership`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::dealership::Id)]
#[into(domain::dealership::Id)]
#[graphql(name = "DealershipId", transparent)]
pub struct DealershipId(Uuid);

/// Non-negative decimal price of a `Listing`, like `"15000.50"`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ListingPrice",
    with = scalar::Via::<domain::listing::Price>,
)]
pub struct Price(domain::listing::Price);

/// Geographical location.
#[derive(Clone, Copy, Debug, GraphQLObject)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,

    /// Longitude in degrees.
    pub longitude: f64,
}

impl From<domain::dealership::Location> for Location {
    fn from(location: domain::dealership::Location) -> Self {
        Self {
            latitude: location.latitude(),
            longitude: location.longitude(),
        }
    }
}

/// Sale status of a `Listing`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ListingStatus")]
pub enum Status {
    /// Open for purchase.
    Available,

    /// Reserved by a buyer.
    Pending,

    /// Already sold.
    Sold,
}

impl From<domain::listing::Status> for Status {
    fn from(status: domain::listing::Status) -> Self {
        use domain::listing::Status as S;

        match status {
            S::Available => Self::Available,
            S::Pending => Self::Pending,
            S::Sold => Self::Sold,
        }
    }
}

/// Sort order of `Listing`s.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ListingSort")]
pub enum Sort {
    /// Cheapest first.
    PriceAsc,

    /// Most expensive first.
    PriceDesc,

    /// Newest model year first.
    YearDesc,

    /// Oldest model year first.
    YearAsc,

    /// Lowest mileage first.
    MileageAsc,

    /// Highest mileage first.
    MileageDesc,

    /// Most recently published first.
    Newest,

    /// Least recently published first.
    Oldest,

    /// Most viewed first.
    MostViewed,
}

impl From<Sort> for list::Sort {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::PriceAsc => Self::PriceAsc,
            Sort::PriceDesc => Self::PriceDesc,
            Sort::YearDesc => Self::YearDesc,
            Sort::YearAsc => Self::YearAsc,
            Sort::MileageAsc => Self::MileageAsc,
            Sort::MileageDesc => Self::MileageDesc,
            Sort::Newest => Self::Newest,
            Sort::Oldest => Self::Oldest,
            Sort::MostViewed => Self::MostViewed,
        }
    }
}

/// Special filter of `Listing`s.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ListingSpecial")]
pub enum Special {
    /// Only `Listing`s published within the last days.
    RecentlyListed,

    /// `Listing`s ordered by view count, most viewed first.
    MostViewed,
}

impl From<Special> for list::Special {
    fn from(special: Special) -> Self {
        match special {
            Special::RecentlyListed => Self::RecentlyListed,
            Special::MostViewed => Self::MostViewed,
        }
    }
}

/// Inclusive range of `ListingPrice`s.
///
/// A missing bound defaults to the lowest or highest allowed price.
#[derive(Clone, Copy, Debug, Default, GraphQLInputObject)]
#[graphql(name = "ListingPriceRange")]
pub struct PriceRange {
    /// Lower bound.
    pub min: Option<Price>,

    /// Upper bound.
    pub max: Option<Price>,
}

/// Inclusive range of integers.
///
/// A missing bound defaults to the lowest or highest allowed value.
#[derive(Clone, Copy, Debug, Default, GraphQLInputObject)]
pub struct IntRange {
    /// Lower bound.
    pub min: Option<i32>,

    /// Upper bound.
    pub max: Option<i32>,
}

/// Filter of `Listing`s.
///
/// Only available `Listing`s are ever returned. Missing or empty lists impose
/// no restriction.
#[derive(Clone, Debug, Default, GraphQLInputObject)]
#[graphql(name = "ListingFilter")]
pub struct Filter {
    /// Free-text query matched against the textual fields of a `Listing` and,
    /// for numbers, against its year, price and mileage.
    pub query: Option<String>,

    /// Categories to include.
    pub categories: Option<Vec<String>>,

    /// Range of prices to include.
    pub price: Option<PriceRange>,

    /// Range of mileages to include.
    pub mileage: Option<IntRange>,

    /// Range of model years to include.
    pub year: Option<IntRange>,

    /// Transmissions to include.
    pub transmissions: Option<Vec<String>>,

    /// Drivetrains to include.
    pub drivetrains: Option<Vec<String>>,

    /// Colors to include.
    pub colors: Option<Vec<String>>,

    /// Makes to include.
    pub makes: Option<Vec<String>>,

    /// Models to include.
    pub models: Option<Vec<String>>,

    /// IDs of `Dealership`s to include the `Listing`s of.
    pub dealership_ids: Option<Vec<DealershipId>>,

    /// Names of `Dealership`s to include the `Listing`s of.
    pub dealership_names: Option<Vec<String>>,

    /// Special filter to apply.
    pub special: Option<Special>,

    /// Sort order to apply.
    pub sort: Option<Sort>,
}

impl Filter {
    /// Converts this [`Filter`] into a [`list::Filter`], defaulting missing
    /// range bounds to the provided [`list::Bounds`].
    ///
    /// # Errors
    ///
    /// Errors if any range is inverted or out of allowed values, or any text
    /// value is invalid.
    pub fn into_list(
        self,
        bounds: &list::Bounds,
    ) -> Result<list::Filter, api::FilterError> {
        let Self {
            query,
            categories,
            price,
            mileage,
            year,
            transmissions,
            drivetrains,
            colors,
            makes,
            models,
            dealership_ids,
            dealership_names,
            special,
            sort,
        } = self;

        Ok(list::Filter {
            query,
            categories: texts(categories)?,
            price: range(
                price.map(|r| (r.min, r.max)),
                &bounds.price,
                |p| Some(p.into()),
            )?,
            mileage: range(
                mileage.map(|r| (r.min, r.max)),
                &bounds.mileage,
                Mileage::new,
            )?,
            year: range(year.map(|r| (r.min, r.max)), &bounds.year, |y| {
                i16::try_from(y).ok().and_then(Year::new)
            })?,
            transmissions: texts(transmissions)?,
            drivetrains: texts(drivetrains)?,
            colors: texts(colors)?,
            makes: texts(makes)?,
            models: texts(models)?,
            dealership_ids: dealership_ids
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect(),
            dealership_names: texts(dealership_names)?,
            special: special.map(Into::into),
            sort: sort.map(Into::into),
        })
    }
}

/// Parses the provided text `values`, trimming them.
fn texts<T: FromStr>(
    values: Option<Vec<String>>,
) -> Result<Vec<T>, api::FilterError> {
    values
        .unwrap_or_default()
        .iter()
        .map(|v| v.trim().parse().map_err(|_| api::FilterError::InvalidValue))
        .collect()
}

/// Resolves the provided optional bounds into a [`RangeInclusive`] within
/// the `allowed` one.
fn range<I, T>(
    input: Option<(Option<I>, Option<I>)>,
    allowed: &RangeInclusive<T>,
    convert: impl Fn(I) -> Option<T>,
) -> Result<RangeInclusive<T>, api::FilterError>
where
    T: Copy + Ord,
{
    let (min, max) = input.unwrap_or((None, None));
    let resolve = |bound: Option<I>, default: T| {
        bound.map_or(Ok(default), |b| {
            convert(b)
                .filter(|v| allowed.contains(v))
                .ok_or(api::FilterError::OutOfRange)
        })
    };

    let min = resolve(min, *allowed.start())?;
    let max = resolve(max, *allowed.end())?;
    if min > max {
        return Err(api::FilterError::InvertedRange);
    }
    Ok(min..=max)
}

/// A page of `Listing`s.
#[derive(Clone, Debug)]
pub struct Page {
    /// [`Listing`]s on this [`Page`].
    items: Vec<Listing>,

    /// Number of this [`Page`].
    number: list::PageNumber,

    /// Total number of pages.
    total_pages: u32,

    /// Total number of matching [`Listing`]s.
    total_count: u64,
}

impl From<list::Page> for Page {
    fn from(page: list::Page) -> Self {
        let list::Page {
            items,
            number,
            total_pages,
            total_count,
        } = page;

        Self {
            items: items.into_iter().map(Into::into).collect(),
            number,
            total_pages,
            total_count,
        }
    }
}

/// A page of `Listing`s.
#[graphql_object(name = "ListingPage", context = Context)]
impl Page {
    /// `Listing`s on this page.
    pub fn items(&self) -> &[Listing] {
        &self.items
    }

    /// Number of this page, starting from `1`.
    pub fn page(&self) -> i32 {
        i32::try_from(self.number.get()).unwrap_or(i32::MAX)
    }

    /// Total number of pages, `0` if nothing matches.
    pub fn total_pages(&self) -> i32 {
        i32::try_from(self.total_pages).unwrap_or(i32::MAX)
    }

    /// Total number of matching `Listing`s.
    pub fn total_count(&self) -> i32 {
        i32::try_from(self.total_count).unwrap_or(i32::MAX)
    }

    /// Indicator whether there is a page after this one.
    pub fn has_next(&self) -> bool {
        self.number.get() < self.total_pages
    }
}

#[cfg(test)]
mod spec {
    use service::read::listing::list;

    use crate::api::FilterError;

    use super::{Filter, IntRange, PriceRange};

    #[test]
    fn empty_filter_uses_bounds() {
        let bounds = list::Bounds::default();

        let filter = Filter::default().into_list(&bounds).unwrap();

        assert_eq!(filter, list::Filter::new(&bounds));
    }

    #[test]
    fn fills_missing_bound() {
        let bounds = list::Bounds::default();
        let input = Filter {
            year: Some(IntRange {
                min: Some(2015),
                max: None,
            }),
            ..Filter::default()
        };

        let filter = input.into_list(&bounds).unwrap();

        assert_eq!(i16::from(*filter.year.start()), 2015);
        assert_eq!(filter.year.end(), bounds.year.end());
    }

    #[test]
    fn rejects_inverted_range() {
        let input = Filter {
            mileage: Some(IntRange {
                min: Some(50_000),
                max: Some(10_000),
            }),
            ..Filter::default()
        };

        assert!(matches!(
            input.into_list(&list::Bounds::default()),
            Err(FilterError::InvertedRange),
        ));
    }

    #[test]
    fn rejects_out_of_bounds() {
        let input = Filter {
            year: Some(IntRange {
                min: Some(1200),
                max: None,
            }),
            ..Filter::default()
        };

        assert!(matches!(
            input.into_list(&list::Bounds::default()),
            Err(FilterError::OutOfRange),
        ));
        assert!(matches!(
            Filter {
                price: Some(PriceRange::default()),
                mileage: Some(IntRange {
                    min: Some(-5),
                    max: None,
                }),
                ..Filter::default()
            }
            .into_list(&list::Bounds::default()),
            Err(FilterError::OutOfRange),
        ));
    }

    #[test]
    fn parses_trimmed_texts() {
        let input = Filter {
            makes: Some(vec![" Toyota ".into(), "Honda".into()]),
            ..Filter::default()
        };

        let filter = input.into_list(&list::Bounds::default()).unwrap();

        assert_eq!(
            filter
                .makes
                .iter()
                .map(AsRef::<str>::as_ref)
                .collect::<Vec<_>>(),
            ["Toyota", "Honda"],
        );
        assert!(matches!(
            Filter {
                colors: Some(vec!["   ".into()]),
                ..Filter::default()
            }
            .into_list(&list::Bounds::default()),
            Err(FilterError::InvalidValue),
        ));
    }
}
