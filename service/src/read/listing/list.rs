//! [`Listing`] list definitions.

use std::{ops::RangeInclusive, str::FromStr as _, time::Duration};

use common::{define_kind, define_pagination, pagination::Order, DateTime};
use derive_more::{From, Into};
use rust_decimal::Decimal;

use crate::domain::{
    dealership,
    listing::{self, Mileage, Price, Year},
    Dealership, Listing,
};

define_pagination!(Item);

/// [`Listing`] with the fields of its [`Dealership`] flattened onto it.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    /// Underlying [`Listing`].
    pub listing: Listing,

    /// [`dealership::Name`] of the owning [`Dealership`].
    pub dealership_name: Option<dealership::Name>,

    /// [`dealership::LogoUrl`] of the owning [`Dealership`].
    pub dealership_logo: Option<dealership::LogoUrl>,

    /// [`dealership::Phone`] of the owning [`Dealership`].
    pub dealership_phone: Option<dealership::Phone>,

    /// [`dealership::Email`] of the owning [`Dealership`].
    pub dealership_email: Option<dealership::Email>,

    /// [`dealership::Address`] of the owning [`Dealership`].
    pub dealership_address: Option<dealership::Address>,

    /// [`dealership::Location`] of the owning [`Dealership`].
    pub dealership_location: Option<dealership::Location>,
}

impl Item {
    /// Creates a new [`Item`] out of the provided [`Listing`] and its
    /// [`Dealership`] (if it exists).
    #[must_use]
    pub fn new(listing: Listing, dealership: Option<&Dealership>) -> Self {
        Self {
            listing,
            dealership_name: dealership.map(|d| d.name.clone()),
            dealership_logo: dealership.and_then(|d| d.logo.clone()),
            dealership_phone: dealership.and_then(|d| d.phone.clone()),
            dealership_email: dealership.and_then(|d| d.email.clone()),
            dealership_address: dealership.and_then(|d| d.address.clone()),
            dealership_location: dealership.and_then(|d| d.location),
        }
    }

    /// Splits this [`Item`] back into its [`Listing`] and [`Dealership`].
    ///
    /// [`None`] is returned for the [`Dealership`] if it didn't exist when
    /// this [`Item`] was created.
    #[must_use]
    pub fn into_parts(self) -> (Listing, Option<Dealership>) {
        let Self {
            listing,
            dealership_name,
            dealership_logo,
            dealership_phone,
            dealership_email,
            dealership_address,
            dealership_location,
        } = self;
        let dealership = dealership_name.map(|name| Dealership {
            id: listing.dealership_id,
            name,
            logo: dealership_logo,
            phone: dealership_phone,
            email: dealership_email,
            address: dealership_address,
            location: dealership_location,
        });
        (listing, dealership)
    }

    /// Returns [`listing::Id`] of this [`Item`].
    #[must_use]
    pub fn id(&self) -> listing::Id {
        self.listing.id
    }
}

/// Default boundaries of the numeric [`Filter`] ranges.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bounds {
    /// Boundaries of [`Filter::price`].
    pub price: RangeInclusive<Price>,

    /// Boundaries of [`Filter::mileage`].
    pub mileage: RangeInclusive<Mileage>,

    /// Boundaries of [`Filter::year`].
    pub year: RangeInclusive<Year>,
}

impl Default for Bounds {
    fn default() -> Self {
        #[expect(unsafe_code, reason = "constants are valid")]
        unsafe {
            Self {
                price: Price::new_unchecked(Decimal::ZERO)
                    ..=Price::new_unchecked(Decimal::from(10_000_000)),
                mileage: Mileage::new_unchecked(0)
                    ..=Mileage::new_unchecked(1_000_000),
                year: Year::new_unchecked(1900)..=Year::new_unchecked(2100),
            }
        }
    }
}

/// Desired state of a [`Listing`] list.
///
/// Empty sets impose no restriction. Numeric ranges are inclusive on both
/// ends.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    /// Free-text query to search for.
    pub query: Option<String>,

    /// [`listing::Category`]s to include.
    pub categories: Vec<listing::Category>,

    /// Range of [`Price`]s to include.
    pub price: RangeInclusive<Price>,

    /// Range of [`Mileage`]s to include.
    pub mileage: RangeInclusive<Mileage>,

    /// Range of model [`Year`]s to include.
    pub year: RangeInclusive<Year>,

    /// [`listing::Transmission`]s to include.
    pub transmissions: Vec<listing::Transmission>,

    /// [`listing::Drivetrain`]s to include.
    pub drivetrains: Vec<listing::Drivetrain>,

    /// [`listing::Color`]s to include.
    pub colors: Vec<listing::Color>,

    /// [`listing::Make`]s to include.
    pub makes: Vec<listing::Make>,

    /// [`listing::Model`]s to include.
    pub models: Vec<listing::Model>,

    /// IDs of [`Dealership`]s to include the [`Listing`]s of.
    pub dealership_ids: Vec<dealership::Id>,

    /// Names of [`Dealership`]s to include the [`Listing`]s of.
    pub dealership_names: Vec<dealership::Name>,

    /// [`Special`] filter to apply, if any.
    pub special: Option<Special>,

    /// [`Sort`] order to apply, if any.
    pub sort: Option<Sort>,
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(&Bounds::default())
    }
}

impl Filter {
    /// Creates a new [`Filter`] restricted by nothing but the provided
    /// [`Bounds`].
    #[must_use]
    pub fn new(bounds: &Bounds) -> Self {
        Self {
            query: None,
            categories: vec![],
            price: bounds.price.clone(),
            mileage: bounds.mileage.clone(),
            year: bounds.year.clone(),
            transmissions: vec![],
            drivetrains: vec![],
            colors: vec![],
            makes: vec![],
            models: vec![],
            dealership_ids: vec![],
            dealership_names: vec![],
            special: None,
            sort: None,
        }
    }

    /// Composes [`Criteria`] a [`Listing`] must satisfy to pass this
    /// [`Filter`].
    ///
    /// `now` and `lookback` define the window of the
    /// [`Special::RecentlyListed`] filter.
    #[must_use]
    pub fn criteria(&self, now: DateTime, lookback: Duration) -> Criteria {
        let mut predicates = vec![Predicate::Status(listing::Status::Available)];

        let sets = [
            (TextField::Category, strings(&self.categories)),
            (TextField::Transmission, strings(&self.transmissions)),
            (TextField::Drivetrain, strings(&self.drivetrains)),
            (TextField::Color, strings(&self.colors)),
            (TextField::Make, strings(&self.makes)),
            (TextField::Model, strings(&self.models)),
        ];
        predicates.extend(
            sets.into_iter()
                .filter(|(_, values)| !values.is_empty())
                .map(|(field, values)| Predicate::OneOf(field, values)),
        );

        if !self.dealership_ids.is_empty() {
            predicates.push(Predicate::DealershipIn(self.dealership_ids.clone()));
        }
        if !self.dealership_names.is_empty() {
            predicates
                .push(Predicate::DealershipNameIn(self.dealership_names.clone()));
        }

        predicates.push(Predicate::PriceWithin(self.price.clone()));
        predicates.push(Predicate::MileageWithin(self.mileage.clone()));
        predicates.push(Predicate::YearWithin(self.year.clone()));

        if self.special == Some(Special::RecentlyListed) {
            let since = now
                .checked_sub(lookback)
                .unwrap_or(DateTime::UNIX_EPOCH)
                .coerce();
            predicates.push(Predicate::ListedSince(since));
        }

        if let Some(search) = self.query.as_deref().and_then(Search::new) {
            predicates.push(Predicate::Matches(search));
        }

        Criteria(predicates)
    }

    /// Returns the [`Sort`] order to apply, considering the `explicit` one.
    ///
    /// [`Special::MostViewed`] always forces [`Sort::MostViewed`]. Otherwise,
    /// the `explicit` order takes precedence over [`Filter::sort`].
    #[must_use]
    pub fn sorting(&self, explicit: Option<Sort>) -> Option<Sort> {
        if self.special == Some(Special::MostViewed) {
            return Some(Sort::MostViewed);
        }
        explicit.or(self.sort)
    }
}

/// Collects the provided text values into [`String`]s.
fn strings<T: AsRef<str>>(values: &[T]) -> Vec<String> {
    values.iter().map(|v| v.as_ref().to_owned()).collect()
}

define_kind! {
    #[doc = "Special [`Filter`] overriding or augmenting the ordinary ones."]
    enum Special {
        #[doc = "Only [`Listing`]s published within the lookback window."]
        RecentlyListed = 1,

        #[doc = "[`Listing`]s ordered by view count, most viewed first."]
        MostViewed = 2,
    }
}

define_kind! {
    #[doc = "Sort order of a [`Listing`] list."]
    enum Sort {
        #[doc = "Cheapest first."]
        PriceAsc = 1,

        #[doc = "Most expensive first."]
        PriceDesc = 2,

        #[doc = "Newest model year first."]
        YearDesc = 3,

        #[doc = "Oldest model year first."]
        YearAsc = 4,

        #[doc = "Lowest mileage first."]
        MileageAsc = 5,

        #[doc = "Highest mileage first."]
        MileageDesc = 6,

        #[doc = "Most recently published first."]
        Newest = 7,

        #[doc = "Least recently published first."]
        Oldest = 8,

        #[doc = "Most viewed first."]
        MostViewed = 9,
    }
}

impl Sort {
    /// Returns the [`SortField`] and the [`Order`] this [`Sort`] maps to.
    #[must_use]
    pub const fn ordering(self) -> (SortField, Order) {
        use Order::{Ascending as Asc, Descending as Desc};

        match self {
            Self::PriceAsc => (SortField::Price, Asc),
            Self::PriceDesc => (SortField::Price, Desc),
            Self::YearDesc => (SortField::Year, Desc),
            Self::YearAsc => (SortField::Year, Asc),
            Self::MileageAsc => (SortField::Mileage, Asc),
            Self::MileageDesc => (SortField::Mileage, Desc),
            Self::Newest => (SortField::ListedAt, Desc),
            Self::Oldest => (SortField::ListedAt, Asc),
            Self::MostViewed => (SortField::Views, Desc),
        }
    }
}

/// Field of a [`Listing`] a list can be sorted by.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SortField {
    /// [`Listing::price`].
    Price,

    /// [`Listing::year`].
    Year,

    /// [`Listing::mileage`].
    Mileage,

    /// [`Listing::listed_at`].
    ListedAt,

    /// [`Listing::views`].
    Views,
}

/// Text field of a [`Listing`] which can be matched against.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TextField {
    /// [`Listing::make`].
    Make,

    /// [`Listing::model`].
    Model,

    /// [`Listing::description`].
    Description,

    /// [`Listing::color`].
    Color,

    /// [`Listing::category`].
    Category,

    /// [`Listing::transmission`].
    Transmission,

    /// [`Listing::drivetrain`].
    Drivetrain,

    /// [`Listing::body_type`].
    BodyType,

    /// [`Listing::condition`].
    Condition,
}

impl TextField {
    /// [`TextField`]s a free-text [`Search`] is matched against.
    pub const SEARCHABLE: [Self; 9] = [
        Self::Make,
        Self::Model,
        Self::Description,
        Self::Color,
        Self::Category,
        Self::Transmission,
        Self::Drivetrain,
        Self::BodyType,
        Self::Condition,
    ];

    /// Returns the value of this [`TextField`] in the provided [`Listing`].
    #[must_use]
    pub fn of(self, listing: &Listing) -> Option<&str> {
        Some(match self {
            Self::Make => listing.make.as_ref(),
            Self::Model => listing.model.as_ref(),
            Self::Description => listing.description.as_ref()?.as_ref(),
            Self::Color => listing.color.as_ref(),
            Self::Category => listing.category.as_ref(),
            Self::Transmission => listing.transmission.as_ref(),
            Self::Drivetrain => listing.drivetrain.as_ref(),
            Self::BodyType => listing.body_type.as_ref(),
            Self::Condition => listing.condition.as_ref(),
        })
    }
}

/// Free-text search over a [`Listing`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Search {
    /// Trimmed text to search for.
    text: String,

    /// Indicator whether the [`Search::text`] is a numeric literal.
    numeric: bool,
}

impl Search {
    /// Creates a new [`Search`] out of the provided `query`.
    ///
    /// [`None`] is returned if the `query` is blank.
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        let text = query.trim();
        (!text.is_empty()).then(|| Self {
            text: text.to_owned(),
            numeric: Decimal::from_str(text).is_ok(),
        })
    }

    /// Returns the text to search for.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Indicates whether this [`Search`] should also match numeric fields.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.numeric
    }
}

/// Single condition a [`Listing`] must satisfy.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// [`Listing::status`] equals the value.
    Status(listing::Status),

    /// [`TextField`] equals one of the values.
    OneOf(TextField, Vec<String>),

    /// [`Listing::dealership_id`] is one of the values.
    DealershipIn(Vec<dealership::Id>),

    /// Name of the owning [`Dealership`] is one of the values.
    DealershipNameIn(Vec<dealership::Name>),

    /// [`Listing::price`] lies within the range.
    PriceWithin(RangeInclusive<Price>),

    /// [`Listing::mileage`] lies within the range.
    MileageWithin(RangeInclusive<Mileage>),

    /// [`Listing::year`] lies within the range.
    YearWithin(RangeInclusive<Year>),

    /// [`Listing::listed_at`] is not earlier than the value.
    ListedSince(listing::ListingDateTime),

    /// [`Listing`] matches the free-text [`Search`].
    ///
    /// Any of [`TextField::SEARCHABLE`] contains the text case-insensitively
    /// or, for a numeric [`Search`], the textual form of the year, price or
    /// mileage contains it.
    Matches(Search),
}

/// Conjunction of [`Predicate`]s.
#[derive(Clone, Debug, Default, From, Into, PartialEq)]
pub struct Criteria(Vec<Predicate>);

impl Criteria {
    /// Returns [`Predicate`]s of these [`Criteria`].
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.0
    }
}

/// Selector of a [`Page`] of [`Listing`]s.
#[derive(Clone, Debug, PartialEq)]
pub struct Selector {
    /// [`Criteria`] to select [`Listing`]s by.
    pub criteria: Criteria,

    /// [`Sort`] order to apply, if any.
    ///
    /// Without it the order of the selected [`Listing`]s is unspecified.
    pub sort: Option<Sort>,

    /// [`Range`] of [`Listing`]s to select.
    pub range: Range,
}

/// Total count of [`Listing`]s satisfying some [`Criteria`].
#[derive(Clone, Copy, Debug, Default, Eq, From, Hash, Into, PartialEq)]
pub struct TotalCount(u64);

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{dealership, listing};

    use super::{
        Bounds, Filter, Predicate, Search, Sort, Special, TextField,
    };

    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    fn now() -> DateTime {
        DateTime::from_rfc3339("2024-06-15T12:00:00Z").unwrap()
    }

    #[test]
    fn default_filter_restricts_status_only() {
        let bounds = Bounds::default();
        let criteria = Filter::default().criteria(now(), WEEK);

        assert_eq!(
            criteria.predicates(),
            [
                Predicate::Status(listing::Status::Available),
                Predicate::PriceWithin(bounds.price),
                Predicate::MileageWithin(bounds.mileage),
                Predicate::YearWithin(bounds.year),
            ],
        );
    }

    #[test]
    fn includes_populated_sets_only() {
        let filter = Filter {
            makes: vec![listing::Make::new("Toyota").unwrap()],
            colors: vec![
                listing::Color::new("Red").unwrap(),
                listing::Color::new("Blue").unwrap(),
            ],
            dealership_names: vec![dealership::Name::new("Auto Hub").unwrap()],
            ..Filter::default()
        };
        let criteria = filter.criteria(now(), WEEK);

        assert!(criteria.predicates().contains(&Predicate::OneOf(
            TextField::Make,
            vec!["Toyota".into()],
        )));
        assert!(criteria.predicates().contains(&Predicate::OneOf(
            TextField::Color,
            vec!["Red".into(), "Blue".into()],
        )));
        assert!(criteria.predicates().contains(&Predicate::DealershipNameIn(
            vec![dealership::Name::new("Auto Hub").unwrap()],
        )));
        assert!(!criteria.predicates().iter().any(|p| matches!(
            p,
            Predicate::OneOf(TextField::Model | TextField::Category, _)
                | Predicate::DealershipIn(_),
        )));
    }

    #[test]
    fn recently_listed_adds_lookback_bound() {
        let filter = Filter {
            special: Some(Special::RecentlyListed),
            ..Filter::default()
        };
        let criteria = filter.criteria(now(), WEEK);

        assert!(criteria
            .predicates()
            .contains(&Predicate::ListedSince((now() - WEEK).coerce())));
        assert_eq!(filter.sorting(None), None);
    }

    #[test]
    fn most_viewed_forces_sort() {
        let filter = Filter {
            special: Some(Special::MostViewed),
            sort: Some(Sort::PriceAsc),
            ..Filter::default()
        };

        assert_eq!(filter.sorting(Some(Sort::YearAsc)), Some(Sort::MostViewed));
        assert_eq!(filter.sorting(None), Some(Sort::MostViewed));
        assert!(!filter
            .criteria(now(), WEEK)
            .predicates()
            .iter()
            .any(|p| matches!(p, Predicate::ListedSince(_))));
    }

    #[test]
    fn explicit_sort_takes_precedence() {
        let filter = Filter {
            sort: Some(Sort::PriceAsc),
            ..Filter::default()
        };

        assert_eq!(filter.sorting(Some(Sort::Newest)), Some(Sort::Newest));
        assert_eq!(filter.sorting(None), Some(Sort::PriceAsc));
    }

    #[test]
    fn search_detects_numeric_query() {
        let search = Search::new("  2020 ").unwrap();
        assert_eq!(search.text(), "2020");
        assert!(search.is_numeric());

        assert!(Search::new("15000.50").unwrap().is_numeric());
        assert!(!Search::new("Camry 2020").unwrap().is_numeric());
        assert!(!Search::new("NaN").unwrap().is_numeric());
        assert!(Search::new("   ").is_none());
    }

    #[test]
    fn blank_query_adds_no_search() {
        let filter = Filter {
            query: Some("  ".into()),
            ..Filter::default()
        };

        assert!(!filter
            .criteria(now(), WEEK)
            .predicates()
            .iter()
            .any(|p| matches!(p, Predicate::Matches(_))));
    }
}
