//! [`Listing`] definitions.

use common::{define_kind, unit, DateTimeOf};
#[cfg(doc)]
use common::DateTime;
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::dealership;
#[cfg(doc)]
use crate::domain::Dealership;

/// Vehicle offered for sale by a [`Dealership`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Listing {
    /// ID of this [`Listing`].
    pub id: Id,

    /// ID of the [`Dealership`] owning this [`Listing`].
    pub dealership_id: dealership::Id,

    /// [`Make`] of the vehicle.
    pub make: Make,

    /// [`Model`] of the vehicle.
    pub model: Model,

    /// Model [`Year`] of the vehicle.
    pub year: Year,

    /// Asking [`Price`].
    pub price: Price,

    /// [`Mileage`] of the vehicle.
    pub mileage: Mileage,

    /// [`Condition`] of the vehicle.
    pub condition: Condition,

    /// [`Category`] the vehicle is listed in.
    pub category: Category,

    /// [`BodyType`] of the vehicle.
    pub body_type: BodyType,

    /// [`Transmission`] of the vehicle.
    pub transmission: Transmission,

    /// [`Drivetrain`] of the vehicle.
    pub drivetrain: Drivetrain,

    /// Exterior [`Color`] of the vehicle.
    pub color: Color,

    /// Free-form [`Description`], if any.
    pub description: Option<Description>,

    /// Sale [`Status`] of this [`Listing`].
    pub status: Status,

    /// Images of the vehicle, in display order.
    pub images: Vec<ImageUrl>,

    /// Number of times this [`Listing`] was viewed.
    pub views: Counter,

    /// Number of times this [`Listing`] was liked.
    pub likes: Counter,

    /// [`DateTime`] when this [`Listing`] was published.
    pub listed_at: ListingDateTime,
}

/// ID of a [`Listing`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_text! {
    #[doc = "Make (manufacturer) of a [`Listing`] vehicle."]
    Make(max = 128)
}

define_text! {
    #[doc = "Model of a [`Listing`] vehicle."]
    Model(max = 128)
}

define_text! {
    #[doc = "Condition of a [`Listing`] vehicle (`new`, `used`, etc)."]
    Condition(max = 64)
}

define_text! {
    #[doc = "Category a [`Listing`] is published in."]
    Category(max = 128)
}

define_text! {
    #[doc = "Body type of a [`Listing`] vehicle (`sedan`, `suv`, etc)."]
    BodyType(max = 64)
}

define_text! {
    #[doc = "Transmission of a [`Listing`] vehicle."]
    Transmission(max = 64)
}

define_text! {
    #[doc = "Drivetrain of a [`Listing`] vehicle (`awd`, `fwd`, etc)."]
    Drivetrain(max = 64)
}

define_text! {
    #[doc = "Exterior color of a [`Listing`] vehicle."]
    Color(max = 64)
}

define_text! {
    #[doc = "Free-form description of a [`Listing`]."]
    Description(max = 16384)
}

define_text! {
    #[doc = "URL of a [`Listing`] image."]
    ImageUrl(max = 2048)
}

/// Model year of a [`Listing`] vehicle.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Year(i16);

impl Year {
    /// Creates a new [`Year`] without checking it.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `year` is valid.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(year: i16) -> Self {
        Self(year)
    }

    /// Creates a new [`Year`] if the given `year` is a plausible model year.
    #[must_use]
    pub fn new(year: i16) -> Option<Self> {
        (year >= 1800).then_some(Self(year))
    }
}

/// Asking price of a [`Listing`].
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Price(Decimal);

impl Price {
    /// Creates a new [`Price`] without checking it.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `amount` is valid.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Creates a new [`Price`] if the given `amount` is not negative.
    #[must_use]
    pub fn new(amount: impl Into<Decimal>) -> Option<Self> {
        let amount = amount.into();
        (!amount.is_sign_negative()).then_some(Self(amount))
    }
}

impl FromStr for Price {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Decimal>()
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `Price`")
    }
}

/// Mileage of a [`Listing`] vehicle.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Mileage(i32);

impl Mileage {
    /// Creates a new [`Mileage`] without checking it.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `distance` is valid.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(distance: i32) -> Self {
        Self(distance)
    }

    /// Creates a new [`Mileage`] if the given `distance` is not negative.
    #[must_use]
    pub fn new(distance: i32) -> Option<Self> {
        (distance >= 0).then_some(Self(distance))
    }
}

/// Number of interactions (views, likes) with a [`Listing`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Counter(i32);

define_kind! {
    #[doc = "Sale status of a [`Listing`]."]
    enum Status {
        #[doc = "Open for purchase."]
        Available = 1,

        #[doc = "Reserved by a buyer, the deal is not closed yet."]
        Pending = 2,

        #[doc = "Already sold."]
        Sold = 3,
    }
}

/// [`DateTime`] when a [`Listing`] was published.
pub type ListingDateTime = DateTimeOf<(Listing, unit::Publication)>;

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use super::{Make, Mileage, Price, Year};

    #[test]
    fn validates_text() {
        assert!(Make::new("Toyota").is_some());
        assert!(Make::new("").is_none());
        assert!(Make::new(" Toyota").is_none());
        assert!(Make::new("x".repeat(129)).is_none());
        assert!("Land Rover".parse::<Make>().is_ok());
    }

    #[test]
    fn validates_numbers() {
        assert!(Year::new(2020).is_some());
        assert!(Year::new(1200).is_none());
        assert!(Mileage::new(0).is_some());
        assert!(Mileage::new(-1).is_none());
        assert!(Price::new(Decimal::new(1_500_000, 2)).is_some());
        assert!(Price::new(Decimal::new(-1, 0)).is_none());
        assert_eq!(
            "15000.50".parse::<Price>().ok(),
            Price::new(Decimal::new(1_500_050, 2)),
        );
        assert!("-3".parse::<Price>().is_err());
        assert!("cheap".parse::<Price>().is_err());
    }
}
