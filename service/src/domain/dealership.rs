//! [`Dealership`] definitions.

use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Listing;

/// Dealership publishing [`Listing`]s.
#[derive(Clone, Debug, PartialEq)]
pub struct Dealership {
    /// ID of this [`Dealership`].
    pub id: Id,

    /// [`Name`] of this [`Dealership`].
    pub name: Name,

    /// URL of the logo of this [`Dealership`], if any.
    pub logo: Option<LogoUrl>,

    /// Contact [`Phone`] of this [`Dealership`], if any.
    pub phone: Option<Phone>,

    /// Contact [`Email`] of this [`Dealership`], if any.
    pub email: Option<Email>,

    /// Postal [`Address`] of this [`Dealership`], if any.
    pub address: Option<Address>,

    /// Geographical [`Location`] of this [`Dealership`], if known.
    pub location: Option<Location>,
}

/// ID of a [`Dealership`].
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
    #[doc = "Name of a [`Dealership`]."]
    Name(max = 256)
}

define_text! {
    #[doc = "URL of a [`Dealership`] logo."]
    LogoUrl(max = 2048)
}

define_text! {
    #[doc = "Contact phone of a [`Dealership`]."]
    Phone(max = 32)
}

define_text! {
    #[doc = "Contact email of a [`Dealership`]."]
    Email(max = 320)
}

define_text! {
    #[doc = "Postal address of a [`Dealership`]."]
    Address(max = 512)
}

/// Geographical location of a [`Dealership`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    /// Latitude in degrees, within `[-90, 90]`.
    latitude: f64,

    /// Longitude in degrees, within `[-180, 180]`.
    longitude: f64,
}

impl Location {
    /// Creates a new [`Location`] if the given coordinates are valid.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        ((-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude))
        .then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Returns latitude of this [`Location`] in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Returns longitude of this [`Location`] in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

#[cfg(test)]
mod spec {
    use super::Location;

    #[test]
    fn validates_location() {
        assert!(Location::new(52.52, 13.405).is_some());
        assert!(Location::new(-90.0, 180.0).is_some());
        assert!(Location::new(90.5, 0.0).is_none());
        assert!(Location::new(0.0, -181.0).is_none());
        assert!(Location::new(f64::NAN, 0.0).is_none());
    }
}
