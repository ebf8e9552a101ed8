//! [`Config`]-related definitions.

use std::{ops::RangeInclusive, time};

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use service::{
    domain::listing::{Mileage, Price, Year},
    read::listing::list,
};
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Service {
    /// `Listing`s browsing configuration.
    pub listings: Listings,
}

impl TryFrom<Service> for service::Config {
    type Error = ConfigError;

    fn try_from(value: Service) -> Result<Self, Self::Error> {
        let Service {
            listings:
                Listings {
                    page_size,
                    recent_lookback,
                    bounds,
                },
        } = value;

        Ok(Self {
            listings: service::query::listings::Config {
                page_size: list::PageSize::new(page_size).ok_or_else(|| {
                    ConfigError::Message(
                        "`service.listings.page_size` must be positive"
                            .to_owned(),
                    )
                })?,
                recent_lookback,
                bounds: bounds.try_into()?,
            },
        })
    }
}

/// `Listing`s browsing configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Listings {
    /// Number of `Listing`s on a page.
    #[default(9)]
    pub page_size: u32,

    /// How far back the "recently listed" filter reaches.
    #[default(time::Duration::from_secs(7 * 24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub recent_lookback: time::Duration,

    /// Default boundaries of the numeric filter ranges.
    pub bounds: Bounds,
}

/// Default boundaries of the numeric filter ranges.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Bounds {
    /// Boundaries of prices.
    #[default(Range { min: 0, max: 10_000_000 })]
    pub price: Range,

    /// Boundaries of mileages.
    #[default(Range { min: 0, max: 1_000_000 })]
    pub mileage: Range,

    /// Boundaries of model years.
    #[default(Range { min: 1900, max: 2100 })]
    pub year: Range,
}

impl TryFrom<Bounds> for list::Bounds {
    type Error = ConfigError;

    fn try_from(value: Bounds) -> Result<Self, Self::Error> {
        let Bounds {
            price,
            mileage,
            year,
        } = value;

        Ok(Self {
            price: price.resolve("price", Price::new)?,
            mileage: mileage.resolve("mileage", |v| {
                i32::try_from(v).ok().and_then(Mileage::new)
            })?,
            year: year.resolve("year", |v| {
                i16::try_from(v).ok().and_then(Year::new)
            })?,
        })
    }
}

/// Inclusive range of integers.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Range {
    /// Lower bound.
    pub min: i64,

    /// Upper bound.
    pub max: i64,
}

impl Range {
    /// Converts this [`Range`] into a [`RangeInclusive`] of `T`.
    fn resolve<T: PartialOrd>(
        self,
        name: &str,
        convert: impl Fn(i64) -> Option<T>,
    ) -> Result<RangeInclusive<T>, ConfigError> {
        let invalid = || {
            ConfigError::Message(format!(
                "`service.listings.bounds.{name}` is invalid",
            ))
        };
        let min = convert(self.min).ok_or_else(invalid)?;
        let max = convert(self.max).ok_or_else(invalid)?;
        if min > max {
            return Err(invalid());
        }
        Ok(min..=max)
    }
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use service::read::listing::list;

    use super::{Bounds, Listings, Range, Service};

    #[test]
    fn default_bounds_match_service_ones() {
        assert_eq!(
            list::Bounds::try_from(Bounds::default()).unwrap(),
            list::Bounds::default(),
        );
    }

    #[test]
    fn rejects_invalid_listings_config() {
        let zero_page = Service {
            listings: Listings {
                page_size: 0,
                ..Listings::default()
            },
        };
        assert!(service::Config::try_from(zero_page).is_err());

        let inverted = Bounds {
            year: Range {
                min: 2030,
                max: 2000,
            },
            ..Bounds::default()
        };
        assert!(list::Bounds::try_from(inverted).is_err());

        let negative = Bounds {
            price: Range { min: -1, max: 10 },
            ..Bounds::default()
        };
        assert!(list::Bounds::try_from(negative).is_err());
    }
}
