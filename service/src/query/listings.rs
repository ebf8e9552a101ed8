//! [`Query`] collection related to the multiple [`Listing`]s.

use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use common::{
    operations::{By, Select},
    DateTime,
};
use rand::seq::SliceRandom as _;
use smart_default::SmartDefault;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{dealership, listing, Dealership, Listing},
    infra::{database, Database},
    read::listing::list,
    Query, Service,
};

use super::DatabaseQuery;

/// Queries multiple [`Listing`]s by their [`listing::Id`]s.
///
/// Unknown [`listing::Id`]s are absent from the result.
pub type ByIds =
    DatabaseQuery<By<HashMap<listing::Id, Listing>, Vec<listing::Id>>>;

/// Default number of [`Listing`]s on a [`list::Page`].
pub const DEFAULT_PAGE_SIZE: list::PageSize = match list::PageSize::new(9) {
    Some(size) => size,
    None => unreachable!(),
};

/// Configuration of [`Browse`]-ing [`Listing`]s.
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Number of [`Listing`]s on a [`list::Page`].
    #[default(DEFAULT_PAGE_SIZE)]
    pub page_size: list::PageSize,

    /// How far back [`list::Special::RecentlyListed`] reaches.
    #[default(Duration::from_secs(7 * 24 * 60 * 60))]
    pub recent_lookback: Duration,

    /// Default [`list::Bounds`] of [`list::Filter`] ranges.
    pub bounds: list::Bounds,
}

/// [`Query`] browsing a [`list::Page`] of available [`Listing`]s.
///
/// Counts the matching [`Listing`]s first, clamps the requested page into
/// the existing ones and then selects it. Without any [`list::Sort`] order
/// the page comes shuffled.
#[derive(Clone, Debug, PartialEq)]
pub struct Browse {
    /// [`list::Filter`] to apply.
    pub filter: list::Filter,

    /// Requested [`list::PageNumber`].
    pub page: list::PageNumber,

    /// [`list::Sort`] overriding the [`list::Filter::sort`], if any.
    pub sort: Option<list::Sort>,
}

impl<Db> Query<Browse> for Service<Db>
where
    Db: Database<
            Select<By<list::TotalCount, list::Criteria>>,
            Ok = list::TotalCount,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Listing>, list::Selector>>,
            Ok = Vec<Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<dealership::Id, Dealership>, Vec<dealership::Id>>>,
            Ok = HashMap<dealership::Id, Dealership>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = list::Page;
    type Err = Traced<database::Error>;

    #[tracing::instrument(
        skip_all,
        fields(
            page = %browse.page,
            sort = ?browse.sort,
            special = ?browse.filter.special,
        ),
    )]
    async fn execute(&self, browse: Browse) -> Result<Self::Ok, Self::Err> {
        let Browse { filter, page, sort } = browse;
        let config = &self.config().listings;

        let criteria = filter.criteria(DateTime::now(), config.recent_lookback);
        let sort = filter.sorting(sort);

        let total_count: u64 = self
            .database()
            .execute(Select(By::<list::TotalCount, _>::new(criteria.clone())))
            .await
            .map_err(tracerr::wrap!())?
            .into();
        if total_count == 0 {
            log::debug!("no `Listing`s match");
            return Ok(list::Page::empty());
        }

        let total_pages = config.page_size.total_pages(total_count);
        let number = page.clamp_to(total_pages);
        if number != page {
            log::debug!("page {page} clamped to {number} of {total_pages}");
        }

        let mut listings = self
            .database()
            .execute(Select(By::<Vec<Listing>, _>::new(list::Selector {
                criteria,
                sort,
                range: config.page_size.range(number),
            })))
            .await
            .map_err(tracerr::wrap!())?;
        if sort.is_none() {
            listings.shuffle(&mut rand::rng());
        }

        let dealership_ids = listings
            .iter()
            .map(|l| l.dealership_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let dealerships = self
            .database()
            .execute(Select(By::<HashMap<dealership::Id, Dealership>, _>::new(
                dealership_ids,
            )))
            .await
            .map_err(tracerr::wrap!())?;

        let items = listings
            .into_iter()
            .map(|l| {
                let dealership = dealerships.get(&l.dealership_id);
                list::Item::new(l, dealership)
            })
            .collect::<Vec<_>>();
        log::debug!(
            "selected {} of {total_count} `Listing`s on page {number}",
            items.len(),
        );

        Ok(list::Page {
            items,
            number,
            total_pages,
            total_count,
        })
    }
}

/// [`Query`] picking [`list::Item`]s of the [`Listing`]s with the provided
/// [`listing::Id`]s, in the provided order.
///
/// Repeated [`listing::Id`]s are repeated in the result, while unknown ones
/// are skipped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pick(pub Vec<listing::Id>);

impl<Db> Query<Pick> for Service<Db>
where
    Db: Database<
            Select<By<HashMap<listing::Id, Listing>, Vec<listing::Id>>>,
            Ok = HashMap<listing::Id, Listing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<dealership::Id, Dealership>, Vec<dealership::Id>>>,
            Ok = HashMap<dealership::Id, Dealership>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Vec<list::Item>;
    type Err = Traced<database::Error>;

    #[tracing::instrument(skip_all, fields(ids.len = pick.0.len()))]
    async fn execute(&self, pick: Pick) -> Result<Self::Ok, Self::Err> {
        let Pick(ids) = pick;

        let unique_ids = ids
            .iter()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let found = self
            .database()
            .execute(Select(By::<HashMap<listing::Id, Listing>, _>::new(
                unique_ids,
            )))
            .await
            .map_err(tracerr::wrap!())?;

        let dealership_ids = found
            .values()
            .map(|l| l.dealership_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let dealerships = self
            .database()
            .execute(Select(By::<HashMap<dealership::Id, Dealership>, _>::new(
                dealership_ids,
            )))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(ids
            .iter()
            .filter_map(|id| found.get(id))
            .map(|l| {
                list::Item::new(l.clone(), dealerships.get(&l.dealership_id))
            })
            .collect())
    }
}

#[cfg(test)]
mod spec {
    use std::collections::HashSet;

    use common::{DateTime, Handler as _};
    use rust_decimal::Decimal;

    use crate::{
        domain::listing::{self, Price},
        infra::database::memory::{fixture, Failure, Memory},
        read::listing::list::{self, Filter, Sort, Special},
        Config, Service,
    };

    use super::{Browse, ByIds, Pick};

    fn page(n: u32) -> list::PageNumber {
        list::PageNumber::new(n).unwrap()
    }

    fn price(amount: i64) -> Price {
        Price::new(Decimal::from(amount)).unwrap()
    }

    fn browse(filter: Filter, n: u32) -> Browse {
        Browse {
            filter,
            page: page(n),
            sort: None,
        }
    }

    /// Seeds 20 available `Toyota`s and `Honda`s alternating, with prices
    /// `5000, 6000, ..`, plus one sold `Toyota`.
    fn seeded() -> Service<Memory> {
        let db = Memory::default();
        let dealer = fixture::dealership("Auto Hub");
        db.insert_dealership(dealer.clone());
        for i in 0..20 {
            let make = if i % 2 == 0 { "Toyota" } else { "Honda" };
            let mut l = fixture::listing(dealer.id, make, "Base");
            l.price = price(5000 + i * 1000);
            l.views = i32::try_from(i * 7 % 13).unwrap().into();
            db.insert_listing(l);
        }
        let mut sold = fixture::listing(dealer.id, "Toyota", "Sold");
        sold.status = listing::Status::Sold;
        db.insert_listing(sold);
        Service::new(Config::default(), db)
    }

    #[tokio::test]
    async fn returns_available_only() {
        let svc = seeded();

        let page = svc.execute(browse(Filter::default(), 1)).await.unwrap();

        assert_eq!(page.total_count, 20);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 9);
        assert!(page
            .items
            .iter()
            .all(|i| i.listing.status == listing::Status::Available));
    }

    #[tokio::test]
    async fn filters_make_and_price_and_sorts() {
        let svc = seeded();
        let filter = Filter {
            makes: vec![listing::Make::new("Toyota").unwrap()],
            price: price(10_000)..=price(20_000),
            sort: Some(Sort::PriceAsc),
            ..Filter::default()
        };

        let page = svc.execute(browse(filter, 1)).await.unwrap();

        assert!(!page.items.is_empty());
        assert!(page.items.iter().all(|i| {
            i.listing.make.to_string() == "Toyota"
                && (price(10_000)..=price(20_000)).contains(&i.listing.price)
        }));
        assert!(page
            .items
            .windows(2)
            .all(|w| w[0].listing.price <= w[1].listing.price));
    }

    #[tokio::test]
    async fn most_viewed_overrides_explicit_sort() {
        let svc = seeded();
        let filter = Filter {
            special: Some(Special::MostViewed),
            ..Filter::default()
        };

        let page = svc
            .execute(Browse {
                filter,
                page: page(1),
                sort: Some(Sort::PriceAsc),
            })
            .await
            .unwrap();

        assert!(page
            .items
            .windows(2)
            .all(|w| w[0].listing.views >= w[1].listing.views));
    }

    #[tokio::test]
    async fn recently_listed_excludes_old_listings() {
        let db = Memory::default();
        let dealer = fixture::dealership("Auto Hub");
        db.insert_dealership(dealer.clone());

        let fresh = fixture::listing(dealer.id, "Mazda", "3");
        let mut old = fixture::listing(dealer.id, "Mazda", "6");
        old.listed_at = (DateTime::now()
            - std::time::Duration::from_secs(8 * 24 * 60 * 60))
        .coerce();
        db.insert_listing(fresh.clone());
        db.insert_listing(old);
        let svc = Service::new(Config::default(), db);

        let filter = Filter {
            special: Some(Special::RecentlyListed),
            ..Filter::default()
        };
        let page = svc.execute(browse(filter, 1)).await.unwrap();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].id(), fresh.id);
    }

    #[tokio::test]
    async fn numeric_query_matches_year_price_and_mileage() {
        let db = Memory::default();
        let dealer = fixture::dealership("Auto Hub");
        db.insert_dealership(dealer.clone());

        let mut by_year = fixture::listing(dealer.id, "Kia", "Rio");
        by_year.year = listing::Year::new(2020).unwrap();
        let mut by_price = fixture::listing(dealer.id, "Kia", "Ceed");
        by_price.price = price(12_020);
        let mut by_mileage = fixture::listing(dealer.id, "Kia", "Niro");
        by_mileage.mileage = listing::Mileage::new(202_000).unwrap();
        let mut by_text = fixture::listing(dealer.id, "Kia", "Sportage");
        by_text.description = listing::Description::new("Facelift 2020");
        let unmatched = fixture::listing(dealer.id, "Kia", "Soul");
        for l in [&by_year, &by_price, &by_mileage, &by_text, &unmatched] {
            db.insert_listing(l.clone());
        }
        let svc = Service::new(Config::default(), db);

        let filter = Filter {
            query: Some(" 2020 ".into()),
            ..Filter::default()
        };
        let page = svc.execute(browse(filter, 1)).await.unwrap();

        let found = page.items.iter().map(list::Item::id).collect::<HashSet<_>>();
        assert_eq!(
            found,
            HashSet::from([by_year.id, by_price.id, by_mileage.id, by_text.id]),
        );
    }

    #[tokio::test]
    async fn text_query_is_case_insensitive() {
        let svc = seeded();
        let filter = Filter {
            query: Some("toYOTA".into()),
            ..Filter::default()
        };

        let page = svc.execute(browse(filter, 1)).await.unwrap();

        assert_eq!(page.total_count, 10);
        assert!(page
            .items
            .iter()
            .all(|i| i.listing.make.to_string() == "Toyota"));
    }

    #[tokio::test]
    async fn clamps_page_beyond_last() {
        let svc = seeded();

        let page = svc.execute(browse(Filter::default(), 7)).await.unwrap();

        assert_eq!(page.number, list::PageNumber::new(3).unwrap());
        assert_eq!(page.items.len(), 2);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn resets_page_when_nothing_matches() {
        let svc = seeded();
        let filter = Filter {
            makes: vec![listing::Make::new("Lada").unwrap()],
            ..Filter::default()
        };

        let page = svc.execute(browse(filter, 4)).await.unwrap();

        assert_eq!(page, list::Page::empty());
    }

    #[tokio::test]
    async fn flattens_dealership_fields() {
        let svc = seeded();

        let page = svc.execute(browse(Filter::default(), 1)).await.unwrap();

        assert!(page.items.iter().all(|i| i
            .dealership_name
            .as_ref()
            .is_some_and(|n| n.to_string() == "Auto Hub")));
        assert!(page.items.iter().all(|i| i.dealership_phone.is_some()));
    }

    #[tokio::test]
    async fn missing_dealership_leaves_fields_empty() {
        let db = Memory::default();
        let orphan = fixture::listing(Default::default(), "Opel", "Astra");
        db.insert_listing(orphan);
        let svc = Service::new(Config::default(), db);

        let page = svc.execute(browse(Filter::default(), 1)).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].dealership_name, None);
        assert_eq!(page.items[0].dealership_location, None);
    }

    #[tokio::test]
    async fn sorted_pages_are_deterministic() {
        let svc = seeded();
        let filter = Filter {
            sort: Some(Sort::PriceDesc),
            ..Filter::default()
        };

        let first = svc.execute(browse(filter.clone(), 2)).await.unwrap();
        let second = svc.execute(browse(filter, 2)).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn count_failure_yields_no_results() {
        let svc = seeded();
        svc.database().fail_on(Some(Failure::Count));

        let res = svc.execute(browse(Filter::default(), 1)).await;

        assert!(res.is_err());
        assert_eq!(svc.database().page_selections(), 0);
    }

    #[tokio::test]
    async fn page_failure_is_propagated() {
        let svc = seeded();
        svc.database().fail_on(Some(Failure::Page));

        assert!(svc.execute(browse(Filter::default(), 1)).await.is_err());
    }

    #[tokio::test]
    async fn dealership_failure_is_propagated() {
        let svc = seeded();
        svc.database().fail_on(Some(Failure::Dealerships));

        assert!(svc.execute(browse(Filter::default(), 1)).await.is_err());
        assert_eq!(svc.database().page_selections(), 1);
    }

    #[tokio::test]
    async fn selects_by_ids() {
        let svc = seeded();
        let page = svc.execute(browse(Filter::default(), 1)).await.unwrap();
        let known = page.items[0].id();
        let unknown = listing::Id::new();

        let found = svc.execute(ByIds::by(vec![known, unknown])).await.unwrap();

        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&known));
        assert!(svc.execute(ByIds::by(vec![])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn picks_in_requested_order() {
        let svc = seeded();
        let page = svc
            .execute(Browse {
                sort: Some(Sort::PriceAsc),
                ..browse(Filter::default(), 1)
            })
            .await
            .unwrap();
        let (first, second) = (page.items[0].id(), page.items[1].id());
        let unknown = listing::Id::new();

        let picked = svc
            .execute(Pick(vec![second, unknown, first, second]))
            .await
            .unwrap();

        assert_eq!(
            picked.iter().map(list::Item::id).collect::<Vec<_>>(),
            vec![second, first, second],
        );
        assert!(picked
            .iter()
            .all(|i| i.dealership_name.as_ref().map(ToString::to_string)
                == Some("Auto Hub".to_owned())));
        assert!(svc.execute(Pick(vec![])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pick_failure_is_propagated() {
        let svc = seeded();
        let id = svc
            .execute(browse(Filter::default(), 1))
            .await
            .unwrap()
            .items[0]
            .id();
        svc.database().fail_on(Some(Failure::Dealerships));

        assert!(svc.execute(Pick(vec![id])).await.is_err());
    }
}
