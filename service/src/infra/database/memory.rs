//! In-memory [`Database`] implementation.

use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{
        atomic::{self, AtomicUsize},
        Arc, PoisonError, RwLock, RwLockReadGuard,
    },
};

use common::{
    operations::{By, Select},
    pagination::Order,
};
use derive_more::{Display, Error as StdError};
use tracerr::Traced;

use crate::{
    domain::{dealership, listing, Dealership, Listing},
    infra::database,
    read::listing::list::{
        Criteria, Predicate, Search, Selector, SortField, TextField,
        TotalCount,
    },
};
#[cfg(doc)]
use crate::infra::Database;

/// In-memory [`Database`] keeping everything in process.
#[derive(Clone, Debug, Default)]
pub struct Memory(Arc<Inner>);

/// Inner state of a [`Memory`] database.
#[derive(Debug, Default)]
struct Inner {
    /// Stored [`Listing`]s in their insertion order.
    listings: RwLock<Vec<Listing>>,

    /// Stored [`Dealership`]s.
    dealerships: RwLock<HashMap<dealership::Id, Dealership>>,

    /// Injected [`Failure`], if any.
    failure: RwLock<Option<Failure>>,

    /// Number of performed [`Listing`] page selections.
    page_selections: AtomicUsize,
}

/// Operation of a [`Memory`] database to fail with [`Error::Unavailable`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Failure {
    /// Counting [`Listing`]s by [`Criteria`].
    Count,

    /// Selecting a page of [`Listing`]s by a [`Selector`].
    Page,

    /// Selecting [`Dealership`]s by their IDs.
    Dealerships,

    /// Selecting [`Listing`]s by their IDs.
    Lookup,
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Operation failed because of an injected [`Failure`].
    #[display("`Memory` database is unavailable")]
    Unavailable,
}

impl Memory {
    /// Stores the provided [`Listing`], replacing the one with the same
    /// [`listing::Id`].
    pub fn insert_listing(&self, listing: Listing) {
        let mut listings =
            self.0.listings.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(l) = listings.iter_mut().find(|l| l.id == listing.id) {
            *l = listing;
        } else {
            listings.push(listing);
        }
    }

    /// Stores the provided [`Dealership`], replacing the one with the same
    /// [`dealership::Id`].
    pub fn insert_dealership(&self, dealership: Dealership) {
        drop(
            self.0
                .dealerships
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(dealership.id, dealership),
        );
    }

    /// Makes the provided operation fail from now on.
    ///
    /// [`None`] makes all the operations succeed again.
    pub fn fail_on(&self, failure: Option<Failure>) {
        *self.0.failure.write().unwrap_or_else(PoisonError::into_inner) =
            failure;
    }

    /// Returns the number of [`Listing`] page selections performed so far.
    #[must_use]
    pub fn page_selections(&self) -> usize {
        self.0.page_selections.load(atomic::Ordering::Relaxed)
    }

    /// Checks whether the provided operation should fail.
    fn check(&self, op: Failure) -> Result<(), Traced<database::Error>> {
        let failure =
            *self.0.failure.read().unwrap_or_else(PoisonError::into_inner);
        if failure == Some(op) {
            return Err(tracerr::new!(database::Error::from(
                Error::Unavailable
            )));
        }
        Ok(())
    }

    /// Returns [`Listing`]s satisfying the provided [`Criteria`] in their
    /// insertion order.
    fn matching(&self, criteria: &Criteria) -> Vec<Listing> {
        let dealerships = self
            .0
            .dealerships
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        self.listings()
            .iter()
            .filter(|l| {
                criteria
                    .predicates()
                    .iter()
                    .all(|p| satisfies(l, p, &dealerships))
            })
            .cloned()
            .collect()
    }

    /// Returns all the stored [`Listing`]s.
    fn listings(&self) -> RwLockReadGuard<'_, Vec<Listing>> {
        self.0.listings.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Checks whether the provided [`Listing`] satisfies the [`Predicate`].
fn satisfies(
    listing: &Listing,
    predicate: &Predicate,
    dealerships: &HashMap<dealership::Id, Dealership>,
) -> bool {
    match predicate {
        Predicate::Status(s) => listing.status == *s,
        Predicate::OneOf(field, values) => field
            .of(listing)
            .is_some_and(|v| values.iter().any(|x| x == v)),
        Predicate::DealershipIn(ids) => ids.contains(&listing.dealership_id),
        Predicate::DealershipNameIn(names) => dealerships
            .get(&listing.dealership_id)
            .is_some_and(|d| names.contains(&d.name)),
        Predicate::PriceWithin(r) => r.contains(&listing.price),
        Predicate::MileageWithin(r) => r.contains(&listing.mileage),
        Predicate::YearWithin(r) => r.contains(&listing.year),
        Predicate::ListedSince(since) => listing.listed_at >= *since,
        Predicate::Matches(search) => matches(listing, search),
    }
}

/// Checks whether the provided [`Listing`] matches the [`Search`].
fn matches(listing: &Listing, search: &Search) -> bool {
    let needle = search.text().to_lowercase();
    let in_text = TextField::SEARCHABLE.iter().any(|f| {
        f.of(listing)
            .is_some_and(|v| v.to_lowercase().contains(&needle))
    });
    in_text
        || (search.is_numeric()
            && [
                listing.year.to_string(),
                listing.price.to_string(),
                listing.mileage.to_string(),
            ]
            .iter()
            .any(|v| v.contains(&needle)))
}

/// Compares the provided [`Listing`]s by the [`SortField`].
fn compare(a: &Listing, b: &Listing, field: SortField) -> Ordering {
    match field {
        SortField::Price => a.price.cmp(&b.price),
        SortField::Year => a.year.cmp(&b.year),
        SortField::Mileage => a.mileage.cmp(&b.mileage),
        SortField::ListedAt => a.listed_at.cmp(&b.listed_at),
        SortField::Views => a.views.cmp(&b.views),
    }
}

impl database::Database<Select<By<TotalCount, Criteria>>> for Memory {
    type Ok = TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<TotalCount, Criteria>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check(Failure::Count)?;

        let count = self.matching(by.inner()).len();
        Ok(u64::try_from(count).unwrap_or(u64::MAX).into())
    }
}

impl database::Database<Select<By<Vec<Listing>, Selector>>> for Memory {
    type Ok = Vec<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Listing>, Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check(Failure::Page)?;
        _ = self.0.page_selections.fetch_add(1, atomic::Ordering::Relaxed);

        let Selector {
            criteria,
            sort,
            range,
        } = by.into_inner();

        let mut listings = self.matching(&criteria);
        listings.sort_by(|a, b| {
            let by_field = sort.map_or(Ordering::Equal, |s| {
                let (field, order) = s.ordering();
                let ord = compare(a, b, field);
                match order {
                    Order::Ascending => ord,
                    Order::Descending => ord.reverse(),
                }
            });
            by_field.then_with(|| a.id.cmp(&b.id))
        });

        let offset = usize::try_from(range.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(range.limit).unwrap_or(usize::MAX);
        Ok(listings.into_iter().skip(offset).take(limit).collect())
    }
}

impl database::Database<Select<By<Option<Listing>, listing::Id>>> for Memory {
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check(Failure::Lookup)?;

        let id = by.into_inner();
        Ok(self.listings().iter().find(|l| l.id == id).cloned())
    }
}

impl database::Database<Select<By<HashMap<listing::Id, Listing>, Vec<listing::Id>>>>
    for Memory
{
    type Ok = HashMap<listing::Id, Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<listing::Id, Listing>, Vec<listing::Id>>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.check(Failure::Lookup)?;

        Ok(self
            .listings()
            .iter()
            .filter(|l| ids.contains(&l.id))
            .map(|l| (l.id, l.clone()))
            .collect())
    }
}

impl
    database::Database<
        Select<By<HashMap<dealership::Id, Dealership>, Vec<dealership::Id>>>,
    > for Memory
{
    type Ok = HashMap<dealership::Id, Dealership>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<HashMap<dealership::Id, Dealership>, Vec<dealership::Id>>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.check(Failure::Dealerships)?;

        let dealerships = self
            .0
            .dealerships
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(ids
            .into_iter()
            .filter_map(|id| dealerships.get(&id).map(|d| (id, d.clone())))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    //! Ready-made domain values for tests.

    use common::DateTime;
    use rust_decimal::Decimal;

    use crate::domain::{
        dealership::{self, Location},
        listing::{self, Mileage, Price, Year},
        Dealership, Listing,
    };

    /// Creates a new [`Dealership`] with all the contacts filled.
    pub(crate) fn dealership(name: &str) -> Dealership {
        Dealership {
            id: dealership::Id::new(),
            name: dealership::Name::new(name).unwrap(),
            logo: dealership::LogoUrl::new("https://cdn.example.com/logo.png"),
            phone: dealership::Phone::new("+1 555 0100"),
            email: dealership::Email::new("sales@example.com"),
            address: dealership::Address::new("1 Main St, Springfield"),
            location: Location::new(40.7128, -74.006),
        }
    }

    /// Creates a new available [`Listing`] published just now.
    pub(crate) fn listing(
        dealership_id: dealership::Id,
        make: &str,
        model: &str,
    ) -> Listing {
        Listing {
            id: listing::Id::new(),
            dealership_id,
            make: listing::Make::new(make).unwrap(),
            model: listing::Model::new(model).unwrap(),
            year: Year::new(2018).unwrap(),
            price: Price::new(Decimal::from(15_000)).unwrap(),
            mileage: Mileage::new(45_000).unwrap(),
            condition: listing::Condition::new("used").unwrap(),
            category: listing::Category::new("cars").unwrap(),
            body_type: listing::BodyType::new("sedan").unwrap(),
            transmission: listing::Transmission::new("automatic").unwrap(),
            drivetrain: listing::Drivetrain::new("fwd").unwrap(),
            color: listing::Color::new("silver").unwrap(),
            description: None,
            status: listing::Status::Available,
            images: vec![],
            views: 0.into(),
            likes: 0.into(),
            listed_at: DateTime::now().coerce(),
        }
    }
}

#[cfg(test)]
mod spec {
    use std::collections::HashMap;

    use common::{
        operations::{By, Select},
        Handler as _,
    };

    use crate::{
        domain::{listing, Listing},
        read::listing::list::{Criteria, Predicate, Selector, Sort, TotalCount},
    };

    use super::{fixture, Failure, Memory};

    fn seeded() -> (Memory, Vec<Listing>) {
        let db = Memory::default();
        let dealer = fixture::dealership("Auto Hub");
        db.insert_dealership(dealer.clone());

        let listings = (0..5)
            .map(|i| {
                let mut l = fixture::listing(dealer.id, "Ford", "Focus");
                l.views = (i % 2).into();
                db.insert_listing(l.clone());
                l
            })
            .collect();
        (db, listings)
    }

    #[tokio::test]
    async fn counts_by_criteria() {
        let (db, _) = seeded();
        let criteria =
            Criteria::from(vec![Predicate::Status(listing::Status::Available)]);

        let count = db
            .execute(Select(By::<TotalCount, _>::new(criteria)))
            .await
            .unwrap();

        assert_eq!(u64::from(count), 5);
    }

    #[tokio::test]
    async fn breaks_ties_by_id() {
        let (db, mut all) = seeded();
        all.sort_by(|a, b| b.views.cmp(&a.views).then(a.id.cmp(&b.id)));

        let selected = db
            .execute(Select(By::<Vec<Listing>, _>::new(Selector {
                criteria: Criteria::default(),
                sort: Some(Sort::MostViewed),
                range: common::pagination::Range {
                    offset: 1,
                    limit: 3,
                },
            })))
            .await
            .unwrap();

        assert_eq!(selected, all[1..4]);
    }

    #[tokio::test]
    async fn skips_unknown_ids() {
        let (db, all) = seeded();

        let found = db
            .execute(Select(By::<HashMap<listing::Id, Listing>, _>::new(vec![
                all[0].id,
                listing::Id::new(),
            ])))
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn fails_on_demand() {
        let (db, all) = seeded();
        db.fail_on(Some(Failure::Lookup));

        assert!(db
            .execute(Select(By::<Option<Listing>, _>::new(all[0].id)))
            .await
            .is_err());

        db.fail_on(None);
        assert_eq!(
            db.execute(Select(By::<Option<Listing>, _>::new(all[0].id)))
                .await
                .unwrap(),
            Some(all[0].clone()),
        );
    }
}
