//! [`Listing`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Select};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{listing, Listing},
    infra::{
        database::{
            self,
            postgres::{Connection, LikePattern},
            Postgres,
        },
        Database,
    },
    read::listing::list::{
        Criteria, Predicate, Selector, SortField, TextField, TotalCount,
    },
};

/// Columns of the `listings` table selected into a [`Listing`].
const COLUMNS: &str = "\
    id, dealership_id, \
    make, model, year, price, mileage, \
    condition, category, body_type, transmission, drivetrain, color, \
    description, status, images, views, likes, listed_at";

/// Builds a [`Listing`] out of the provided [`Row`] selected with
/// [`COLUMNS`].
fn listing_from_row(row: &Row) -> Listing {
    Listing {
        id: row.get("id"),
        dealership_id: row.get("dealership_id"),
        make: row.get("make"),
        model: row.get("model"),
        year: row.get("year"),
        price: row.get("price"),
        mileage: row.get("mileage"),
        condition: row.get("condition"),
        category: row.get("category"),
        body_type: row.get("body_type"),
        transmission: row.get("transmission"),
        drivetrain: row.get("drivetrain"),
        color: row.get("color"),
        description: row.get("description"),
        status: row.get("status"),
        images: row.get("images"),
        views: row.get("views"),
        likes: row.get("likes"),
        listed_at: row.get("listed_at"),
    }
}

/// Returns the column name of the provided [`TextField`].
const fn text_column(field: TextField) -> &'static str {
    match field {
        TextField::Make => "make",
        TextField::Model => "model",
        TextField::Description => "description",
        TextField::Color => "color",
        TextField::Category => "category",
        TextField::Transmission => "transmission",
        TextField::Drivetrain => "drivetrain",
        TextField::BodyType => "body_type",
        TextField::Condition => "condition",
    }
}

/// Returns the column name of the provided [`SortField`].
const fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::Price => "price",
        SortField::Year => "year",
        SortField::Mileage => "mileage",
        SortField::ListedAt => "listed_at",
        SortField::Views => "views",
    }
}

/// Prepares [`LikePattern`]s for the [`Predicate::Matches`] of the provided
/// [`Criteria`], one per [`Predicate`].
fn like_patterns(criteria: &Criteria) -> Vec<Option<LikePattern>> {
    criteria
        .predicates()
        .iter()
        .map(|p| match p {
            Predicate::Matches(s) => Some(LikePattern::containing(s.text())),
            Predicate::Status(_)
            | Predicate::OneOf(..)
            | Predicate::DealershipIn(_)
            | Predicate::DealershipNameIn(_)
            | Predicate::PriceWithin(_)
            | Predicate::MileageWithin(_)
            | Predicate::YearWithin(_)
            | Predicate::ListedSince(_) => None,
        })
        .collect()
}

/// Renders the provided [`Criteria`] as SQL conditions of a `WHERE` clause,
/// pushing their parameters into `ps`.
///
/// `patterns` must be the ones returned by [`like_patterns()`] for the same
/// [`Criteria`].
fn conditions<'a>(
    criteria: &'a Criteria,
    patterns: &'a [Option<LikePattern>],
    ps: &mut Vec<&'a (dyn ToSql + Sync)>,
) -> String {
    let mut push = |p: &'a (dyn ToSql + Sync)| {
        ps.push(p);
        ps.len()
    };

    criteria
        .predicates()
        .iter()
        .zip(patterns)
        .filter_map(|(predicate, pattern)| {
            Some(match predicate {
                Predicate::Status(s) => {
                    format!("AND status = ${}::INT2", push(s))
                }
                Predicate::OneOf(field, values) => format!(
                    "AND {} = ANY(${}::VARCHAR[])",
                    text_column(*field),
                    push(values),
                ),
                Predicate::DealershipIn(ids) => {
                    format!("AND dealership_id = ANY(${}::UUID[])", push(ids))
                }
                Predicate::DealershipNameIn(names) => format!(
                    "AND dealership_id IN (\
                         SELECT id \
                         FROM dealerships \
                         WHERE name = ANY(${}::VARCHAR[])\
                     )",
                    push(names),
                ),
                Predicate::PriceWithin(r) => format!(
                    "AND price BETWEEN ${}::NUMERIC AND ${}::NUMERIC",
                    push(r.start()),
                    push(r.end()),
                ),
                Predicate::MileageWithin(r) => format!(
                    "AND mileage BETWEEN ${}::INT4 AND ${}::INT4",
                    push(r.start()),
                    push(r.end()),
                ),
                Predicate::YearWithin(r) => format!(
                    "AND year BETWEEN ${}::INT2 AND ${}::INT2",
                    push(r.start()),
                    push(r.end()),
                ),
                Predicate::ListedSince(since) => {
                    format!("AND listed_at >= ${}::TIMESTAMPTZ", push(since))
                }
                Predicate::Matches(search) => {
                    let idx = push(pattern.as_ref()?);
                    format!(
                        "AND ({text}{numeric})",
                        text = TextField::SEARCHABLE.iter().format_with(
                            " OR ",
                            |f, fmt| fmt(&format_args!(
                                "{} ILIKE ${idx}::VARCHAR",
                                text_column(*f),
                            )),
                        ),
                        numeric = search
                            .is_numeric()
                            .then_some(["year", "price", "mileage"])
                            .into_iter()
                            .flatten()
                            .format_with("", |col, fmt| fmt(&format_args!(
                                " OR {col}::TEXT LIKE ${idx}::VARCHAR",
                            ))),
                    )
                }
            })
        })
        .join(" ")
}

impl<C> Database<Select<By<TotalCount, Criteria>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<TotalCount, Criteria>>,
    ) -> Result<Self::Ok, Self::Err> {
        let criteria = by.into_inner();
        let patterns = like_patterns(&criteria);

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];
        let sql = format!(
            "SELECT COUNT(*)::INT8 \
             FROM listings \
             WHERE true {}",
            conditions(&criteria, &patterns, &mut ps),
        );
        let count = self
            .query_opt(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .map_or(0, |row| row.get::<_, i64>(0));
        Ok(u64::try_from(count).unwrap_or_default().into())
    }
}

impl<C> Database<Select<By<Vec<Listing>, Selector>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Listing>, Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Selector {
            criteria,
            sort,
            range,
        } = by.into_inner();
        let patterns = like_patterns(&criteria);
        let limit = i64::try_from(range.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(range.offset).unwrap_or(i64::MAX);

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit, &offset];
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM listings \
             WHERE true {conditions} \
             ORDER BY {ordering} \
                      id ASC \
             LIMIT $1::INT8 OFFSET $2::INT8",
            conditions = conditions(&criteria, &patterns, &mut ps),
            ordering = sort.into_iter().format_with("", |s, f| {
                let (field, order) = s.ordering();
                f(&format_args!("{} {},", sort_column(field), order.sql()))
            }),
        );
        Ok(self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(listing_from_row)
            .collect())
    }
}

impl<C, IDs> Database<Select<By<HashMap<listing::Id, Listing>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[listing::Id]>,
{
    type Ok = HashMap<listing::Id, Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<listing::Id, Listing>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[listing::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap_or(i32::MAX);

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM listings \
             WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
             LIMIT $2::INT4",
        );
        Ok(self
            .query(&sql, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let listing = listing_from_row(row);
                (listing.id, listing)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Listing>, listing::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<listing::Id, Listing>, [listing::Id; 1]>>,
        Ok = HashMap<listing::Id, Listing>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;
    use postgres_types::ToSql;

    use crate::{
        domain::{dealership, listing},
        read::listing::list::{Criteria, Filter, Special},
    };

    use super::{conditions, like_patterns};

    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    /// Renders the provided [`Criteria`] after `LIMIT` and `OFFSET`
    /// parameters, returning the SQL and the total number of parameters.
    fn render(criteria: &Criteria) -> (String, usize) {
        let patterns = like_patterns(criteria);
        let (limit, offset) = (9_i64, 0_i64);
        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit, &offset];
        let sql = conditions(criteria, &patterns, &mut ps);
        (sql, ps.len())
    }

    #[test]
    fn numbers_parameters_after_limit_and_offset() {
        let filter = Filter {
            makes: vec![listing::Make::new("Toyota").unwrap()],
            query: Some("2020".into()),
            ..Filter::default()
        };
        let (sql, params) = render(&filter.criteria(DateTime::now(), WEEK));

        assert_eq!(
            sql,
            "AND status = $3::INT2 \
             AND make = ANY($4::VARCHAR[]) \
             AND price BETWEEN $5::NUMERIC AND $6::NUMERIC \
             AND mileage BETWEEN $7::INT4 AND $8::INT4 \
             AND year BETWEEN $9::INT2 AND $10::INT2 \
             AND (make ILIKE $11::VARCHAR \
             OR model ILIKE $11::VARCHAR \
             OR description ILIKE $11::VARCHAR \
             OR color ILIKE $11::VARCHAR \
             OR category ILIKE $11::VARCHAR \
             OR transmission ILIKE $11::VARCHAR \
             OR drivetrain ILIKE $11::VARCHAR \
             OR body_type ILIKE $11::VARCHAR \
             OR condition ILIKE $11::VARCHAR \
             OR year::TEXT LIKE $11::VARCHAR \
             OR price::TEXT LIKE $11::VARCHAR \
             OR mileage::TEXT LIKE $11::VARCHAR)",
        );
        assert_eq!(params, 11);
    }

    #[test]
    fn text_search_skips_numeric_columns() {
        let filter = Filter {
            query: Some("  sedan ".into()),
            ..Filter::default()
        };
        let (sql, params) = render(&filter.criteria(DateTime::now(), WEEK));

        assert!(sql.ends_with("OR condition ILIKE $10::VARCHAR)"), "{sql}");
        assert!(!sql.contains("::TEXT LIKE"), "{sql}");
        assert_eq!(params, 10);
    }

    #[test]
    fn renders_dealership_and_recency_conditions() {
        let filter = Filter {
            dealership_ids: vec![dealership::Id::new()],
            dealership_names: vec![dealership::Name::new("Auto Hub").unwrap()],
            special: Some(Special::RecentlyListed),
            ..Filter::default()
        };
        let (sql, params) = render(&filter.criteria(DateTime::now(), WEEK));

        assert!(
            sql.starts_with(
                "AND status = $3::INT2 \
                 AND dealership_id = ANY($4::UUID[]) \
                 AND dealership_id IN (\
                     SELECT id \
                     FROM dealerships \
                     WHERE name = ANY($5::VARCHAR[])\
                 ) ",
            ),
            "{sql}",
        );
        assert!(sql.ends_with("AND listed_at >= $12::TIMESTAMPTZ"), "{sql}");
        assert_eq!(params, 12);
    }

    #[test]
    fn empty_criteria_render_nothing() {
        assert_eq!(render(&Criteria::default()), (String::new(), 2));
    }
}
