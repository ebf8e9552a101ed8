//! [`Dealership`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{
        dealership::{self, Location},
        Dealership,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C, IDs> Database<Select<By<HashMap<dealership::Id, Dealership>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[dealership::Id]>,
{
    type Ok = HashMap<dealership::Id, Dealership>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<dealership::Id, Dealership>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[dealership::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap_or(i32::MAX);

        const SQL: &str = "\
            SELECT id, name, logo, phone, email, address, \
                   latitude, longitude \
            FROM dealerships \
            WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
            LIMIT $2::INT4";
        Ok(self
            .query(SQL, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                let location = row
                    .get::<_, Option<f64>>("latitude")
                    .zip(row.get::<_, Option<f64>>("longitude"))
                    .and_then(|(lat, lon)| Location::new(lat, lon));
                (
                    id,
                    Dealership {
                        id,
                        name: row.get("name"),
                        logo: row.get("logo"),
                        phone: row.get("phone"),
                        email: row.get("email"),
                        address: row.get("address"),
                        location,
                    },
                )
            })
            .collect())
    }
}
