//! [`Query`] collection related to the multiple [`Dealership`]s.

use std::collections::HashMap;

use common::operations::By;

use crate::domain::{dealership, Dealership};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries multiple [`Dealership`]s by their [`dealership::Id`]s.
pub type ByIds =
    DatabaseQuery<By<HashMap<dealership::Id, Dealership>, Vec<dealership::Id>>>;
