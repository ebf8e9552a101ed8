//! [`Handler`] abstractions.

use std::future::Future;

/// Asynchronous handler of `Args`.
///
/// Queries and database operations are all expressed as [`Handler`]s, so a
/// single type may handle many different argument types.
pub trait Handler<Args = ()> {
    /// Type returned on success.
    type Ok;

    /// Type returned on failure.
    type Err;

    /// Handles the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
