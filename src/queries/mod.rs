//! Query modules for the estate price SDK.
//!
//! Each module provides a query struct that borrows a
//! [`SearchBackend`](crate::connection::SearchBackend) (normally the SDK's
//! [`Connection`](crate::connection::Connection)) and returns `Result<T>`.

pub mod prices;

pub use prices::PriceQuery;
