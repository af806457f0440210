pub mod connection;
pub mod repositories;

pub use connection::{DataApiClient, DataApiSettings};
pub use repositories::{
    AccountRepository, InMemoryQueryBoundary, QueryBoundary, RepositoryError, SqlParameter,
};
