pub mod catalog;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod products;
pub mod routes;
pub mod sync;

pub use error::ApiError;
pub use routes::create_router;
