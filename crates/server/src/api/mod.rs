pub mod convert;
pub mod episodes;
pub mod handlers;
pub mod middleware;
pub mod progress;
pub mod routes;

pub use routes::create_router;
