pub mod episodes;
pub mod handlers;
pub mod middleware;
pub mod orchestrator;
pub mod routes;
pub mod shows;

pub use routes::create_router;
