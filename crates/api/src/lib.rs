pub mod middleware;
pub mod routes;
pub mod sessions;
pub mod state;
