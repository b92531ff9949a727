mod routes;
mod state;
pub mod v1;

#[cfg(test)]
pub(crate) mod test_support;

pub use routes::create_router;
pub use state::AppState;
