mod api;
mod provider;

#[cfg(test)]
mod tests;

pub use api::ApiConfig;
pub use provider::EmbeddingProvider;
