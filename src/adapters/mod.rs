// Adapters layer: concrete implementations for external systems (http,
// output encodings).

pub mod export;
pub mod http;

pub use http::NominatimClient;
