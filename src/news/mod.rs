//! Article model, filtering, and the fetch path.

pub mod filter;
pub mod model;
pub mod service;

pub use service::NewsService;
