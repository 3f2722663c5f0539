//! Infrastructure services

mod cache_gateway;
mod single_flight;

pub use cache_gateway::{CacheGateway, CacheGatewayConfig};
pub use single_flight::SingleFlight;
