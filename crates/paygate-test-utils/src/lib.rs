pub mod fixtures;
pub mod mock_gateway;

pub use fixtures::*;
pub use mock_gateway::{MockGateway, RecordedRequest};
