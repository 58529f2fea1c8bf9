//! Client for the Paygate payment gateway.
//!
//! Every exchange with the gateway is a signed envelope: requests are signed
//! with the client's certificate, responses with a gateway certificate that
//! is looked up by fingerprint and cached.
//!
//! - [`GatewaySettings`]: TOML configuration
//! - [`GatewayClient`]: signed calls for one client identity
//! - [`ClientFactory`]: one client per configured identity
//! - [`KeyCache`]: trusted gateway keys
//! - [`Transport`] / [`HttpTransport`]: the HTTP seam
//! - [`endpoints`]: gateway paths
//!
//! # Example
//!
//! ```no_run
//! use paygate_client::{endpoints, GatewayClient, GatewaySettings};
//! use serde_json::{json, Value};
//!
//! # async fn run() -> paygate_client::ProtocolResult<()> {
//! let settings = GatewaySettings::load_default()?;
//! let client = GatewayClient::from_settings(&settings)?;
//!
//! let response = client
//!     .call::<_, Value>(endpoints::PURCHASE, json!({"amount": 100, "currency": "UYU"}))
//!     .await;
//! if !response.is_ok() {
//!     eprintln!("{:?}", response.message("es"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
mod driver;
pub mod endpoints;
mod error;
mod factory;
mod transport;
mod trust;

pub use config::{default_config_path, ClientCertificateSettings, GatewaySettings};
pub use driver::GatewayClient;
pub use error::{ProtocolError, ProtocolResult};
pub use factory::ClientFactory;
pub use transport::{HttpTransport, Transport};
pub use trust::KeyCache;
