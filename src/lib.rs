//! LocalBitcoins API Client
//!
//! A thin, signed HTTP client for the LocalBitcoins trading API.
//!
//! - **Route resolution**: logical method names, some of which embed an
//!   identifier taken from the call's params (`contact_info/{contact_id}`)
//! - **HMAC-SHA256 signing** of private calls with a strictly increasing nonce
//! - **Response normalization** into transport, parse and API errors
//!
//! ```no_run
//! use localbitcoins_client::{LbcClient, Params};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = LbcClient::from_env()?;
//!     let dashboard = client.api("dashboard", Params::new(), "GET").await?;
//!     println!("{}", dashboard);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`auth`]: Credentials, request signing and nonces
//! - [`params`]: Ordered request parameters and form encoding
//! - [`routes`]: Method to path resolution
//! - [`transport`]: HTTP transport seam and the reqwest implementation
//! - [`client`]: Main API client implementation

pub mod auth;
pub mod client;
pub mod error;
pub mod params;
pub mod routes;
pub mod transport;

pub use auth::{sign_request, Credentials, NonceGenerator};
pub use client::{ClientConfig, LbcClient, API_BASE_URL};
pub use error::{LbcError, LbcResult};
pub use params::Params;
pub use routes::{resolve, Access, ResolvedRoute, RouteTable};
pub use transport::{HttpRequest, HttpResponse, HttpVerb, ReqwestTransport, Transport};
