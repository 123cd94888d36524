//! Gateway library
//!
//! HTTP surface for the attendance service. External requests are routed
//! to internal services via InProcess calls.

pub mod api;
pub mod config;
pub mod router;

pub use api::app;
pub use config::GatewayConfig;
pub use router::ServiceRouter;
