//! API endpoint modules.

pub mod deploy;
pub mod health;
pub mod openapi;
pub mod websocket;

pub use deploy::configure_routes as configure_deploy_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use websocket::configure_routes as configure_websocket_routes;
