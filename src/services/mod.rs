//! Business logic services.

pub mod bitbucket;
pub mod event_broadcaster;
pub mod fonts;
pub mod generation;
pub mod github;
pub mod http;
pub mod paths;
pub mod pipeline;
pub mod templates;
pub mod trigger;
pub mod vercel;

pub use event_broadcaster::{EventBroadcaster, SessionSubscription};
pub use pipeline::{DeploymentPipeline, PipelineOutcome};
