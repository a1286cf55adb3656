//! Core library for the `weather-lookup` client.
//!
//! This crate defines:
//! - The lookup form controller and its submission lifecycle
//! - Rendering of stored weather records into display rows
//! - Abstraction over the remote record service, with an HTTP implementation
//! - Configuration handling and shared domain models
//!
//! It is used by `weather-lookup`, but can also back other front ends.

pub mod config;
pub mod controller;
pub mod error;
pub mod lookup;
pub mod model;
pub mod render;

pub use config::Config;
pub use controller::{FormController, SubmitOutcome};
pub use error::{LookupError, LookupResult};
pub use lookup::{LookupService, ServiceReply, create_record, http::HttpLookupService};
pub use model::{FormState, NewRecord, Phase, SubmissionResult, WeatherRecord};
pub use render::{Rendered, WeatherReport, render, render_submission};
