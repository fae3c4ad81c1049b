//! Core library for the `weathernow` front-end.
//!
//! This crate defines:
//! - Configuration & API key handling
//! - The fetch controller: validation, background fetch, hand-off to the UI context
//! - The icon loader and the OpenWeatherMap provider behind a trait
//! - Shared domain models (requests, snapshots, icons)
//!
//! It is used by `weathernow`, but any front-end that implements [`View`] can drive it.

pub mod config;
pub mod controller;
pub mod error;
pub mod icon;
pub mod model;
pub mod provider;

pub use config::Config;
pub use controller::{Delivery, FetchController, FetchPhase, Inbox, Outcome, View};
pub use error::{FetchError, Severity};
pub use icon::IconLoader;
pub use model::{FetchRequest, IconAsset, PLACEHOLDER, Units, WeatherSnapshot};
pub use provider::{OpenWeatherProvider, WeatherProvider};
