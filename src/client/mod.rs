//! Typed counterpart of the in-page script: a cookie-holding HTTP client for
//! the service and the page controller state machine that drives it.

pub mod controller;
pub mod http;

pub use controller::{
    CatalogSource, DetailView, ListRequest, PageController, SourceError, ToggleOutcome, View,
};
pub use http::ServiceClient;
