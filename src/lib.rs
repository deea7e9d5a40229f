#![forbid(unsafe_code)]

//! Microcopy core for DJOBBA.
//!
//! Resolves short localized UI texts stored centrally in the hosted
//! backend. A process-wide [`MicrocopyCache`] keeps the last full snapshot
//! of the text table for five minutes, the [`TextResolver`] picks the
//! language variant and fills in `{{name}}` placeholders, and the
//! [`Presenter`] exposes the result to UI code with an explicit loading
//! state.

pub mod config;
pub mod error;
pub mod model;
pub mod parsers;
pub mod protocol;
pub mod services;

pub use error::{ConfigError, StoreError};
pub use model::entry::{Language, TextEntry};
pub use model::snapshot::{LocalizedText, Snapshot};
pub use services::cache::{CacheStats, MicrocopyCache, DEFAULT_TTL};
pub use services::presenter::{
    MicrocopyElement, Presenter, Subscription, TextState, TextView, TextsView, LOADING_TEXT,
};
pub use services::resolver::{fallback_marker, Resolution, TextResolver};
pub use services::template::{variables, VarValue, Variables};
pub use services::text_store::TextStore;
