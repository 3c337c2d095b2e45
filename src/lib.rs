//! Redis-backed typeahead autocomplete engine.
//!
//! An [`Engine`] wires together a provider [`registry`], an [`indexer`] that
//! writes/retracts postings, a [`query`] engine that serves `suggest`/
//! `exact_suggest`, and a TTL [`cache`] over a single [`store::RedisStore`]
//! connection. Callers implement [`provider::Provider`] for their own item
//! types and register them under autocompleter names; the engine never reads
//! an item store itself.
//!
//! ```no_run
//! # async fn run() -> autocompleter::error::Result<()> {
//! use autocompleter::Engine;
//!
//! let engine = Engine::builder()
//!     .redis_url("redis://127.0.0.1/")
//!     .root_namespace("djac")
//!     .build()
//!     .await?;
//!
//! let result = engine.suggest("stocks_ac", "app", &vec![]).await?;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```

pub mod alias;
pub mod cache;
pub mod engine;
pub mod error;
pub mod facet;
pub mod indexer;
pub mod keys;
pub mod normalize;
pub mod provider;
pub mod query;
pub mod registry;
pub mod score;
pub mod settings;
pub mod store;

pub use engine::{Engine, EngineBuilder};
pub use error::{Error, Result};
pub use facet::{FacetDict, FacetExpression, FacetPair, FacetType};
pub use provider::{Provider, ProviderMeta, ResolvedItem};
pub use query::SuggestResult;
pub use settings::{Settings, SettingsOverride};
