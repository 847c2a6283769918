//! Pagewright: Declarative Page Objects with Wait-and-Verify
//!
//! Test authors declare pages and nested regions ("sections") as schemas of
//! named nodes. Pagewright then verifies, against an asynchronously
//! rendering page, that the declared structure is actually there before any
//! assertion runs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PAGEWRIGHT Architecture                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Page       │    │ Recursion  │    │ Element    │            │
//! │   │ (Loadable) │───►│ Checker    │───►│ Checker    │───► Driver │
//! │   │            │    │ (schemas)  │    │ (+ Timer)  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`Timer`] polls a predicate at a fixed interval until a [`Deadline`].
//! - [`ElementChecker`] runs presence, absence and count checks for one [`SelectorSpec`].
//! - [`RecursionChecker`] walks a schema tree with one shared deadline and cuts cycles.
//! - [`Page`] tracks whether the page is loaded and exposes the verification API.
//!
//! The browser itself is behind the [`Driver`] trait; [`mock::MockDriver`]
//! scripts a page in memory.
//!
//! # Example
//!
//! ```rust,ignore
//! use pagewright::prelude::*;
//!
//! let mut registry = SchemaRegistry::new();
//! let home = registry.register(
//!     "Home",
//!     SchemaBuilder::new()
//!         .element("title", ".title")
//!         .element("spinner", ".spinner")
//!         .expected(["title"])
//!         .invisible(["spinner"]),
//! )?;
//! let mut page = Page::new(driver, registry.freeze()?, home, Config::default())?;
//! page.verify_loaded(Some(Duration::from_secs(1)))?;
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod checker;
mod config;
#[allow(clippy::missing_errors_doc)]
mod driver;
mod loadable;
pub mod logging;
/// In-memory driver for tests, benches and demos
pub mod mock;
mod outcome;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod page;
mod path;
#[allow(clippy::missing_errors_doc)]
mod recursion;
mod result;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod schema;
mod selector;
mod timer;

pub use checker::{ElementChecker, Expectation, Probe, Wait};
pub use config::{
    Config, LogLevel, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS, ENV_LOG_LEVEL,
    ENV_POLL_INTERVAL_MS, ENV_TIMEOUT_MS, MIN_POLL_INTERVAL,
};
pub use driver::{Driver, LocateError, LocateErrorKind, NodeHandle, Query};
pub use loadable::{LoadState, LoadStatus, LoadValidation};
pub use outcome::{CheckOutcome, CheckStatus, VerificationReport};
pub use page::Page;
pub use path::{PathSegment, VisitPath};
pub use recursion::{RecursionChecker, RecursionDepth, Selection};
pub use result::{PageError, PageResult};
pub use schema::{Node, NodeKind, PageSchema, SchemaBuilder, SchemaId, SchemaRegistry, Schemas};
pub use selector::{CountConstraint, Selector, SelectorSpec, SelectorSpecBuilder};
pub use timer::{Deadline, Strictness, Timer, WaitResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::checker::*;
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::loadable::*;
    pub use super::outcome::*;
    pub use super::page::*;
    pub use super::path::*;
    pub use super::recursion::*;
    pub use super::result::*;
    pub use super::schema::*;
    pub use super::selector::*;
    pub use super::timer::*;
    pub use std::time::Duration;
}
