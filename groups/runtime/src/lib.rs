#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use groups_reconciler_core as core;
pub use groups_reconciler_google as google;
pub use groups_reconciler_reconcile as reconcile;

mod args;
pub mod config;
pub mod print;
pub mod validation;

pub use self::{args::Args, config::Config};
