#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod admin;
mod reconciler;
mod settings;

pub use self::{
    admin::AdminService,
    reconciler::{Reconciler, DEFAULT_WORKERS},
    settings::SettingsService,
};
pub use groups_reconciler_core as core;
