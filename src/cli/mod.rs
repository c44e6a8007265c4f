//! Command implementations for the `prm` binary

mod add;
mod context;
mod list;
mod purge;
mod refresh;
mod remove;
pub mod style;

pub use add::run_add_provider;
pub use context::CommandContext;
pub use list::{run_list_providers, run_list_prs};
pub use purge::run_purge;
pub use refresh::run_refresh_providers;
pub use remove::run_remove_provider;
