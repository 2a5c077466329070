//! User settings.
//!
//! `schema` holds the serde types with their defaults; `load` layers the TOML
//! file under `BAHR__`-prefixed environment overrides and validates the
//! result.

mod load;
mod schema;

pub use load::resolve_config_path;
pub use schema::*;

#[cfg(test)]
mod tests;
