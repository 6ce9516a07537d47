pub mod bootstrap;
pub mod config;
pub mod exclusion;
pub mod expire;
pub mod interval;
pub mod label;
pub mod prune;
pub mod recycle;
pub mod scratch;
pub mod select;

pub use mediaplan_types::error;

#[cfg(test)]
mod tests;
#[cfg(test)]
mod testutil;
