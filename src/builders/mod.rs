//! Builders to construct pools from options.

pub mod pool_builder;

pub use pool_builder::PoolBuilder;
