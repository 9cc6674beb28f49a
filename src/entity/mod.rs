//! SeaORM entity definitions.

pub mod deployment;
