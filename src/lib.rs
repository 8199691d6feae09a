pub mod config;
pub mod consts;
pub mod core_types;
pub mod corpus;
pub mod encoder;
pub mod error;
pub mod loader;
pub mod mapping;
pub mod objective;
pub mod operators;
pub mod optimizer;
pub mod prism;
pub mod problem;
pub mod util;
// cmd and reports belong to the binary crate (main.rs).
