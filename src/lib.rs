//! `unicompile`: a platform-dispatch and artifact-unification layer over smart-contract build
//! frameworks, in the same spirit as `foundry-compilers` but targeting the wider ecosystem
//! (Foundry, Hardhat, Truffle, Dapp, Brownie, Waffle and a handful of retired frameworks) rather
//! than Foundry alone, plus a verification-service fetcher for compiling straight from a deployed
//! address.
//!
//! This crate is a library, not a CLI: `argv` parsing and installing a `tracing` subscriber are
//! the embedding binary's job. [`orchestrator::compile`] is the single entry point; everything
//! else is exposed for callers that want to drive a piece of the pipeline directly (library
//! linking, export, the verification fetcher) without going through the full orchestrator.

pub mod compilers;
pub mod config;
pub mod error;
pub mod export;
pub mod filename;
pub mod linker;
pub mod metadata;
pub mod model;
pub mod natspec;
pub mod orchestrator;
pub mod platform;
pub mod utils;
pub mod verify;

pub use config::Config;
pub use error::{CompileError, Result};
pub use model::{CompilationUnit, Project, SourceUnit};
pub use orchestrator::compile;
