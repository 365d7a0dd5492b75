//! # Site Deploy
//!
//! Deployment pipeline for static sites built with npm tooling.
//!
//! A run cleans transient artifacts out of the project, flags assets nothing
//! imports, optimizes images and stylesheets, builds the project and ships it
//! with the hosting provider's CLI.
//!
//! ## Features
//!
//! - Cleanup patterns for directories, globs and exact paths
//! - Advisory unused-asset detection
//! - Provider detection from marker files (Vercel, Netlify, Firebase, Wix)
//! - Every external command goes through a swappable [`runner::CommandRunner`]
//!
//! ## Usage
//!
//! ```ignore
//! use site_deploy::pipeline::Pipeline;
//! use site_deploy::runner::SystemRunner;
//!
//! let report = Pipeline::new(&config, &SystemRunner).run()?;
//! ```

/// Build command selection and execution
pub mod builder;

/// Workspace artifact cleanup
pub mod clean;

/// CLI configuration and argument parsing
pub mod config;

/// Error types for deployment operations
pub mod error;

/// Image and CSS optimization
pub mod optimize;

/// Stage sequencing
pub mod pipeline;

/// Hosting provider detection and deployment
pub mod provider;

/// External command descriptors and runners
pub mod runner;

/// Unused asset detection
pub mod scan;

/// Console formatting
pub mod style;
