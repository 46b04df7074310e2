//! Data types shared across the pipeline.

pub mod artifact;
pub mod capture;
pub mod component;
pub mod config;
