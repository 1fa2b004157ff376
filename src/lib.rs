//! Territory Scoring API Library
//!
//! Scores B2B companies for sales-territory prioritization: a classifier estimates the
//! probability of closing a deal, a regressor estimates annual contract value, and the
//! two combine into an expected value and a priority segment.
//!
//! # Modules
//!
//! - `artifacts`: Artifact loading with SHA-256 checksums.
//! - `batch`: Batch aggregation and summary statistics.
//! - `config`: Configuration management.
//! - `context`: The immutable scoring context shared by all requests.
//! - `docs`: OpenAPI document and Swagger UI.
//! - `errors`: Error handling types.
//! - `features`: Raw record to feature vector.
//! - `handlers`: HTTP request handlers and router.
//! - `model`: Model traits and the decision-tree artifact format.
//! - `models`: Response models.
//! - `params`: Preprocessing parameters and the derived feature schema.
//! - `processor`: Single-record gate, build and score.
//! - `scorer`: Inference and segment assignment.

pub mod artifacts;
pub mod batch;
pub mod config;
pub mod context;
pub mod docs;
pub mod errors;
pub mod features;
pub mod handlers;
pub mod model;
pub mod models;
pub mod params;
pub mod processor;
pub mod scorer;
