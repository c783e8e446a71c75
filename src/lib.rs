//! Credit Risk Scoring & Portfolio Analytics API Library
//!
//! This library provides the core functionality for the credit risk
//! service: the probability → score → tier transform, region resolution
//! with best-effort geocoding, borrower persistence, and portfolio
//! aggregation.
//!
//! # Modules
//!
//! - `borrowers`: Borrower graph storage and input validation.
//! - `circuit_breaker`: Circuit breaker for the geocoding capability.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `geocode`: External geocoding client.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `portfolio`: Portfolio aggregate queries and ranking.
//! - `regions`: Region get-or-create resolution.
//! - `scoring`: Scoring model and risk transform.

pub mod borrowers;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod errors;
pub mod geocode;
pub mod handlers;
pub mod models;
pub mod portfolio;
pub mod regions;
pub mod scoring;
