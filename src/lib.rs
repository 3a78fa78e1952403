//! MediRemind - medication reminder and health risk assessment backend
//!
//! This library provides the HTTP API, the reminder worker and the
//! notification channels behind the MediRemind dashboard.
//!
//! # Architecture
//! - `storage`: SeaORM-backed persistence (users, medications, reminders, push subscriptions)
//! - `services`: domain services (auth, medications, reminders, OCR, risk, notifications)
//! - `api`: HTTP handlers, middleware and shared state
//! - `interfaces`: one-shot CLI commands
//! - `config`: configuration management
//! - `runtime`: application lifecycle and execution modes
//! - `system`: logging initialization

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
