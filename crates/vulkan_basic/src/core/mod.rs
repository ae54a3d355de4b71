//! Core application types

pub mod config;
