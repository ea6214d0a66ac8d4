//! # capstone-core
//!
//! Core types and error taxonomy for Capstone.
//!
//! This crate provides the foundational types shared across all Capstone crates:
//! - Entity structs (invitations, teams, project requests, artifacts, audit)
//! - Status enums with state machine transitions
//! - The submission workflow: event table, guards, stage derivation
//! - ID prefix constants
//! - Input validation
//! - CLI response types and audit detail sub-types

pub mod audit_detail;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod responses;
pub mod validation;
pub mod workflow;
