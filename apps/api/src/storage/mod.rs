//! Storage Gateway (C9, spec §4.9).
//!
//! Typed accessors over the relational store. Schema feature-detection lives in
//! `crate::db::SchemaCapabilities`, checked by callers before touching an optional
//! table/column. Every write here is either append-only or an idempotent
//! `ON CONFLICT` upsert — no read-modify-write races across workers (spec §5).

pub mod contacts;
pub mod evidence;
pub mod jobs;
pub mod resumes;
pub mod scoring_runs;
pub mod targets;
