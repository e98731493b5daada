#![doc = "repoai-core: core logic library for RepoAI."]

//! This crate holds everything RepoAI does apart from speaking HTTP:
//! repository listing and raw fetches, file filtering, LLM prompts, the
//! streaming analysis pipeline, the shell executor and the workspace file
//! passthroughs.
//!
//! # Usage
//! Build the components from a [`config::Settings`], wire the
//! [`contract::RepositoryFetcher`] and [`contract::LlmClient`] implementations
//! into a [`pipeline::AnalysisPipeline`], and consume its event stream.

pub mod config;
pub mod contract;
pub mod error;
pub mod executor;
pub mod filter;
pub mod github;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod workspace;
