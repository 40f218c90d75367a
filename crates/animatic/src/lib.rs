//! Animatic - bounded-retry script-to-video pipeline
//!
//! Animatic turns an approved narration prompt into a finished, watermarked
//! animation by coordinating an LLM script generator, a static validator and
//! a sandboxed renderer. Every retry is bounded, every failure is classified
//! at the stage it happened, and every sandbox is torn down exactly once.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use animatic::{GenerationOrchestrator, JobRequest, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = GenerationOrchestrator::builder()
//!         .generator(my_generator)
//!         .validator(my_validator)
//!         .renderer(my_renderer)
//!         .uploader(my_uploader)
//!         .reporter(my_reporter)
//!         .metadata(my_metadata)
//!         .store(my_store)
//!         .trigger(my_trigger)
//!         .config(PipelineConfig::load()?)
//!         .build()?;
//!
//!     let request = JobRequest::new("job-1", "owner-1", "Explain the Pythagorean theorem");
//!     match orchestrator.run(&request).await {
//!         Ok(outcome) => println!("Video at {}", outcome.video_url()),
//!         Err(e) => orchestrator.handle_failure("job-1", &e).await?,
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `animatic_core` - Scripts, fingerprints, stages, error details, render options
//! - `animatic_error` - Error types
//! - `animatic_interface` - Collaborator traits
//! - `animatic_render` - Sandboxed render pipeline and local sandbox
//! - `animatic_pipeline` - Fix loop, render attempt loop, checkpoints, orchestrator
//!
//! This crate re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use animatic_core::*;
pub use animatic_error::*;
pub use animatic_interface::*;
pub use animatic_pipeline::*;
pub use animatic_render::*;
