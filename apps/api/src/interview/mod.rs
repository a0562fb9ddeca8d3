// Mock interview engine.
// Implements: question generation, answer scoring, follow-ups, results and session replay.
// All model calls go through llm_client.

pub mod follow_up;
pub mod generator;
pub mod handlers;
pub mod media;
pub mod prompts;
pub mod results;
pub mod scoring;
pub mod session;
pub mod store;
pub mod view;
