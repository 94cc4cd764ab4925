//! NewHorizon is a terminal chat front-end for a locally hosted Ollama server.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the session: persona registry, conversation log, the
//!   streaming backend client, and the turn orchestration that ties them
//!   together.
//! - [`api`] defines the Ollama wire payloads and model listing.
//! - [`cli`] parses arguments and runs the line-oriented chat loop that
//!   presents a session in the terminal.
//! - [`utils`] holds small helpers shared by the layers above.
//!
//! The binary (`src/main.rs`) routes straight into [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
