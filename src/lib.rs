//! An interactive command interpreter: pipelines of forked processes wired
//! with pipes and file redirection, foreground/background job control, and a
//! handful of builtins, among them a chat room built on named pipes.

pub mod builtin;
pub mod chat;
pub mod config;
pub mod cut;
pub mod error;
pub mod eval;
pub mod input;
pub mod job;
pub mod logging;
pub mod parser;
pub mod pinfo;
pub mod redirect;
pub mod search;
pub mod types;

pub use config::Config;
pub use eval::{eval, process, Outcome, Status};
pub use parser::parse;
