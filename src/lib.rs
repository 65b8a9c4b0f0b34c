//! Forensic browser artefact extraction.
//!
//! Reads the history, download, bookmark, cookie, login, form, extension,
//! favicon and cache stores of Chromium- and Firefox-family profiles and
//! merges them into one time-ordered list of [`artefact::Artefact`] records.

pub mod artefact;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod export;
pub mod extract;
pub mod logging;
pub mod parsers;
pub mod pipeline;
pub mod store;
pub mod timestamp;
pub mod util;
