//! # chatgpt-export
//!
//! A CLI tool that converts a ChatGPT data export (`conversations.json`) into
//! one Markdown file and one Word document per conversation.
//!
//! ## What it does
//!
//! ChatGPT stores every conversation as a tree of message nodes: editing a
//! prompt or regenerating a reply adds a sibling branch instead of replacing the
//! old one. This tool walks each tree from its root down a single branch (the
//! first child by default, or the latest with `--branch last`), drops empty
//! and hidden nodes, and writes the resulting thread as
//! `{YYYY-MM-DD}_{Title}.md` and `{YYYY-MM-DD}_{Title}.docx`.
//!
//! Conversations with no visible messages are skipped. A conversation that
//! cannot be converted is reported and counted; the rest of the export still
//! runs.
//!
//! ## Usage
//!
//! ```sh
//! # Convert ./conversations.json into ./chatgpt_export_reader_output
//! chatgpt-export
//!
//! # Explicit paths, Markdown only, follow the most recent edits
//! chatgpt-export ~/Downloads/conversations.json -o ~/notes/chatgpt --formats md --branch last
//! ```
//!
//! Preferences can be persisted in `~/.config/chatgpt-export/config.toml`.
pub mod document;
pub mod importer;
pub mod renderer;
pub mod sequential;
pub mod thread;
pub mod utils;

pub use sequential::{Summary, execute};
pub use thread::{BranchPolicy, Entry, extract};
pub use utils::{ExportConfig, Format};
