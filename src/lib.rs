//! # Vault Context
//!
//! Builds LLM prompts from a directory of Markdown notes (a "vault").
//!
//! A generation selects the relevant files of the vault, renders them as an
//! ASCII tree and/or line-numbered content blocks, and injects the result
//! into a prompt template together with the destination note path and a set
//! of hierarchical tags derived from it.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────────┐   ┌─────────────┐   ┌──────────┐
//! │ Discovery │──▶│ Tree +     │──▶│  Context    │──▶│ Template │──▶ prompt
//! │ (filters) │   │ Formatter  │   │ (mode)      │   │ inject   │
//! └───────────┘   └────────────┘   └─────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vctx vault add notes ~/notes
//! vctx generate --vault-name notes --target Projects --dest Projects/new.md
//! vctx generate --mode tree --template summarize --output out/prompt.md
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML settings: saved vaults and defaults |
//! | [`models`] | Output modes and extension filters |
//! | [`discovery`] | Relevant-file search with target containment |
//! | [`tree`] | ASCII tree rendering |
//! | [`formatter`] | Line-numbered file blocks |
//! | [`template`] | Placeholder tokens and injection |
//! | [`templates`] | Built-in and on-disk template lookup |
//! | [`pipeline`] | End-to-end prompt generation |
//! | [`error`] | Error type |

pub mod config;
pub mod discovery;
pub mod error;
pub mod formatter;
pub mod models;
pub mod pipeline;
pub mod template;
pub mod templates;
pub mod tree;

pub use error::{Result, VaultError};
