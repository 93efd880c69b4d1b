/*
 * config.rs
 * Copyright (c) 2026 ExtraDoc contributors
 */

//! Engine configuration.

use serde::{Deserialize, Serialize};

/// What to do when a change touches a horizontal rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalRulePolicy {
    /// Skip the change and report a warning.
    Skip,
    /// Fail the call with `UnsupportedChange`.
    Error,
}

/// Options recognized by the engine. `Default` gives the documented
/// defaults; construct with struct update syntax to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Prefer finer-grained text edits that keep a paragraph's terminal
    /// newline untouched, preserving list identity and comment anchors on
    /// the terminator. When false, modified groups are replaced wholesale.
    pub preserve_list_identity: bool,

    /// Fail on any structural change touching a section break. When false,
    /// such changes are skipped with a warning.
    pub strict_section_breaks: bool,

    pub horizontal_rule_policy: HorizontalRulePolicy,

    /// Cap on the number of deferred-id batches, catching runaway segment
    /// nesting.
    pub max_batches: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preserve_list_identity: true,
            strict_section_breaks: true,
            horizontal_rule_policy: HorizontalRulePolicy::Skip,
            max_batches: 8,
        }
    }
}
