// SPDX-License-Identifier: MIT
// Copyright (c) 2026 iteratr contributors

//! `{{name}}` placeholder substitution for hook commands (spec.md §4.4).

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([a-zA-Z_][a-zA-Z0-9_]*)\}\}").expect("valid regex"));

/// Substitute `{{name}}` placeholders from `vars`. Unknown names are left
/// as-is, the same "leave unknowns alone" policy itr-core's fold uses for
/// unrecognized event actions.
pub fn interpolate(template: &str, vars: &HashMap<String, String>) -> String {
    VAR_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            vars.get(name).cloned().unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
}
