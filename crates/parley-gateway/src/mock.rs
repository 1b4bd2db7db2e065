// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline reply synthesis for mock mode.

/// Deterministic reply to a user message. Pure; performs no I/O.
pub fn mock_reply(user_text: &str) -> String {
    let text = user_text.trim();
    if text.is_empty() {
        return "[mock] Received an empty message.".to_string();
    }
    let words = text.split_whitespace().count();
    format!("[mock] You said: \"{text}\" ({words} word{})", if words == 1 { "" } else { "s" })
}
