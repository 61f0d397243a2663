// src/utils/html.rs

/// Clean free text before it is stored, using the ammonia library.
///
/// Whitelist-based: safe inline markup (like <b>, <p>) survives, while
/// <script>, <iframe> and event-handler attributes are stripped. Essays are
/// shown back to reviewers, so nothing executable may reach the store.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
