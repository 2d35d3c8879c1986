//! Markup stripping for the search projection of record text.
//!
//! Record text is authored as HTML by the visual editor. Full-text and
//! substring matching run against a plain-text projection so that tag names
//! and attributes never produce hits.

use html2text::render::TrivialDecorator;
use tracing::warn;

/// Wrap width handed to the renderer; wide enough that it never breaks words.
const RENDER_WIDTH: usize = 10_000;

/// Strip HTML markup from `text`, returning plain text.
///
/// The text is parsed as an HTML fragment and rendered without decorations:
/// `<script>`, `<style>` and comments vanish, attributes never reach the
/// output, named and numeric character references are decoded. Whitespace
/// runs (line breaks from block elements included) collapse to one space.
///
/// # Examples
///
/// ```
/// use newsdesk_core::markup::strip_markup;
///
/// assert_eq!(strip_markup("<p>Fish &amp; chips</p>"), "Fish & chips");
/// ```
pub fn strip_markup(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let rendered = match html2text::from_read_with_decorator(
        text.as_bytes(),
        RENDER_WIDTH,
        TrivialDecorator::new(),
    ) {
        Ok(rendered) => rendered,
        Err(e) => {
            warn!(
                subsystem = "markup",
                op = "strip_markup",
                error = %e,
                "HTML rendering failed, search text left empty"
            );
            return String::new();
        }
    };

    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}
