//! Presentation-only transformations of stored reservation data
//!
//! A reservation that carries a comment is displayed with a trailing marker, e.g. `Standup *`.
//! The marker is never stored: it is derived from the comment every time an event is rendered.

/// Appended to the title of reservations that have a non-empty comment
pub const COMMENT_MARKER: &str = " *";

/// Returns the title to display for a reservation
pub fn decorate(base_title: &str, comment: &str) -> String {
    if comment.is_empty() {
        base_title.to_string()
    } else {
        format!("{}{}", base_title, COMMENT_MARKER)
    }
}

/// Recovers the base title from a displayed title.
///
/// The comment marker is removed only when `comment` is non-empty (this is the exact inverse of [`decorate`]).
/// A trailing ` (...)` suffix, that older clients used to append time ranges to titles, is removed as well.
pub fn undecorate<'a>(displayed: &'a str, comment: &str) -> &'a str {
    let title = if comment.is_empty() {
        displayed
    } else {
        displayed.strip_suffix(COMMENT_MARKER).unwrap_or(displayed)
    };
    strip_legacy_suffix(title)
}

fn strip_legacy_suffix(title: &str) -> &str {
    if title.ends_with(')') {
        if let Some(pos) = title.rfind(" (") {
            return &title[..pos];
        }
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoration_depends_on_the_comment_only() {
        let titles = ["", "Standup", " *", "Standup *", "a * b"];
        let comments = ["", "urgent", " *"];

        for title in titles.iter() {
            for comment in comments.iter() {
                let displayed = decorate(title, comment);
                if comment.is_empty() {
                    assert_eq!(&displayed, title);
                } else {
                    assert_eq!(displayed, format!("{} *", title));
                }
            }
        }
    }

    #[test]
    fn undecorate_reverses_decorate() {
        for title in ["Standup", "Standup *", "", "Review * notes"].iter() {
            assert_eq!(undecorate(&decorate(title, "urgent"), "urgent"), *title);
            assert_eq!(undecorate(&decorate(title, ""), ""), *title);
        }
    }

    #[test]
    fn legacy_suffix() {
        assert_eq!(undecorate("Standup (10:00 - 11:00)", ""), "Standup");
        assert_eq!(undecorate("Standup (10:00 - 11:00) *", "x"), "Standup");
        assert_eq!(undecorate("Standup (", ""), "Standup (");
    }
}
