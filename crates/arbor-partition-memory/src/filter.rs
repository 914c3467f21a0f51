//! Filter Evaluation
//!
//! Evaluates a search filter expression tree against an entry using
//! directory-string (case-insensitive) matching. Ordering comparisons are
//! lexicographic over the lowercased text form, which is what a
//! map-backed partition can honestly offer without matching-rule support.

use arbor_core::{AttributeValue, Entry};
use arbor_pipeline::FilterNode;

/// Whether `entry` matches `filter`.
#[must_use]
pub fn matches(filter: &FilterNode, entry: &Entry) -> bool {
    match filter {
        FilterNode::Equality { attribute, value } => entry
            .get(attribute)
            .is_some_and(|a| a.contains(&AttributeValue::from(value.as_str()))),

        FilterNode::Present { attribute } => entry.has_attribute(attribute),

        FilterNode::Substring {
            attribute,
            initial,
            any,
            final_,
        } => entry.get(attribute).is_some_and(|a| {
            a.values()
                .iter()
                .filter_map(AttributeValue::as_text)
                .any(|text| substring_matches(text, initial.as_deref(), any, final_.as_deref()))
        }),

        FilterNode::GreaterOrEqual { attribute, value } => {
            ordered_any(entry, attribute, |text| text >= value.to_lowercase())
        }

        FilterNode::LessOrEqual { attribute, value } => {
            ordered_any(entry, attribute, |text| text <= value.to_lowercase())
        }

        FilterNode::And { filters } => filters.iter().all(|f| matches(f, entry)),

        FilterNode::Or { filters } => filters.iter().any(|f| matches(f, entry)),

        FilterNode::Not { filter } => !matches(filter, entry),
    }
}

fn ordered_any(entry: &Entry, attribute: &str, predicate: impl Fn(String) -> bool) -> bool {
    entry.get(attribute).is_some_and(|a| {
        a.values()
            .iter()
            .filter_map(AttributeValue::as_text)
            .any(|text| predicate(text.to_lowercase()))
    })
}

fn substring_matches(
    text: &str,
    initial: Option<&str>,
    any: &[String],
    final_: Option<&str>,
) -> bool {
    let text = text.to_lowercase();
    let mut position = 0;

    if let Some(initial) = initial {
        let initial = initial.to_lowercase();
        if !text.starts_with(&initial) {
            return false;
        }
        position = initial.len();
    }

    for fragment in any {
        let fragment = fragment.to_lowercase();
        match text[position..].find(&fragment) {
            Some(found) => position += found + fragment.len(),
            None => return false,
        }
    }

    if let Some(final_) = final_ {
        let final_ = final_.to_lowercase();
        return text.len() >= position + final_.len() && text.ends_with(&final_);
    }
    true
}
