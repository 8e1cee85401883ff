//! Search tag matching for discovered resources

use regex::Regex;

use crate::{Tag, TaggedResource};

/// A job constraint: the resource must carry `key` with a value matching `value`
#[derive(Debug, Clone)]
pub struct SearchTag {
    pub key: String,
    pub value: Regex,
}

impl SearchTag {
    pub fn is_satisfied_by(&self, tag: &Tag) -> bool {
        tag.key == self.key && self.value.is_match(&tag.value)
    }
}

/// True when every search tag is satisfied by at least one of `tags`.
///
/// An empty constraint set matches everything.
pub fn filter_through_tags(tags: &[Tag], search_tags: &[SearchTag]) -> bool {
    search_tags
        .iter()
        .all(|search_tag| tags.iter().any(|tag| search_tag.is_satisfied_by(tag)))
}

impl TaggedResource {
    pub fn filter_through_tags(&self, search_tags: &[SearchTag]) -> bool {
        filter_through_tags(&self.tags, search_tags)
    }
}
