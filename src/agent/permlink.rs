//! Permlink derivation for new posts.
//!
//! Two strategies exist: a human-readable slug of the title, and a
//! timestamp. The slug is the default; it collides when two posts share a
//! title, and the remote node rejects the duplicate at broadcast time.
//! Updates never derive anything; they use the caller-supplied permlink.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// How a permlink is derived from a create request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermlinkStrategy {
    /// Lowercased title with non-alphanumeric runs collapsed to `-`.
    #[default]
    Slug,
    /// Current UTC time with all non-digit characters stripped.
    Timestamp,
}

/// Derive a permlink for a new post.
///
/// A slug that comes out empty (no ASCII alphanumerics in the title) falls
/// back to the timestamp strategy so a create call never fails on a
/// derivable title.
pub fn derive(title: &str, strategy: PermlinkStrategy) -> String {
    match strategy {
        PermlinkStrategy::Timestamp => timestamp_permlink(),
        PermlinkStrategy::Slug => {
            let slug = slugify(title);
            if slug.is_empty() {
                timestamp_permlink()
            } else {
                slug
            }
        }
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn timestamp_permlink() -> String {
    Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect()
}
