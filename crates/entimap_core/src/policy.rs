//! Indexing policy resolution.

/// Resolved indexing of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPolicy {
    /// Whether the field's properties are indexed.
    pub indexed: bool,
    /// Whether the policy came from an explicit field tag (or opaque storage)
    /// rather than a class default.
    pub forced: bool,
}

/// Effective class default of each level of a hierarchy, root first.
///
/// A level's default is the nearest explicit class tag from that level up to
/// the root, or `seed` when there is none. A tag on a subtype therefore
/// never changes the default of fields its bases declare.
#[must_use]
pub fn class_defaults(tags: &[Option<bool>], seed: bool) -> Vec<bool> {
    let mut current = seed;
    tags.iter()
        .map(|tag| {
            if let Some(indexed) = tag {
                current = *indexed;
            }
            current
        })
        .collect()
}

/// Resolves a field's indexing from its own tag and its level's default.
///
/// Opaque (serialized) fields are never indexed.
#[must_use]
pub fn resolve(field_tag: Option<bool>, class_default: bool, serialized: bool) -> IndexPolicy {
    if serialized {
        return IndexPolicy {
            indexed: false,
            forced: true,
        };
    }
    match field_tag {
        Some(indexed) => IndexPolicy {
            indexed,
            forced: true,
        },
        None => IndexPolicy {
            indexed: class_default,
            forced: false,
        },
    }
}
