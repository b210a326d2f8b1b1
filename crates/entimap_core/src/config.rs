//! Mapper configuration.

/// How the store kind of an entity is derived when its schema does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindNaming {
    /// The Rust type name with every module path dropped (`Employee`,
    /// `Holder<Employee>`). Generic arguments stay, so each instantiation
    /// of a generic type gets its own kind.
    #[default]
    ShortName,
    /// Full Rust type path (`app::model::Employee`).
    FullPath,
}

impl KindNaming {
    /// Derives a kind from a Rust type name as returned by `std::any::type_name`.
    #[must_use]
    pub fn kind_for(self, type_name: &str) -> String {
        match self {
            KindNaming::FullPath => type_name.to_string(),
            KindNaming::ShortName => strip_paths(type_name),
        }
    }
}

fn strip_paths(type_name: &str) -> String {
    let mut short = String::with_capacity(type_name.len());
    let mut start = 0;
    for (at, c) in type_name.char_indices() {
        if matches!(c, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' | '*') {
            short.push_str(last_segment(&type_name[start..at]));
            short.push(c);
            start = at + c.len_utf8();
        }
    }
    short.push_str(last_segment(&type_name[start..]));
    short
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Configuration of a [`crate::Registry`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Indexing policy of fields when neither the field nor any class in its
    /// hierarchy declares one.
    pub default_indexed: bool,

    /// How kinds are named for types that do not declare one.
    pub kind_naming: KindNaming,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_indexed: true,
            kind_naming: KindNaming::ShortName,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the global default indexing policy.
    #[must_use]
    pub const fn default_indexed(mut self, value: bool) -> Self {
        self.default_indexed = value;
        self
    }

    /// Sets the kind naming policy.
    #[must_use]
    pub const fn kind_naming(mut self, value: KindNaming) -> Self {
        self.kind_naming = value;
        self
    }
}
