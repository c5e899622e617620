//! Data categories with their own key prefix and TTL preset.

use std::fmt;

use crate::config::CategoryTtls;

/// Kind of data being cached. Each category is a key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Price,
    Metadata,
    History,
    Static,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Price,
        Category::Metadata,
        Category::History,
        Category::Static,
    ];

    /// Key prefix used for entries of this category.
    pub fn prefix(self) -> &'static str {
        match self {
            Category::Price => "price",
            Category::Metadata => "metadata",
            Category::History => "history",
            Category::Static => "static",
        }
    }

    /// TTL preset for this category, in seconds.
    pub fn ttl(self, ttls: &CategoryTtls) -> u64 {
        match self {
            Category::Price => ttls.price,
            Category::Metadata => ttls.metadata,
            Category::History => ttls.history,
            Category::Static => ttls.static_data,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
