//! Identifier management using string interning for efficient storage and comparison
//!
//! Every diagram object is named by its qualified path (`network.cell.tower`).
//! The [`Id`] type interns those paths so they can be copied freely and used
//! as hash keys when joining the diagram with the layout engine's graph.

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Separator between the segments of a qualified path.
pub const PATH_SEPARATOR: char = '.';

/// Global string interner for identifier storage.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> std::sync::MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Interned identifier for a diagram object or edge.
///
/// # Examples
///
/// ```
/// use trellis_core::identifier::Id;
///
/// let network = Id::new("network");
/// let tower = network.create_nested("tower");
/// assert_eq!(tower, "network.tower");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from a string slice.
    pub fn new(name: &str) -> Self {
        Self(interner().get_or_intern(name))
    }

    /// Creates a nested ID by joining this ID and `child` with [`PATH_SEPARATOR`].
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_core::identifier::Id;
    ///
    /// let nested = Id::new("user").create_nested("profile");
    /// assert_eq!(nested, "user.profile");
    /// ```
    pub fn create_nested(&self, child: &str) -> Self {
        let mut interner = interner();
        let parent = interner.resolve(self.0).unwrap_or_default().to_owned();
        let nested = format!("{parent}{PATH_SEPARATOR}{child}");
        Self(interner.get_or_intern(nested))
    }

    /// Returns the interned string as an owned value.
    pub fn as_string(&self) -> String {
        interner().resolve(self.0).unwrap_or_default().to_owned()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    /// Allows direct comparison with string slices: `id == "string"`
    fn eq(&self, other: &str) -> bool {
        interner().resolve(self.0) == Some(other)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}
