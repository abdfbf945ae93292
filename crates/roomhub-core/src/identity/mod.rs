//! Value identity for editor collections.
//!
//! A photo field in a form holds a mix of files the user just picked and URLs
//! of files uploaded earlier. [`FileRepr`] puts both behind one enum and
//! [`StringySet`] de-duplicates them by a canonical string instead of by
//! object identity, so the same logical image never appears twice.

mod file_repr;
mod stringy_set;

pub use file_repr::{DraftFile, FileRepr, LocalFile, ReprError};
pub use stringy_set::StringySet;

/// Canonical string form used as the identity of a value inside a [`StringySet`].
pub trait CanonicalKey {
    fn canonical_key(&self) -> String;
}

impl CanonicalKey for String {
    fn canonical_key(&self) -> String {
        self.clone()
    }
}

impl CanonicalKey for FileRepr {
    fn canonical_key(&self) -> String {
        FileRepr::canonical_key(self)
    }
}
