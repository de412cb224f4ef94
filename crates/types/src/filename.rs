use crate::TypesError;

/// A filename that is safe to join onto an upload folder.
///
/// Construction strips any directory components, collapses whitespace into underscores and
/// drops every character outside `[A-Za-z0-9._-]`. Leading and trailing dots and underscores
/// are trimmed so the result can never be `.`, `..` or a hidden file. If nothing is left the
/// name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SafeFilename(String);

impl SafeFilename {
    /// Sanitises a client-supplied filename.
    ///
    /// ```
    /// use patchlist_types::SafeFilename;
    ///
    /// let name = SafeFilename::new("../../etc/my patch.bin").unwrap();
    /// assert_eq!(name.as_str(), "my_patch.bin");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, TypesError> {
        let raw = raw.as_ref();
        let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();

        let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
        let filtered: String = joined
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .collect();
        let trimmed = filtered.trim_matches(|c| c == '.' || c == '_');

        if trimmed.is_empty() {
            return Err(TypesError::InvalidFilename(raw.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased extension without the dot, if the name has one.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.0.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl std::fmt::Display for SafeFilename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafeFilename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
