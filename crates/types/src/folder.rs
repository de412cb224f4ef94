use crate::TypesError;
use std::str::FromStr;

/// One of the fixed upload folders.
///
/// Files in [`Folder::Main`] are listed in the patchlist by bare filename; every other folder
/// prefixes the filename with the folder name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    #[default]
    Main,
    Pack,
    Custom,
}

impl Folder {
    pub const ALL: [Folder; 3] = [Folder::Main, Folder::Pack, Folder::Custom];

    pub fn as_str(self) -> &'static str {
        match self {
            Folder::Main => "main",
            Folder::Pack => "pack",
            Folder::Custom => "custom",
        }
    }

    /// Path of `filename` as it appears in the patchlist.
    pub fn patch_path(self, filename: &str) -> String {
        match self {
            Folder::Main => filename.to_owned(),
            other => format!("{}/{}", other.as_str(), filename),
        }
    }
}

impl FromStr for Folder {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "main" => Ok(Folder::Main),
            "pack" => Ok(Folder::Pack),
            "custom" => Ok(Folder::Custom),
            other => Err(TypesError::InvalidFolder(other.to_owned())),
        }
    }
}

impl std::fmt::Display for Folder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}
