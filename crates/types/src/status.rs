use crate::TypesError;
use std::str::FromStr;

/// Inclusion flag of a tracked file. Only `On` files appear in the patchlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum FileStatus {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl FileStatus {
    pub fn is_active(self) -> bool {
        matches!(self, FileStatus::On)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::On => "ON",
            FileStatus::Off => "OFF",
        }
    }
}

impl From<bool> for FileStatus {
    fn from(active: bool) -> Self {
        if active {
            FileStatus::On
        } else {
            FileStatus::Off
        }
    }
}

/// Accepts `ON`/`OFF` in any letter case.
impl FromStr for FileStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("on") {
            Ok(FileStatus::On)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(FileStatus::Off)
        } else {
            Err(TypesError::InvalidStatus(s.to_owned()))
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("ON".parse::<FileStatus>().unwrap(), FileStatus::On);
        assert_eq!("off".parse::<FileStatus>().unwrap(), FileStatus::Off);
        assert!(matches!(
            "maybe".parse::<FileStatus>(),
            Err(TypesError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_serde_uses_upper_case() {
        assert_eq!(serde_json::to_string(&FileStatus::On).unwrap(), "\"ON\"");
        let status: FileStatus = serde_json::from_str("\"OFF\"").unwrap();
        assert!(!status.is_active());
        assert!(serde_json::from_str::<FileStatus>("\"on\"").is_err());
    }
}
