//! Configuration values tagged with the layer they came from.

use std::{
    fmt::{self, Display},
    ops::Deref,
    path::{Path, PathBuf},
};

/// Where a configuration value was taken from, lowest precedence last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertySource {
    Cli,
    Env,
    File,
    Default,
}

impl Display for PropertySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PropertySource::Cli => "command line",
            PropertySource::Env => "environment",
            PropertySource::File => "config file",
            PropertySource::Default => "default",
        })
    }
}

/// A configuration value with its source and the text it was parsed from.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ParsedProperty<T> {
    /// Command line flag: (value, argument text)
    Cli(T, String),
    /// Environment variable: (value, variable text)
    Env(T, String),
    /// Config file entry: (value, file, toml text)
    File(T, PathBuf, String),
    Default(T),
}

impl<T> ParsedProperty<T> {
    pub fn value(&self) -> &T {
        let (ParsedProperty::Cli(value, _)
        | ParsedProperty::Env(value, _)
        | ParsedProperty::File(value, _, _)
        | ParsedProperty::Default(value)) = self;
        value
    }

    pub fn into_value(self) -> T {
        let (ParsedProperty::Cli(value, _)
        | ParsedProperty::Env(value, _)
        | ParsedProperty::File(value, _, _)
        | ParsedProperty::Default(value)) = self;
        value
    }

    pub fn source(&self) -> PropertySource {
        match self {
            ParsedProperty::Cli(..) => PropertySource::Cli,
            ParsedProperty::Env(..) => PropertySource::Env,
            ParsedProperty::File(..) => PropertySource::File,
            ParsedProperty::Default(_) => PropertySource::Default,
        }
    }

    /// The text the value was parsed from; defaults have none.
    pub fn original(&self) -> Option<&str> {
        match self {
            ParsedProperty::Cli(_, original)
            | ParsedProperty::Env(_, original)
            | ParsedProperty::File(_, _, original) => Some(original),
            ParsedProperty::Default(_) => None,
        }
    }

    /// The config file that set the value.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            ParsedProperty::File(_, path, _) => Some(path),
            _ => None,
        }
    }

    /// Human-readable origin for error messages, e.g. `config file /x/config.toml`.
    pub fn origin(&self) -> String {
        match self.file_path() {
            Some(path) => format!("{} {}", self.source(), path.display()),
            None => self.source().to_string(),
        }
    }
}

impl<T> Deref for ParsedProperty<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value()
    }
}

impl<T: Display> Display for ParsedProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value().fmt(f)
    }
}

impl<T> From<T> for ParsedProperty<T> {
    fn from(value: T) -> Self {
        ParsedProperty::Default(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// # ParsedProperty Value Access
    ///
    /// Tests reading the value of every variant.
    ///
    /// ## Test Scenario
    /// - Creates one property per source
    /// - Reads it through value(), Deref, Display and into_value()
    ///
    /// ## Expected Outcome
    /// - All accessors return the parsed value
    #[test]
    fn test_parsed_property_value_access() {
        let properties = [
            ParsedProperty::Cli(75u8, "--rename-threshold 75".to_string()),
            ParsedProperty::Env(75u8, "75".to_string()),
            ParsedProperty::File(75u8, PathBuf::from("config.toml"), "75".to_string()),
            ParsedProperty::Default(75u8),
        ];

        for property in properties {
            assert_eq!(*property.value(), 75);
            assert_eq!(*property + 1, 76);
            assert_eq!(property.to_string(), "75");
            assert_eq!(property.into_value(), 75);
        }
    }

    /// # ParsedProperty Source Tracking
    ///
    /// Tests that each variant reports its source and original text.
    ///
    /// ## Expected Outcome
    /// - Sources match the variants
    /// - Only file properties carry a path
    /// - Defaults have no original text
    #[test]
    fn test_parsed_property_source_tracking() {
        let cli = ParsedProperty::Cli(true, "--no-renames".to_string());
        let env = ParsedProperty::Env(true, "true".to_string());
        let file = ParsedProperty::File(
            true,
            PathBuf::from("/etc/pr-changes/config.toml"),
            "find_renames = true".to_string(),
        );
        let default: ParsedProperty<bool> = true.into();

        assert_eq!(cli.source(), PropertySource::Cli);
        assert_eq!(env.source(), PropertySource::Env);
        assert_eq!(file.source(), PropertySource::File);
        assert_eq!(default.source(), PropertySource::Default);

        assert_eq!(env.original(), Some("true"));
        assert_eq!(file.original(), Some("find_renames = true"));
        assert_eq!(default.original(), None);

        assert_eq!(
            file.file_path(),
            Some(Path::new("/etc/pr-changes/config.toml"))
        );
        assert_eq!(cli.file_path(), None);
    }

    /// # Origin Descriptions
    ///
    /// Tests the origin text used in configuration errors.
    #[test]
    fn test_origin() {
        let file = ParsedProperty::File(0u8, PathBuf::from("/tmp/c.toml"), "0".to_string());
        assert_eq!(file.origin(), "config file /tmp/c.toml");
        assert_eq!(
            ParsedProperty::Env(0u8, "0".to_string()).origin(),
            "environment"
        );
        assert_eq!(ParsedProperty::Default(0u8).origin(), "default");
    }
}
