//! Immutable settings for a single import run

use super::Config;
use crate::import::{ColumnMode, DefaultEntry, MappingEntry, DEFAULT_DATE_FORMAT};

/// Everything an import run needs besides the schema, store and rows
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Qualified model rows are imported into
    pub model: String,
    /// Parsed mapping; empty means "derive from the header row"
    pub mappings: Vec<MappingEntry>,
    /// Values applied before each row's own cells
    pub defaults: Vec<DefaultEntry>,
    /// How mapping keys refer to columns
    pub column_mode: ColumnMode,
    /// Whether the first row is a header in positional mode
    pub has_header: bool,
    /// Look up existing records before creating new ones
    pub deduplicate: bool,
    /// chrono format for date cells
    pub date_format: String,
    /// Source file, recorded in the audit record
    pub file_name: String,
    /// Identity recorded in the audit record
    pub import_user: String,
    /// Trigger recorded in the audit record
    pub upload_method: String,
}

impl RunConfig {
    /// Create a new builder for RunConfig
    pub fn builder(model: impl Into<String>) -> RunConfigBuilder {
        RunConfigBuilder::new(model)
    }
}

/// Builder for [`RunConfig`]
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Start from built-in defaults
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            config: RunConfig {
                model: model.into(),
                mappings: Vec::new(),
                defaults: Vec::new(),
                column_mode: ColumnMode::Positional,
                has_header: true,
                deduplicate: true,
                date_format: DEFAULT_DATE_FORMAT.to_string(),
                file_name: String::new(),
                import_user: "cron".to_string(),
                upload_method: "cronjob".to_string(),
            },
        }
    }

    /// Take file-level settings from a loaded config
    pub fn from_config(mut self, config: &Config) -> Self {
        self.config.deduplicate = config.deduplicate;
        self.config.date_format = config.date_format.clone();
        self.config.import_user = config.import_user.clone();
        self.config.upload_method = config.upload_method.clone();
        self
    }

    pub fn mappings(mut self, mappings: Vec<MappingEntry>) -> Self {
        self.config.mappings = mappings;
        self
    }

    pub fn defaults(mut self, defaults: Vec<DefaultEntry>) -> Self {
        self.config.defaults = defaults;
        self
    }

    pub fn column_mode(mut self, mode: ColumnMode) -> Self {
        self.config.column_mode = mode;
        self
    }

    pub fn has_header(mut self, has_header: bool) -> Self {
        self.config.has_header = has_header;
        self
    }

    pub fn deduplicate(mut self, deduplicate: bool) -> Self {
        self.config.deduplicate = deduplicate;
        self
    }

    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.config.date_format = format.into();
        self
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.config.file_name = file_name.into();
        self
    }

    pub fn import_user(mut self, user: impl Into<String>) -> Self {
        self.config.import_user = user.into();
        self
    }

    pub fn upload_method(mut self, method: impl Into<String>) -> Self {
        self.config.upload_method = method.into();
        self
    }

    /// Freeze the settings
    pub fn build(self) -> RunConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::parse_mappings;

    #[test]
    fn test_builder_defaults() {
        let config = RunConfig::builder("shop.Item").build();
        assert_eq!(config.model, "shop.Item");
        assert!(config.mappings.is_empty());
        assert!(config.has_header);
        assert!(config.deduplicate);
        assert_eq!(config.column_mode, ColumnMode::Positional);
        assert_eq!(config.date_format, DEFAULT_DATE_FORMAT);
    }

    #[test]
    fn test_builder_overrides_file_settings() {
        let file = Config {
            deduplicate: false,
            import_user: "alice".into(),
            ..Config::default()
        };
        let config = RunConfig::builder("shop.Item")
            .from_config(&file)
            .mappings(parse_mappings("column1=name").unwrap())
            .deduplicate(true)
            .build();
        assert!(config.deduplicate);
        assert_eq!(config.import_user, "alice");
        assert_eq!(config.mappings.len(), 1);
    }
}
