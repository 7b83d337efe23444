//! Query builder configuration.

use dmlmodel_core::ContextToken;
use serde::{Deserialize, Serialize};

/// Configuration shared by every statement a [`Dml`](crate::Dml) dispatches.
///
/// Deserializes from partial documents; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmlConfig {
    /// Execution context used when a call does not set one.
    pub context: Option<ContextToken>,
    /// Emit every rendered statement at `debug` level.
    pub log_statements: bool,
    /// Include the input data when logging a failed statement.
    ///
    /// The data is rendered with `Debug` before dispatch and cut at 1 KiB.
    pub log_data_on_error: bool,
}

impl Default for DmlConfig {
    fn default() -> Self {
        Self {
            context: None,
            log_statements: true,
            log_data_on_error: true,
        }
    }
}

impl DmlConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default execution context.
    pub fn context(mut self, token: ContextToken) -> Self {
        self.context = Some(token);
        self
    }

    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Set whether failed statements log their input data. Disable when
    /// rows carry secrets.
    pub fn log_data_on_error(mut self, enabled: bool) -> Self {
        self.log_data_on_error = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DmlConfig::default();
        assert_eq!(config.context, None);
        assert!(config.log_statements);
        assert!(config.log_data_on_error);
    }

    #[test]
    fn test_builder_setters() {
        let config = DmlConfig::new()
            .context(ContextToken(4))
            .log_statements(false)
            .log_data_on_error(false);
        assert_eq!(config.context, Some(ContextToken(4)));
        assert!(!config.log_statements);
        assert!(!config.log_data_on_error);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: DmlConfig = serde_json::from_str(r#"{"context": 2}"#).unwrap();
        assert_eq!(config.context, Some(ContextToken(2)));
        assert!(config.log_statements);

        let empty: DmlConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, DmlConfig::default());
    }
}
