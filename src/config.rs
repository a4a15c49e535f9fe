//! Configuration for the cohort engine
//!
//! Environment variable and CLI argument handling using clap.

use clap::Parser;

/// Cohort - identity, role, and relationship resolution engine
#[derive(Parser, Debug, Clone)]
#[command(name = "cohort")]
#[command(about = "Identity, role, and relationship resolution engine")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "cohort")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Length of auto-generated ID codes
    #[arg(long, env = "ID_CODE_LENGTH", default_value = "8")]
    pub id_code_length: usize,

    /// Path for the JSONL audit trail (disabled when unset)
    #[arg(long, env = "AUDIT_LOG_PATH")]
    pub audit_log_path: Option<String>,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.id_code_length < 4 {
            return Err("ID_CODE_LENGTH must be at least 4".to_string());
        }
        if self.id_code_length > 32 {
            return Err("ID_CODE_LENGTH must be at most 32".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let args = Args::parse_from(["cohort"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.id_code_length, 8);
        assert_eq!(args.mongodb_db, "cohort");
    }

    #[test]
    fn test_code_length_bounds() {
        let args = Args::parse_from(["cohort", "--id-code-length", "2"]);
        assert!(args.validate().is_err());

        let args = Args::parse_from(["cohort", "--id-code-length", "64"]);
        assert!(args.validate().is_err());
    }
}
