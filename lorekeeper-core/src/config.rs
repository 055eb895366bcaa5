use clap::Parser;
use std::path::PathBuf;

/// Default directory names excluded from library scanning. The scanner
/// itself is an external collaborator (§1); this list is the core's input
/// contract with it.
pub const DEFAULT_SCANNER_EXCLUSIONS: &[&str] =
    &["Various Artists", "Various", "VA", "Soundtrack", "OST"];

/// Startup configuration consumed by the core. Never parses YAML itself
/// (that's an external collaborator's job) — `clap` here only covers the
/// demo binary's own env/flag surface, mirroring the teacher's `Cli` in
/// `main.rs`.
#[derive(Parser, Debug, Clone)]
#[command(name = "lorekeeperd")]
pub struct CoreConfig {
    /// Root of the music library this process curates.
    #[arg(long, env = "LK_MUSIC_PATH", default_value = ".")]
    pub music_path: PathBuf,

    /// Comma-separated directory names to skip during scanning.
    #[arg(long, env = "LK_SCANNER_EXCLUSIONS", value_delimiter = ',')]
    pub scanner_exclusions: Vec<String>,

    #[arg(long, env = "LK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LK_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Whether an encryption key for the settings store has been provisioned.
    /// The key bytes themselves are an external collaborator's concern (§1).
    #[arg(long, env = "LK_ENCRYPTION_KEY_SET", default_value_t = false)]
    pub encryption_key_set: bool,

    #[arg(long, env = "LK_DISCOGS_TOKEN")]
    pub discogs_token: Option<String>,

    #[arg(long, env = "LK_LASTFM_KEY")]
    pub lastfm_key: Option<String>,

    #[arg(long, env = "LK_AUDIODB_KEY")]
    pub audiodb_key: Option<String>,

    #[arg(long, env = "LK_FANARTTV_KEY")]
    pub fanarttv_key: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            music_path: PathBuf::from("."),
            scanner_exclusions: DEFAULT_SCANNER_EXCLUSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            encryption_key_set: false,
            discogs_token: None,
            lastfm_key: None,
            audiodb_key: None,
            fanarttv_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_exclusions_match_documented_defaults() {
        let config = CoreConfig::default();
        assert_eq!(
            config.scanner_exclusions,
            vec!["Various Artists", "Various", "VA", "Soundtrack", "OST"]
        );
    }
}
