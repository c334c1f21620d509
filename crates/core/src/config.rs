use crate::error::Result;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Explicit path to the recognition engine binary; `None` means search
    /// the PATH.
    pub engine_binary: Option<PathBuf>,
    /// Language hints overriding the persisted settings, from
    /// `TEXTSHOT_LANGS` (comma-separated).
    pub language_override: Option<Vec<String>>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let engine_binary = env::var("TEXTSHOT_TESSERACT").ok().map(PathBuf::from);

        let language_override = env::var("TEXTSHOT_LANGS").ok().map(|langs| {
            langs
                .split(',')
                .map(|lang| lang.trim().to_string())
                .filter(|lang| !lang.is_empty())
                .collect()
        });

        Ok(Self {
            engine_binary,
            language_override,
        })
    }
}
