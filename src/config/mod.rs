use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use directories::BaseDirs;

use crate::error::AgentError;

/// Models the agent may be pointed at. `--model` and `DEFAULT_MODEL` are
/// validated against this set at session start.
pub const SUPPORTED_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4-turbo",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-3.5-turbo",
];

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        // Read .dsagentrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().flatten() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    /// Reject malformed values once, before any component consumes them.
    pub fn validate(&self) -> Result<(), AgentError> {
        for key in ["REQUEST_TIMEOUT", "EXECUTION_TIMEOUT"] {
            let v = self.get(key).unwrap_or_default();
            if v.parse::<u64>().is_err() {
                return Err(AgentError::Config(format!(
                    "{key} must be a number of seconds, got '{v}'"
                )));
            }
        }
        let iters = self.get("DEFAULT_MAX_ITERATIONS").unwrap_or_default();
        match iters.parse::<usize>() {
            Ok(n) if n >= 1 => {}
            _ => {
                return Err(AgentError::Config(format!(
                    "DEFAULT_MAX_ITERATIONS must be a positive integer, got '{iters}'"
                )))
            }
        }
        let model = self.get("DEFAULT_MODEL").unwrap_or_default();
        if !SUPPORTED_MODELS.contains(&model.as_str()) {
            return Err(AgentError::Config(format!(
                "DEFAULT_MODEL '{}' is not one of: {}",
                model,
                SUPPORTED_MODELS.join(", ")
            )));
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if let Ok(v) = env::var(key) {
            return Some(v);
        }
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn plots_path(&self) -> PathBuf {
        PathBuf::from(self.get("PLOTS_PATH").unwrap())
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(self.get("DATA_PATH").unwrap())
    }
}

fn is_config_key(k: &str) -> bool {
    // Accept known keys or DSAGENT_*/OPENAI_* for forward-compat
    const KEYS: &[&str] = &[
        "OPENAI_API_KEY",
        "API_BASE_URL",
        "REQUEST_TIMEOUT",
        "DEFAULT_MODEL",
        "DEFAULT_MAX_ITERATIONS",
        "DEFAULT_HARDWARE",
        "PLOTS_PATH",
        "DATA_PATH",
        "PYTHON_BIN",
        "EXECUTION_TIMEOUT",
        "PRETTIFY_MARKDOWN",
    ];

    KEYS.contains(&k) || k.starts_with("DSAGENT_") || k.starts_with("OPENAI_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("dsagent").join(".dsagentrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Paths
    m.insert("PLOTS_PATH".into(), "eda_plots".into());
    m.insert("DATA_PATH".into(), "data".into());

    // Numbers
    m.insert("REQUEST_TIMEOUT".into(), "60".into());
    m.insert("EXECUTION_TIMEOUT".into(), "120".into());
    m.insert("DEFAULT_MAX_ITERATIONS".into(), "5".into());

    // Strings
    m.insert("DEFAULT_MODEL".into(), "gpt-4o".into());
    m.insert("API_BASE_URL".into(), "default".into());
    m.insert("PYTHON_BIN".into(), "python3".into());
    m.insert(
        "DEFAULT_HARDWARE".into(),
        "CPU: 8 cores, 16 GB RAM, no GPU".into(),
    );

    // Bools as strings
    m.insert("PRETTIFY_MARKDOWN".into(), "true".into());

    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let cfg = Config { inner: default_map(), config_path: PathBuf::from("/dev/null") };
        cfg.validate().expect("built-in defaults must validate");
    }

    #[test]
    fn bad_iteration_count_is_rejected() {
        let mut m = default_map();
        m.insert("DEFAULT_MAX_ITERATIONS".into(), "0".into());
        let cfg = Config { inner: m, config_path: PathBuf::from("/dev/null") };
        assert!(matches!(cfg.validate(), Err(AgentError::Config(_))));
    }

    #[test]
    fn unknown_model_is_rejected() {
        let mut m = default_map();
        m.insert("DEFAULT_MODEL".into(), "gpt-unknown".into());
        let cfg = Config { inner: m, config_path: PathBuf::from("/dev/null") };
        assert!(matches!(cfg.validate(), Err(AgentError::Config(_))));
    }
}
