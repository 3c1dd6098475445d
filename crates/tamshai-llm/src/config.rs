use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::LlmError;
use crate::generator::SharedGenerator;
use crate::provider::claude::{ClaudeConfig, ClaudeGenerator};
use crate::provider::echo::EchoGenerator;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LlmProviderConfig {
    Echo {
        #[serde(default = "default_chunk_words")]
        chunk_words: usize,
    },
    Claude {
        /// Name of the environment variable holding the API key; the key
        /// itself never lives in a config file.
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        max_tokens: Option<u32>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_chunk_words() -> usize {
    4
}

fn default_api_key_env() -> String {
    "CLAUDE_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        LlmProviderConfig::Echo {
            chunk_words: default_chunk_words(),
        }
    }
}

pub fn build_generator(cfg: &LlmProviderConfig) -> Result<SharedGenerator, LlmError> {
    match cfg {
        LlmProviderConfig::Echo { chunk_words } => Ok(Arc::new(EchoGenerator::new(*chunk_words))),
        LlmProviderConfig::Claude {
            api_key_env,
            model,
            base_url,
            max_tokens,
            timeout_secs,
        } => {
            let api_key = std::env::var(api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    LlmError::config(&format!("environment variable {api_key_env} is not set"))
                })?;
            let mut config =
                ClaudeConfig::new(api_key)?.with_timeout(Duration::from_secs(*timeout_secs));
            if let Some(url) = base_url {
                config = config.with_base_url(url)?;
            }
            if let Some(model) = model {
                config = config.with_model(model.clone());
            }
            if let Some(max_tokens) = max_tokens {
                config = config.with_max_tokens(*max_tokens);
            }
            Ok(Arc::new(ClaudeGenerator::new(config)?))
        }
    }
}
