//! Provider table.
//!
//! Each hosted model is one [`Provider`] variant with a fixed
//! [`ProviderConfig`]; selection is an exact key lookup.

use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Wire protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    /// `POST {endpoint}/chat/completions`
    OpenAiCompatible,
    /// `POST {endpoint}/v1/messages`
    Anthropic,
    /// `POST {endpoint}/v1beta/models/{model}:generateContent`
    Gemini,
}

#[derive(Debug, Clone, Copy)]
pub struct ProviderConfig {
    pub key: &'static str,
    pub display_name: &'static str,
    pub endpoint: &'static str,
    pub model_id: &'static str,
    /// Environment variable holding the API key.
    pub credential_key: &'static str,
    pub api: ApiFlavor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    OpenAi,
    Claude,
    DeepSeek,
    Moonshot,
    Groq,
}

const GEMINI: ProviderConfig = ProviderConfig {
    key: "gemini",
    display_name: "Google Gemini 2.0",
    endpoint: "https://generativelanguage.googleapis.com",
    model_id: "gemini-2.0-flash",
    credential_key: "GEMINI_KEY",
    api: ApiFlavor::Gemini,
};

const OPENAI: ProviderConfig = ProviderConfig {
    key: "openai",
    display_name: "OpenAI GPT-4o",
    endpoint: "https://api.openai.com/v1",
    model_id: "gpt-4o",
    credential_key: "OPENAI_KEY",
    api: ApiFlavor::OpenAiCompatible,
};

const CLAUDE: ProviderConfig = ProviderConfig {
    key: "claude",
    display_name: "Claude 3.5 Sonnet",
    endpoint: "https://api.anthropic.com",
    model_id: "claude-3-opus-20240229",
    credential_key: "CLAUDE_KEY",
    api: ApiFlavor::Anthropic,
};

const DEEPSEEK: ProviderConfig = ProviderConfig {
    key: "deepseek",
    display_name: "DeepSeek V3",
    endpoint: "https://api.deepseek.com",
    model_id: "deepseek-chat",
    credential_key: "DEEPSEEK_KEY",
    api: ApiFlavor::OpenAiCompatible,
};

const MOONSHOT: ProviderConfig = ProviderConfig {
    key: "moonshot",
    display_name: "Moonshot (Kimi)",
    endpoint: "https://api.moonshot.cn/v1",
    model_id: "moonshot-v1-8k",
    credential_key: "MOONSHOT_KEY",
    api: ApiFlavor::OpenAiCompatible,
};

const GROQ: ProviderConfig = ProviderConfig {
    key: "groq",
    display_name: "Groq Llama 3",
    endpoint: "https://api.groq.com/openai/v1",
    model_id: "llama3-8b-8192",
    credential_key: "GROQ_KEY",
    api: ApiFlavor::OpenAiCompatible,
};

impl Provider {
    pub const ALL: [Provider; 6] = [
        Provider::Gemini,
        Provider::OpenAi,
        Provider::Claude,
        Provider::DeepSeek,
        Provider::Moonshot,
        Provider::Groq,
    ];

    pub fn config(self) -> &'static ProviderConfig {
        match self {
            Self::Gemini => &GEMINI,
            Self::OpenAi => &OPENAI,
            Self::Claude => &CLAUDE,
            Self::DeepSeek => &DEEPSEEK,
            Self::Moonshot => &MOONSHOT,
            Self::Groq => &GROQ,
        }
    }

    pub fn key(self) -> &'static str {
        self.config().key
    }

    pub fn display_name(self) -> &'static str {
        self.config().display_name
    }

    /// Exact lookup by table key (`"deepseek"`) or display name (`"DeepSeek V3"`).
    pub fn from_key(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.key() == value || p.display_name() == value)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known: Vec<&str> = Provider::ALL.iter().map(|p| p.key()).collect();
        write!(
            f,
            "unknown provider '{}' (expected one of: {})",
            self.0,
            known.join(", ")
        )
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

/// API keys per provider.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    keys: HashMap<Provider, String>,
}

impl ProviderCredentials {
    /// Read each provider's `credential_key` variable; empty values count as missing.
    pub fn from_env() -> Self {
        let keys = Provider::ALL
            .into_iter()
            .filter_map(|p| {
                env::var(p.config().credential_key)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
                    .map(|k| (p, k))
            })
            .collect();
        Self { keys }
    }

    #[must_use]
    pub fn with_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        self.keys.insert(provider, key.into());
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }
}

// Keys never show up in logs.
impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let configured: Vec<&str> = self.keys.keys().map(|p| p.key()).collect();
        f.debug_struct("ProviderCredentials")
            .field("configured", &configured)
            .finish()
    }
}
