use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::detect::CallDetector;
use super::prompts::{SYSTEM_PROMPT, TOOLS_SYSTEM_PROMPT};

/// Named dispatch presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Text-sentinel calls, review prefetch, one call per turn.
    #[default]
    ReviewPrefetch,
    /// Text-sentinel calls, chained until the model answers.
    Looping,
    /// Structured tool calls.
    Tools,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::ReviewPrefetch => "review_prefetch",
            Strategy::Looping => "looping",
            Strategy::Tools => "tools",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "review_prefetch" => Ok(Strategy::ReviewPrefetch),
            "looping" => Ok(Strategy::Looping),
            "tools" => Ok(Strategy::Tools),
            other => Err(format!(
                "unknown strategy `{other}` (expected review_prefetch, looping or tools)"
            )),
        }
    }
}

/// Settings for one [`Dispatcher`](super::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub detector: CallDetector,
    /// Ask the model whether reviews would help before answering.
    pub review_prefetch: bool,
    /// Repeat the system instruction at the end of every request.
    pub reanchor_system: bool,
    /// Upper bound on function dispatches in one turn.
    pub max_function_rounds: usize,
    /// Overrides the preset's system instruction.
    pub system_prompt: Option<String>,
}

impl DispatchConfig {
    pub fn review_prefetch() -> Self {
        Self {
            detector: CallDetector::TextSentinel,
            review_prefetch: true,
            reanchor_system: true,
            max_function_rounds: 1,
            system_prompt: None,
        }
    }

    pub fn looping() -> Self {
        Self {
            detector: CallDetector::TextSentinel,
            review_prefetch: false,
            reanchor_system: true,
            max_function_rounds: 5,
            system_prompt: None,
        }
    }

    pub fn tools() -> Self {
        Self {
            detector: CallDetector::StructuredTool,
            review_prefetch: false,
            reanchor_system: false,
            max_function_rounds: 1,
            system_prompt: None,
        }
    }

    pub fn from_strategy(strategy: Strategy) -> Self {
        match strategy {
            Strategy::ReviewPrefetch => Self::review_prefetch(),
            Strategy::Looping => Self::looping(),
            Strategy::Tools => Self::tools(),
        }
    }

    /// At least one dispatch per turn is always allowed.
    pub fn with_max_function_rounds(mut self, rounds: usize) -> Self {
        self.max_function_rounds = rounds.max(1);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn system_prompt(&self) -> &str {
        match (&self.system_prompt, self.detector) {
            (Some(prompt), _) => prompt,
            (None, CallDetector::TextSentinel) => SYSTEM_PROMPT,
            (None, CallDetector::StructuredTool) => TOOLS_SYSTEM_PROMPT,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::review_prefetch()
    }
}
