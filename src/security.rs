use regex::Regex;
use thiserror::Error;

/// Policy errors, both at startup and per call
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid deny pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("command rejected by deny pattern '{0}'")]
    Denied(String),
}

/// Commands the server refuses to run.
///
/// An empty policy allows everything: `execute_bash` is unrestricted remote
/// shell access unless the operator passes `--deny-pattern`.
#[derive(Debug, Clone, Default)]
pub struct CommandPolicy {
    deny: Vec<Regex>,
}

impl CommandPolicy {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Compile deny patterns; any invalid regex fails the whole policy
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PolicyError> {
        let deny = patterns
            .iter()
            .map(|p| {
                let pattern = p.as_ref();
                Regex::new(pattern).map_err(|source| PolicyError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { deny })
    }

    pub fn is_unrestricted(&self) -> bool {
        self.deny.is_empty()
    }

    /// Reject the command if any deny pattern matches anywhere in it
    pub fn check(&self, command: &str) -> Result<(), PolicyError> {
        match self.deny.iter().find(|re| re.is_match(command)) {
            Some(re) => Err(PolicyError::Denied(re.as_str().to_string())),
            None => Ok(()),
        }
    }
}
