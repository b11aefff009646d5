use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Concrete configuration for one flow run, resolved from a
/// `BaseJobTemplate` and a deployment's overrides.
///
/// `command` and `env` are the baseline fields every worker type must
/// support; `extra` carries whatever additional fields a worker type's own
/// job configuration declares (e.g. a container image, a working directory).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobConfiguration {
    /// Command to run when starting the flow run. `None` when unset or the
    /// effective value normalized to the empty string.
    pub command: Option<String>,
    /// Environment variables to set when starting the flow run.
    pub env: BTreeMap<String, String>,
    /// Additional per-worker-type fields not modeled by the baseline.
    pub extra: Map<String, Value>,
}

impl JobConfiguration {
    /// Normalizes `command`: `null` and the empty string both collapse to
    /// `None`, matching the template resolver's falsey-normalization rule.
    #[must_use]
    pub fn with_normalized_command(mut self) -> Self {
        if self
            .command
            .as_deref()
            .is_none_or(|value| value.is_empty())
        {
            self.command = None;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::JobConfiguration;

    #[test]
    fn empty_command_normalizes_to_none() {
        let configuration = JobConfiguration {
            command: Some(String::new()),
            ..Default::default()
        }
        .with_normalized_command();

        assert_eq!(configuration.command, None);
    }

    #[test]
    fn non_empty_command_is_preserved() {
        let configuration = JobConfiguration {
            command: Some("run.sh".to_owned()),
            ..Default::default()
        }
        .with_normalized_command();

        assert_eq!(configuration.command.as_deref(), Some("run.sh"));
    }
}
