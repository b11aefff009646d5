use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use workcore_core::{AppError, AppResult, NonEmptyString, WorkPoolId};

/// Named, typed container of work queues that a worker joins.
///
/// Created by the first worker to join a pool (if permitted) or out of band;
/// the worker holds a cached snapshot refreshed on every sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPool {
    /// Stable identifier assigned by the backend.
    pub id: WorkPoolId,
    /// Unique, caller-supplied pool name.
    pub name: NonEmptyString,
    /// String tag selecting the worker implementation.
    pub pool_type: String,
    /// Template + variables schema resolved into per-run job configurations.
    pub base_job_template: BaseJobTemplate,
    /// Whether the pool is currently paused (no new flow runs accepted).
    pub is_paused: bool,
}

/// A template + variables schema pair from which a per-run `JobConfiguration`
/// is resolved.
///
/// Invariant: every `{{ variable }}` placeholder referenced in
/// `job_configuration` must correspond to a property in `variables` — the
/// worker does not enforce this itself (the backend may), matching
/// `spec.md`'s stated invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseJobTemplate {
    /// Mapping whose values may embed `{{ variable }}` placeholders.
    pub job_configuration: Map<String, Value>,
    /// JSON-Schema-shaped description of each placeholder.
    pub variables: TemplateVariablesSchema,
}

/// JSON-Schema object describing the placeholders of one job configuration
/// template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVariablesSchema {
    /// One schema entry per declared variable.
    pub properties: Map<String, Value>,
    /// Variable names with no default value.
    pub required: Vec<String>,
}

impl TemplateVariablesSchema {
    /// Returns the effective value for one declared variable: the override
    /// if present, else the property's schema `default`, else `None`.
    #[must_use]
    pub fn effective_value(&self, name: &str, overrides: &Map<String, Value>) -> Option<Value> {
        if let Some(value) = overrides.get(name) {
            return Some(value.clone());
        }

        self.properties
            .get(name)
            .and_then(Value::as_object)
            .and_then(|property| property.get("default"))
            .cloned()
    }
}

impl WorkPool {
    /// Creates a validated work pool snapshot.
    pub fn new(
        id: WorkPoolId,
        name: impl Into<String>,
        pool_type: impl Into<String>,
        base_job_template: BaseJobTemplate,
        is_paused: bool,
    ) -> AppResult<Self> {
        let pool_type = pool_type.into();
        if pool_type.trim().is_empty() {
            return Err(AppError::Validation(
                "work pool type must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            pool_type,
            base_job_template,
            is_paused,
        })
    }
}
