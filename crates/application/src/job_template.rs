use serde_json::{Map, Value, json};
use workcore_core::{AppError, AppResult};
use workcore_domain::{BaseJobTemplate, JobConfiguration, TemplateVariablesSchema};

use crate::ports::JobTemplateField;

/// Builds the default base job template for a worker type: a pure fold
/// over its static field declarations. Always includes the baseline
/// `command` and `env` variables; `required` lists every field with no
/// default.
///
/// Equal inputs yield equal outputs — no process state or reflection is
/// consulted.
#[must_use]
pub fn get_default_base_job_template(fields: &[JobTemplateField]) -> BaseJobTemplate {
    let mut properties = Map::new();
    let mut job_configuration = Map::new();
    let mut required = Vec::new();

    properties.insert(
        "command".to_owned(),
        json!({
            "type": "string",
            "title": "Command",
            "description": "The command to use when starting a flow run.",
            "default": Value::Null,
        }),
    );
    job_configuration.insert("command".to_owned(), json!("{{ command }}"));

    properties.insert(
        "env".to_owned(),
        json!({
            "type": "object",
            "title": "Environment Variables",
            "description": "Environment variables to set when starting a flow run.",
            "additionalProperties": {"type": "string"},
            "default": {},
        }),
    );
    job_configuration.insert("env".to_owned(), json!("{{ env }}"));

    for field in fields {
        let mut schema = Map::new();
        schema.insert("type".to_owned(), json!(field.json_type));
        schema.insert("title".to_owned(), json!(field.title));
        if let Some(description) = &field.description {
            schema.insert("description".to_owned(), json!(description));
        }
        if let Some(default) = &field.default {
            schema.insert("default".to_owned(), default.clone());
        } else {
            required.push(field.name.clone());
        }

        properties.insert(field.name.clone(), Value::Object(schema));
        job_configuration.insert(field.name.clone(), json!(field.template_expr));
    }

    BaseJobTemplate {
        job_configuration,
        variables: TemplateVariablesSchema { properties, required },
    }
}

/// Resolves a concrete [`JobConfiguration`] from a base job template and a
/// deployment's overrides map.
///
/// Each value in `template.job_configuration` that is a bare `{{ name }}`
/// placeholder is replaced by the effective value of `name` (override, else
/// schema default, else `null`); other values pass through unchanged.
/// Idempotent: re-resolving with the same `template`/`overrides` yields an
/// identical result.
pub fn from_template_and_overrides(
    template: &BaseJobTemplate,
    overrides: &Map<String, Value>,
) -> AppResult<JobConfiguration> {
    let mut resolved = Map::new();
    for (key, value) in &template.job_configuration {
        let resolved_value = match value.as_str().and_then(placeholder_name) {
            Some(name) => template
                .variables
                .effective_value(name, overrides)
                .unwrap_or(Value::Null),
            None => value.clone(),
        };
        resolved.insert(key.clone(), resolved_value);
    }

    let command = match resolved.remove("command") {
        Some(Value::String(command)) if !command.is_empty() => Some(command),
        _ => None,
    };

    let env = match resolved.remove("env") {
        Some(Value::Object(entries)) => entries
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(value) => Ok((key, value)),
                other => Err(AppError::JobConfiguration(format!(
                    "env value for '{key}' must be a string, got {other}"
                ))),
            })
            .collect::<AppResult<_>>()?,
        Some(_) => {
            return Err(AppError::JobConfiguration(
                "env must resolve to an object of string values".to_owned(),
            ));
        }
        None => Default::default(),
    };

    Ok(JobConfiguration {
        command,
        env,
        extra: resolved,
    }
    .with_normalized_command())
}

fn placeholder_name(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let inner = trimmed.strip_prefix("{{")?.strip_suffix("}}")?;
    Some(inner.trim())
}

#[cfg(test)]
mod tests {
    use super::{from_template_and_overrides, get_default_base_job_template};
    use crate::ports::JobTemplateField;
    use serde_json::{Map, json};

    fn image_field() -> JobTemplateField {
        JobTemplateField {
            name: "image".to_owned(),
            json_type: "string",
            title: "Image".to_owned(),
            description: Some("Container image to run.".to_owned()),
            default: None,
            template_expr: "{{ image }}".to_owned(),
        }
    }

    #[test]
    fn default_template_always_declares_command_and_env() {
        let template = get_default_base_job_template(&[]);
        assert!(template.variables.properties.contains_key("command"));
        assert!(template.variables.properties.contains_key("env"));
        assert!(template.variables.required.is_empty());
    }

    #[test]
    fn fields_without_defaults_are_required() {
        let template = get_default_base_job_template(&[image_field()]);
        assert!(template.variables.required.contains(&"image".to_owned()));
        assert!(template.job_configuration.contains_key("image"));
    }

    #[test]
    fn is_a_pure_function_of_its_input() {
        let fields = vec![image_field()];
        assert_eq!(
            get_default_base_job_template(&fields),
            get_default_base_job_template(&fields)
        );
    }

    #[test]
    fn resolves_overrides_over_defaults() {
        let template = get_default_base_job_template(&[image_field()]);
        let mut overrides = Map::new();
        overrides.insert("image".to_owned(), json!("my-image:latest"));
        overrides.insert("command".to_owned(), json!("python flow.py"));

        let configuration = from_template_and_overrides(&template, &overrides).unwrap_or_else(|_| unreachable!());
        assert_eq!(configuration.command.as_deref(), Some("python flow.py"));
        assert_eq!(
            configuration.extra.get("image"),
            Some(&json!("my-image:latest"))
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let template = get_default_base_job_template(&[image_field()]);
        let mut overrides = Map::new();
        overrides.insert("image".to_owned(), json!("my-image:latest"));

        let first = from_template_and_overrides(&template, &overrides).unwrap_or_else(|_| unreachable!());
        let second = from_template_and_overrides(&template, &overrides).unwrap_or_else(|_| unreachable!());
        assert_eq!(first, second);
    }

    #[test]
    fn missing_command_resolves_to_none() {
        let template = get_default_base_job_template(&[]);
        let configuration = from_template_and_overrides(&template, &Map::new()).unwrap_or_else(|_| unreachable!());
        assert_eq!(configuration.command, None);
        assert!(configuration.env.is_empty());
    }

    #[test]
    fn non_string_env_value_is_a_job_configuration_error() {
        let template = get_default_base_job_template(&[]);
        let mut overrides = Map::new();
        overrides.insert("env".to_owned(), json!({"KEY": 1}));

        let result = from_template_and_overrides(&template, &overrides);
        assert!(result.is_err());
    }
}
