use std::collections::HashMap;

use daybrief_core::config::constants;
use daybrief_core::Operation;
use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
    #[error("invalid parameters for `{operation}`: field `{field}` {reason}")]
    Validation { operation: String, field: String, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    StringList,
}

impl ParamKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::StringList => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
        }
    }

    fn expectation(self) -> &'static str {
        match self {
            Self::String => "must be a string",
            Self::Integer => "must be an integer",
            Self::Number => "must be a number",
            Self::Boolean => "must be a boolean",
            Self::StringList => "must be a list of strings",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub allowed: Option<&'static [&'static str]>,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind, required: true, allowed: None }
    }

    pub fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind, required: false, allowed: None }
    }

    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

/// Binding of an operation name to a gateway endpoint plus the parameter
/// schema validated before dispatch.
#[derive(Clone, Debug)]
pub struct ToolBinding {
    endpoint: String,
    params: Vec<ParamSpec>,
}

impl ToolBinding {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), params: Vec::new() }
    }

    pub fn with_param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Validate an operation's parameters against this binding's schema.
    ///
    /// A failure here never aborts sibling operations: the dispatcher
    /// converts it into a `Failed` result for this operation alone.
    pub fn validate(&self, operation: &Operation) -> Result<(), RegistryError> {
        for spec in &self.params {
            match operation.parameters.get(spec.name) {
                None if spec.required => {
                    return Err(validation(operation, spec.name, "is required but missing"));
                }
                None => {}
                Some(value) => {
                    if !spec.kind.matches(value) {
                        return Err(validation(operation, spec.name, spec.kind.expectation()));
                    }
                    if let (Some(allowed), Some(text)) = (spec.allowed, value.as_str()) {
                        if !allowed.contains(&text) {
                            return Err(validation(
                                operation,
                                spec.name,
                                &format!("must be one of {}", allowed.join("|")),
                            ));
                        }
                    }
                }
            }
        }

        for key in operation.parameters.keys() {
            if !self.params.iter().any(|spec| spec.name == key) {
                return Err(validation(operation, key, "is not a recognized parameter"));
            }
        }

        Ok(())
    }
}

fn validation(operation: &Operation, field: &str, reason: &str) -> RegistryError {
    RegistryError::Validation {
        operation: operation.name.clone(),
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Catalog of invocable operations, populated at startup.
///
/// A closed table from operation name to validated-call binding; no
/// runtime reflection, no dynamic registration from user input.
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    bindings: HashMap<String, ToolBinding>,
}

impl ToolRegistry {
    /// The full backend tool catalog.
    pub fn builtin() -> Self {
        let mut registry = Self::default();

        registry.register(
            "weather.get_daily",
            ToolBinding::new("/tools/weather.get_daily")
                .with_param(ParamSpec::required("location", ParamKind::String))
                .with_param(
                    ParamSpec::optional("when", ParamKind::String)
                        .one_of(constants::WEATHER_TIMES),
                ),
        );

        registry.register(
            "calendar.list_events",
            ToolBinding::new("/tools/calendar.list_events")
                .with_param(ParamSpec::required("date", ParamKind::String)),
        );

        registry.register(
            "calendar.list_events_range",
            ToolBinding::new("/tools/calendar.list_events_range")
                .with_param(ParamSpec::required("start_date", ParamKind::String))
                .with_param(ParamSpec::required("end_date", ParamKind::String))
                .with_param(ParamSpec::optional("calendar_name", ParamKind::String)),
        );

        registry.register(
            "calendar.create_event",
            ToolBinding::new("/tools/calendar.create_event")
                .with_param(ParamSpec::required("title", ParamKind::String))
                .with_param(ParamSpec::required("start_time", ParamKind::String))
                .with_param(ParamSpec::required("end_time", ParamKind::String))
                .with_param(ParamSpec::optional("description", ParamKind::String))
                .with_param(ParamSpec::optional("location", ParamKind::String))
                .with_param(ParamSpec::optional("attendees", ParamKind::StringList))
                .with_param(ParamSpec::optional("calendar_name", ParamKind::String))
                .with_param(ParamSpec::optional("all_day", ParamKind::Boolean)),
        );

        registry.register(
            "todo.list",
            ToolBinding::new("/tools/todo.list")
                .with_param(
                    ParamSpec::optional("bucket", ParamKind::String)
                        .one_of(constants::TODO_BUCKETS),
                )
                .with_param(ParamSpec::optional("include_completed", ParamKind::Boolean)),
        );

        registry.register(
            "mobility.get_commute",
            ToolBinding::new("/tools/mobility.get_commute")
                .with_param(ParamSpec::required("origin", ParamKind::String))
                .with_param(ParamSpec::required("destination", ParamKind::String))
                .with_param(
                    ParamSpec::optional("mode", ParamKind::String)
                        .one_of(constants::TRANSPORT_MODES),
                ),
        );

        registry.register(
            "mobility.get_commute_options",
            ToolBinding::new("/tools/mobility.get_commute_options")
                .with_param(
                    ParamSpec::required("direction", ParamKind::String)
                        .one_of(constants::COMMUTE_DIRECTIONS),
                )
                .with_param(ParamSpec::optional("departure_time", ParamKind::String))
                .with_param(ParamSpec::optional("include_driving", ParamKind::Boolean))
                .with_param(ParamSpec::optional("include_transit", ParamKind::Boolean)),
        );

        registry.register(
            "mobility.get_shuttle_schedule",
            ToolBinding::new("/tools/mobility.get_shuttle_schedule")
                .with_param(ParamSpec::required("origin", ParamKind::String))
                .with_param(ParamSpec::required("destination", ParamKind::String))
                .with_param(ParamSpec::optional("departure_time", ParamKind::String)),
        );

        registry.register(
            "financial.get_data",
            ToolBinding::new("/tools/financial.get_data")
                .with_param(ParamSpec::optional("symbols", ParamKind::StringList))
                .with_param(
                    ParamSpec::optional("data_type", ParamKind::String)
                        .one_of(constants::FINANCIAL_DATA_TYPES),
                ),
        );

        registry
    }

    pub fn register(&mut self, name: impl Into<String>, binding: ToolBinding) {
        self.bindings.insert(name.into(), binding);
    }

    pub fn resolve(&self, operation_name: &str) -> Result<&ToolBinding, RegistryError> {
        self.bindings
            .get(operation_name)
            .ok_or_else(|| RegistryError::UnknownOperation(operation_name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use daybrief_core::Operation;
    use serde_json::json;

    use super::{RegistryError, ToolRegistry};

    #[test]
    fn builtin_catalog_covers_the_backend_tools() {
        let registry = ToolRegistry::builtin();
        for name in [
            "weather.get_daily",
            "calendar.list_events",
            "calendar.list_events_range",
            "calendar.create_event",
            "todo.list",
            "mobility.get_commute",
            "mobility.get_commute_options",
            "mobility.get_shuttle_schedule",
            "financial.get_data",
        ] {
            assert!(registry.resolve(name).is_ok(), "missing builtin binding for {name}");
        }
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn unknown_operation_is_a_registry_miss() {
        let registry = ToolRegistry::builtin();
        let error = registry.resolve("weather.get_hourly").unwrap_err();
        assert_eq!(error, RegistryError::UnknownOperation("weather.get_hourly".to_string()));
    }

    #[test]
    fn valid_operation_passes_validation() {
        let registry = ToolRegistry::builtin();
        let operation = Operation::new("weather.get_daily")
            .with_parameter("location", json!("San Francisco"))
            .with_parameter("when", json!("tomorrow"));

        let binding = registry.resolve(&operation.name).unwrap();
        assert!(binding.validate(&operation).is_ok());
        assert_eq!(binding.endpoint(), "/tools/weather.get_daily");
    }

    #[test]
    fn missing_required_field_names_the_field() {
        let registry = ToolRegistry::builtin();
        let operation = Operation::new("mobility.get_commute").with_parameter("origin", json!("Home"));

        let binding = registry.resolve(&operation.name).unwrap();
        let error = binding.validate(&operation).unwrap_err();
        assert!(matches!(
            error,
            RegistryError::Validation { ref field, .. } if field == "destination"
        ));
    }

    #[test]
    fn wrong_type_and_disallowed_value_are_rejected() {
        let registry = ToolRegistry::builtin();
        let binding = registry.resolve("todo.list").unwrap();

        let wrong_type = Operation::new("todo.list").with_parameter("bucket", json!(3));
        let error = binding.validate(&wrong_type).unwrap_err();
        assert!(matches!(
            error,
            RegistryError::Validation { ref reason, .. } if reason == "must be a string"
        ));

        let disallowed = Operation::new("todo.list").with_parameter("bucket", json!("chores"));
        let error = binding.validate(&disallowed).unwrap_err();
        assert!(matches!(
            error,
            RegistryError::Validation { ref reason, .. } if reason.contains("work|home|errands|personal")
        ));
    }

    #[test]
    fn unrecognized_extra_parameter_is_rejected() {
        let registry = ToolRegistry::builtin();
        let binding = registry.resolve("calendar.list_events").unwrap();

        let operation = Operation::new("calendar.list_events")
            .with_parameter("date", json!("2025-06-02"))
            .with_parameter("verbose", json!(true));
        let error = binding.validate(&operation).unwrap_err();
        assert!(matches!(
            error,
            RegistryError::Validation { ref field, .. } if field == "verbose"
        ));
    }

    #[test]
    fn string_list_parameters_are_typed() {
        let registry = ToolRegistry::builtin();
        let binding = registry.resolve("financial.get_data").unwrap();

        let valid = Operation::new("financial.get_data")
            .with_parameter("symbols", json!(["MSFT", "BTC"]))
            .with_parameter("data_type", json!("mixed"));
        assert!(binding.validate(&valid).is_ok());

        let mixed_types =
            Operation::new("financial.get_data").with_parameter("symbols", json!(["MSFT", 42]));
        assert!(binding.validate(&mixed_types).is_err());
    }
}
