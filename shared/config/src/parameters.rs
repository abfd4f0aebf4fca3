//! Named configuration parameters and the sources they are resolved from.
//!
//! Precedence, highest first: process properties (`-Dpulse.name=value`
//! arguments), process environment, context attributes set by the embedding
//! process, init parameters (the `collector.properties` file).

use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;
use crate::properties;

/// Prefix of every parameter outside of init parameters.
pub const PARAMETER_PREFIX: &str = "pulse.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    StorageDirectory,
    MonitoringPath,
    TransportFormat,
    ResolutionSeconds,
    DnsLookupsDisabled,
    DisplayedCounters,
    Log,
    FailureThreshold,
    NodeTimeoutSeconds,
    Workers,
    NodeFanOut,
    TlsVerify,
    BindAddress,
}

impl Parameter {
    pub fn code(&self) -> &'static str {
        match self {
            Parameter::StorageDirectory => "storage-directory",
            Parameter::MonitoringPath => "monitoring-path",
            Parameter::TransportFormat => "transport-format",
            Parameter::ResolutionSeconds => "resolution-seconds",
            Parameter::DnsLookupsDisabled => "dns-lookups-disabled",
            Parameter::DisplayedCounters => "displayed-counters",
            Parameter::Log => "log",
            Parameter::FailureThreshold => "collector-failure-threshold",
            Parameter::NodeTimeoutSeconds => "collector-node-timeout-seconds",
            Parameter::Workers => "collector-workers",
            Parameter::NodeFanOut => "collector-node-fan-out",
            Parameter::TlsVerify => "collector-tls-verify",
            Parameter::BindAddress => "collector-bind-address",
        }
    }
}

/// Where a parameter value came from. Ordered by increasing precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    InitParameters,
    ContextAttributes,
    Environment,
    ProcessProperties,
}

pub trait ParameterSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Looks up a parameter by its bare code (`storage-directory`).
    fn lookup(&self, code: &str) -> Option<String>;
}

/// Explicit init parameters, keyed by bare code.
#[derive(Debug, Clone, Default)]
pub struct InitParameters {
    values: HashMap<String, String>,
}

impl InitParameters {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Reads a properties file. A missing file yields no parameters.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::new(properties::parse(&content).into_iter().collect())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl ParameterSource for InitParameters {
    fn kind(&self) -> SourceKind {
        SourceKind::InitParameters
    }

    fn lookup(&self, code: &str) -> Option<String> {
        self.values.get(code).cloned()
    }
}

/// Attributes set programmatically by whatever embeds the collector,
/// keyed by prefixed name (`pulse.storage-directory`).
#[derive(Debug, Clone, Default)]
pub struct ContextAttributes {
    values: HashMap<String, String>,
}

impl ContextAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl ParameterSource for ContextAttributes {
    fn kind(&self) -> SourceKind {
        SourceKind::ContextAttributes
    }

    fn lookup(&self, code: &str) -> Option<String> {
        self.values.get(&format!("{}{}", PARAMETER_PREFIX, code)).cloned()
    }
}

/// Process environment. Accepts `pulse.storage-directory` as well as the
/// shell-friendly `PULSE_STORAGE_DIRECTORY`.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSource {
    fixed: Option<HashMap<String, String>>,
}

impl EnvironmentSource {
    /// Reads the live process environment at lookup time.
    pub fn process() -> Self {
        Self { fixed: None }
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fixed: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        match &self.fixed {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }
}

impl ParameterSource for EnvironmentSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Environment
    }

    fn lookup(&self, code: &str) -> Option<String> {
        self.var(&format!("{}{}", PARAMETER_PREFIX, code))
            .or_else(|| self.var(&env_name(code)))
    }
}

/// Process-wide properties given on the command line as `-Dname=value`.
#[derive(Debug, Clone, Default)]
pub struct ProcessProperties {
    values: HashMap<String, String>,
}

impl ProcessProperties {
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = args
            .into_iter()
            .filter_map(|arg| {
                let define = arg.as_ref().strip_prefix("-D")?;
                let (name, value) = define.split_once('=').unwrap_or((define, "true"));
                Some((name.trim().to_string(), value.to_string()))
            })
            .collect();
        Self { values }
    }
}

impl ParameterSource for ProcessProperties {
    fn kind(&self) -> SourceKind {
        SourceKind::ProcessProperties
    }

    fn lookup(&self, code: &str) -> Option<String> {
        self.values.get(&format!("{}{}", PARAMETER_PREFIX, code)).cloned()
    }
}

/// `collector-node-fan-out` -> `PULSE_COLLECTOR_NODE_FAN_OUT`
fn env_name(code: &str) -> String {
    let mut name = PARAMETER_PREFIX.trim_end_matches('.').to_ascii_uppercase();
    name.push('_');
    name.push_str(&code.replace(['-', '.'], "_").to_ascii_uppercase());
    name
}

/// Resolves parameters against its sources, highest precedence first.
#[derive(Default)]
pub struct ParameterResolver {
    sources: Vec<Box<dyn ParameterSource>>,
}

impl ParameterResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard sources of a collector process: `.env` is loaded into the
    /// environment first, init parameters come from `init_file`.
    pub fn from_process<I, S>(init_file: &Path, args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        dotenv::dotenv().ok();
        Ok(Self::new()
            .with_source(InitParameters::from_file(init_file)?)
            .with_source(EnvironmentSource::process())
            .with_source(ProcessProperties::from_args(args)))
    }

    pub fn with_source(mut self, source: impl ParameterSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        // stable sort keeps insertion order between sources of the same kind
        self.sources.sort_by(|a, b| b.kind().cmp(&a.kind()));
        self
    }

    pub fn resolve(&self, parameter: Parameter) -> Option<String> {
        self.resolve_by_name(parameter.code())
    }

    pub fn resolve_by_name(&self, code: &str) -> Option<String> {
        self.resolve_with_source(code).map(|(value, _)| value)
    }

    pub fn resolve_with_source(&self, code: &str) -> Option<(String, SourceKind)> {
        self.sources
            .iter()
            .find_map(|source| source.lookup(code).map(|value| (value, source.kind())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init(pairs: &[(&str, &str)]) -> InitParameters {
        InitParameters::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_precedence_is_fixed_regardless_of_insertion_order() {
        let resolver = ParameterResolver::new()
            .with_source(ProcessProperties::from_args(["-Dpulse.monitoring-path=/props"]))
            .with_source(init(&[("monitoring-path", "/init"), ("log", "true")]))
            .with_source(EnvironmentSource::from_vars([("PULSE_MONITORING_PATH", "/env")]))
            .with_source(ContextAttributes::new().with("pulse.monitoring-path", "/ctx"));

        assert_eq!(
            resolver.resolve_with_source("monitoring-path"),
            Some(("/props".to_string(), SourceKind::ProcessProperties))
        );
        assert_eq!(resolver.resolve(Parameter::Log).as_deref(), Some("true"));
        assert_eq!(resolver.resolve(Parameter::StorageDirectory), None);
    }

    #[test]
    fn test_environment_beats_context_and_init() {
        let resolver = ParameterResolver::new()
            .with_source(init(&[("resolution-seconds", "10")]))
            .with_source(ContextAttributes::new().with("pulse.resolution-seconds", "20"))
            .with_source(EnvironmentSource::from_vars([("pulse.resolution-seconds", "30")]));
        assert_eq!(resolver.resolve(Parameter::ResolutionSeconds).as_deref(), Some("30"));
    }

    #[test]
    fn test_context_beats_init() {
        let resolver = ParameterResolver::new()
            .with_source(init(&[("transport-format", "xml")]))
            .with_source(ContextAttributes::new().with("pulse.transport-format", "json"));
        assert_eq!(resolver.resolve(Parameter::TransportFormat).as_deref(), Some("json"));
    }

    #[test]
    fn test_env_name_conversion() {
        assert_eq!(env_name("collector-node-fan-out"), "PULSE_COLLECTOR_NODE_FAN_OUT");
        assert_eq!(env_name("log"), "PULSE_LOG");
    }

    #[test]
    fn test_process_properties_ignore_other_arguments() {
        let props = ProcessProperties::from_args(["collector-service", "-Dpulse.log", "--verbose"]);
        assert_eq!(props.lookup("log").as_deref(), Some("true"));
        assert_eq!(props.values.len(), 1);
    }

    #[test]
    fn test_missing_init_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let params = InitParameters::from_file(&dir.path().join("absent.properties")).unwrap();
        assert_eq!(params.lookup("log"), None);
    }
}
