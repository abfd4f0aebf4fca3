use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pulse_models::TransportFormat;

use crate::error::ConfigError;
use crate::host;
use crate::parameters::{Parameter, ParameterResolver};

/// Name of the registry file inside the storage directory.
pub const APPLICATIONS_FILENAME: &str = "applications.properties";

const DEFAULT_DIRECTORY: &str = "pulse";
const DEFAULT_MONITORING_PATH: &str = "/monitoring";
const DEFAULT_RESOLUTION_SECONDS: i64 = 60;
const DEFAULT_FAILURE_THRESHOLD: i64 = 3;
const DEFAULT_NODE_TIMEOUT_SECONDS: i64 = 20;
const DEFAULT_WORKERS: i64 = 4;
const DEFAULT_NODE_FAN_OUT: i64 = 8;
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Certificate policy for HTTPS collection endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    Verify,
    /// Accept self-signed and otherwise invalid certificates.
    AcceptInvalidCertificates,
}

/// Validated collector configuration.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub storage_directory: PathBuf,
    pub monitoring_path: String,
    pub transport_format: TransportFormat,
    pub resolution: Duration,
    pub dns_lookups_disabled: bool,
    /// `None` shows every counter.
    pub displayed_counters: Option<Vec<String>>,
    pub log_enabled: bool,
    pub failure_threshold: u32,
    pub node_timeout: Duration,
    pub workers: usize,
    pub node_fan_out: usize,
    pub tls_policy: TlsPolicy,
    pub bind_address: SocketAddr,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            storage_directory: resolve_storage_directory(DEFAULT_DIRECTORY),
            monitoring_path: DEFAULT_MONITORING_PATH.to_string(),
            transport_format: TransportFormat::default(),
            resolution: Duration::from_secs(DEFAULT_RESOLUTION_SECONDS as u64),
            dns_lookups_disabled: false,
            displayed_counters: None,
            log_enabled: false,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD as u32,
            node_timeout: Duration::from_secs(DEFAULT_NODE_TIMEOUT_SECONDS as u64),
            workers: DEFAULT_WORKERS as usize,
            node_fan_out: DEFAULT_NODE_FAN_OUT as usize,
            tls_policy: TlsPolicy::Verify,
            bind_address: DEFAULT_BIND_ADDRESS
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080))),
        }
    }
}

impl CollectorSettings {
    pub fn from_resolver(resolver: &ParameterResolver) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let storage_directory = resolver
            .resolve(Parameter::StorageDirectory)
            .map(|dir| resolve_storage_directory(dir.trim()))
            .unwrap_or(defaults.storage_directory);

        let monitoring_path = match resolver.resolve(Parameter::MonitoringPath) {
            Some(path) => parse_monitoring_path(&path)?,
            None => defaults.monitoring_path,
        };

        let transport_format = match resolver.resolve(Parameter::TransportFormat) {
            Some(code) => code.parse::<TransportFormat>()?,
            None => defaults.transport_format,
        };

        let resolution_seconds =
            positive(resolver, Parameter::ResolutionSeconds, DEFAULT_RESOLUTION_SECONDS)?;
        let failure_threshold =
            positive(resolver, Parameter::FailureThreshold, DEFAULT_FAILURE_THRESHOLD)?;
        let node_timeout_seconds =
            positive(resolver, Parameter::NodeTimeoutSeconds, DEFAULT_NODE_TIMEOUT_SECONDS)?;
        let workers = positive(resolver, Parameter::Workers, DEFAULT_WORKERS)?;
        let node_fan_out = positive(resolver, Parameter::NodeFanOut, DEFAULT_NODE_FAN_OUT)?;

        let displayed_counters = resolver.resolve(Parameter::DisplayedCounters).map(|list| {
            list.split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        });

        let tls_policy = if boolean(resolver, Parameter::TlsVerify, true)? {
            TlsPolicy::Verify
        } else {
            TlsPolicy::AcceptInvalidCertificates
        };

        let bind_address = match resolver.resolve(Parameter::BindAddress) {
            Some(address) => address.trim().parse().map_err(|_| ConfigError::Invalid {
                parameter: Parameter::BindAddress.code(),
                message: format!("'{}' is not a socket address", address),
            })?,
            None => defaults.bind_address,
        };

        let settings = Self {
            storage_directory,
            monitoring_path,
            transport_format,
            resolution: Duration::from_secs(resolution_seconds as u64),
            dns_lookups_disabled: boolean(resolver, Parameter::DnsLookupsDisabled, false)?,
            displayed_counters,
            log_enabled: boolean(resolver, Parameter::Log, false)?,
            failure_threshold: u32::try_from(failure_threshold).unwrap_or(u32::MAX),
            node_timeout: Duration::from_secs(node_timeout_seconds as u64),
            workers: workers as usize,
            node_fan_out: node_fan_out as usize,
            tls_policy,
            bind_address,
        };

        tracing::debug!(?settings, "Collector settings resolved");
        Ok(settings)
    }

    pub fn registry_file(&self) -> PathBuf {
        self.storage_directory.join(APPLICATIONS_FILENAME)
    }

    pub fn host_name(&self) -> String {
        host::host_name(self.dns_lookups_disabled)
    }

    pub fn host_address(&self) -> String {
        host::host_address(self.dns_lookups_disabled)
    }
}

/// Absolute paths are kept, relative ones live under the system temp dir.
fn resolve_storage_directory(dir: &str) -> PathBuf {
    if !dir.is_empty() && Path::new(dir).is_absolute() {
        PathBuf::from(dir)
    } else {
        std::env::temp_dir().join(dir)
    }
}

fn parse_monitoring_path(raw: &str) -> Result<String, ConfigError> {
    let path = raw.trim();
    if path.is_empty() || path == "/" {
        return Err(ConfigError::Invalid {
            parameter: Parameter::MonitoringPath.code(),
            message: "monitoring path cannot be empty".to_string(),
        });
    }
    if path.contains(',') || path.contains('?') {
        return Err(ConfigError::Invalid {
            parameter: Parameter::MonitoringPath.code(),
            message: format!("'{}' contains a forbidden character", path),
        });
    }
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Ok(format!("/{}", path))
    }
}

fn positive(
    resolver: &ParameterResolver,
    parameter: Parameter,
    default: i64,
) -> Result<i64, ConfigError> {
    let Some(raw) = resolver.resolve(parameter) else {
        return Ok(default);
    };
    let value: i64 = raw.trim().parse().map_err(|_| ConfigError::InvalidInteger {
        parameter: parameter.code(),
        value: raw.clone(),
    })?;
    if value <= 0 {
        return Err(ConfigError::NonPositive {
            parameter: parameter.code(),
            value,
        });
    }
    Ok(value)
}

fn boolean(
    resolver: &ParameterResolver,
    parameter: Parameter,
    default: bool,
) -> Result<bool, ConfigError> {
    match resolver.resolve(parameter) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::InvalidBoolean {
                parameter: parameter.code(),
                value: raw,
            }),
        },
    }
}

/// A counter is hidden when an allow-list is configured and does not name
/// it (case-insensitive).
pub fn is_counter_hidden(displayed: Option<&[String]>, counter: &str) -> bool {
    match displayed {
        None => false,
        Some(displayed) => !displayed.iter().any(|name| name.eq_ignore_ascii_case(counter)),
    }
}
