//! Built-in configuration defaults
//!
//! Defaults are TOML tables: a common table applies everywhere and a
//! per-platform table is merged over it. The user's file is merged over
//! the result.

use toml::Table;

use crate::error::ConfigError;

/// Target platform the defaults are chosen for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    /// Platform this binary was built for
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    fn overrides(self) -> Option<&'static str> {
        match self {
            Platform::Posix => None,
            Platform::Windows => Some(WINDOWS_DEFAULTS),
        }
    }
}

/// Defaults shared by every platform
pub const COMMON_DEFAULTS: &str = r#"
server_url = "http://127.0.0.1:9000/api/"
server_api_token = ""
node_id = "file:/etc/sidecar/node-id"
update_interval = 10
request_timeout = 10
tls_skip_verify = false
send_status = true
list_log_files = []
cache_path = "/var/cache/sidecar"
log_path = "/var/log/sidecar"
log_rotate_max_file_size = "10MiB"
log_rotate_keep_files = 10
collector_configuration_directory = "/var/lib/sidecar/generated"
collector_validation_timeout = 30
restart_on_configuration_change = false
collector_binaries_whitelist = [
    "/usr/bin/filebeat",
    "/usr/bin/packetbeat",
    "/usr/bin/metricbeat",
    "/usr/bin/heartbeat",
    "/usr/bin/auditbeat",
    "/usr/bin/journalbeat",
    "/usr/share/filebeat/bin/filebeat",
    "/usr/share/packetbeat/bin/packetbeat",
    "/usr/share/metricbeat/bin/metricbeat",
    "/usr/share/heartbeat/bin/heartbeat",
    "/usr/share/auditbeat/bin/auditbeat",
    "/usr/share/journalbeat/bin/journalbeat",
    "/usr/bin/nxlog",
    "/opt/nxlog/bin/nxlog",
]

[backoff]
initial = 1
max = 60
multiplier = 2.0
jitter = 0.25
"#;

/// Windows overrides, merged over [`COMMON_DEFAULTS`]
pub const WINDOWS_DEFAULTS: &str = r#"
node_id = 'file:C:\Program Files\Sidecar\node-id'
cache_path = 'C:\Program Files\Sidecar\cache'
log_path = 'C:\Program Files\Sidecar\logs'
collector_configuration_directory = 'C:\Program Files\Sidecar\generated'
collector_binaries_whitelist = [
    'C:\Program Files\Sidecar\filebeat.exe',
    'C:\Program Files\Sidecar\winlogbeat.exe',
    'C:\Program Files\Filebeat\filebeat.exe',
    'C:\Program Files\Packetbeat\packetbeat.exe',
    'C:\Program Files\Metricbeat\metricbeat.exe',
    'C:\Program Files\Heartbeat\heartbeat.exe',
    'C:\Program Files\Auditbeat\auditbeat.exe',
    'C:\Program Files (x86)\nxlog\nxlog.exe',
]
"#;

/// Defaults table for `platform`
pub fn defaults_table(platform: Platform) -> Result<Table, ConfigError> {
    let mut table: Table = toml::from_str(COMMON_DEFAULTS)?;
    if let Some(overrides) = platform.overrides() {
        merge_tables(&mut table, toml::from_str(overrides)?);
    }
    Ok(table)
}

/// Merge `overlay` into `base`.
///
/// Nested tables merge key by key; any other value (arrays included)
/// replaces the base value.
pub fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_defaults_parse() {
        let table = defaults_table(Platform::Posix).unwrap();
        assert_eq!(table["update_interval"].as_integer(), Some(10));
        assert_eq!(
            table["cache_path"].as_str(),
            Some("/var/cache/sidecar")
        );
    }

    #[test]
    fn test_windows_defaults_merge_over_common() {
        let table = defaults_table(Platform::Windows).unwrap();
        assert_eq!(
            table["log_path"].as_str(),
            Some(r"C:\Program Files\Sidecar\logs")
        );
        // Untouched keys come from the common table
        assert_eq!(table["log_rotate_keep_files"].as_integer(), Some(10));
        let whitelist = table["collector_binaries_whitelist"].as_array().unwrap();
        assert_eq!(whitelist.len(), 8);
    }

    #[test]
    fn test_merge_nested_tables() {
        let mut base: Table = toml::from_str("a = 1\n[backoff]\ninitial = 1\nmax = 60").unwrap();
        let overlay: Table = toml::from_str("[backoff]\nmax = 5").unwrap();
        merge_tables(&mut base, overlay);

        assert_eq!(base["a"].as_integer(), Some(1));
        assert_eq!(base["backoff"]["initial"].as_integer(), Some(1));
        assert_eq!(base["backoff"]["max"].as_integer(), Some(5));
    }

    #[test]
    fn test_merge_replaces_arrays() {
        let mut base: Table = toml::from_str("list = [1, 2, 3]").unwrap();
        let overlay: Table = toml::from_str("list = [9]").unwrap();
        merge_tables(&mut base, overlay);
        assert_eq!(base["list"].as_array().unwrap().len(), 1);
    }
}
