// Copyright 2024-2025 Andres Morey
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

/// Fully resolved, immutable server configuration (spec §6).
#[derive(Debug, Clone)]
pub struct Config {
    pub address: SocketAddr,
    pub logs_dir: PathBuf,
    pub page_length: usize,
    pub max_line_length: usize,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: String,
    pub format: String,
}

#[derive(Deserialize, Debug)]
struct ConfigInternal {
    #[serde(rename(deserialize = "addr"))]
    address: String,
    #[serde(rename(deserialize = "logs-dir"))]
    logs_dir: PathBuf,
    #[serde(rename(deserialize = "page-length"))]
    page_length: usize,
    #[serde(rename(deserialize = "max-line-length"))]
    max_line_length: usize,
    logging: LoggingConfig,
}

#[derive(Deserialize, Debug)]
struct FullConfig {
    #[serde(rename(deserialize = "logs-server"))]
    logs_server: ConfigInternal,
}

impl Config {
    /// Loads configuration from an optional file, layered with CLI overrides
    /// in `<name>:<value>` form (mirroring the teacher's `cluster_agent`
    /// config layering), falling back to built-in defaults when no file is
    /// given.
    pub fn parse(path: Option<&std::path::Path>, overrides: &[(String, String)]) -> anyhow::Result<Self> {
        let mut builder = Self::builder_with_defaults()?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(&path.to_string_lossy()));
        }

        for (name, value) in overrides {
            builder = builder.set_override(format!("logs-server.{name}"), value.clone())?;
        }

        let settings = builder.build()?;
        let full_config: FullConfig = settings.try_deserialize()?;
        let internal = full_config.logs_server;

        Ok(Self {
            address: internal
                .address
                .parse()
                .with_context(|| format!("invalid listen address: {}", internal.address))?,
            logs_dir: internal.logs_dir,
            page_length: internal.page_length,
            max_line_length: internal.max_line_length,
            logging: internal.logging,
        })
    }

    fn builder_with_defaults() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>>
    {
        Ok(config::Config::builder()
            .set_default("logs-server.addr", "127.0.0.1:8080")?
            .set_default("logs-server.logs-dir", "/var/log")?
            .set_default(
                "logs-server.page-length",
                logs_core::Config::DEFAULT_PAGE_LENGTH as i64,
            )?
            .set_default(
                "logs-server.max-line-length",
                logs_core::Config::DEFAULT_MAX_LINE_LENGTH as i64,
            )?
            .set_default("logs-server.logging.enabled", true)?
            .set_default("logs-server.logging.level", "info")?
            .set_default("logs-server.logging.format", "json")?)
    }

    pub fn core_config(&self) -> logs_core::Config {
        logs_core::Config {
            logs_dir: self.logs_dir.clone(),
            page_length: self.page_length,
            max_line_length: self.max_line_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_used_when_no_file_is_given() {
        let config = Config::parse(None, &[]).unwrap();
        assert_eq!(config.address.port(), 8080);
        assert_eq!(config.page_length, logs_core::Config::DEFAULT_PAGE_LENGTH);
        assert_eq!(
            config.max_line_length,
            logs_core::Config::DEFAULT_MAX_LINE_LENGTH
        );
        assert!(config.logging.enabled);
    }

    #[test]
    fn cli_overrides_take_precedence_over_defaults() {
        let overrides = vec![
            ("addr".to_owned(), "0.0.0.0:9090".to_owned()),
            ("logs-dir".to_owned(), "/tmp".to_owned()),
        ];
        let config = Config::parse(None, &overrides).unwrap();
        assert_eq!(config.address.port(), 9090);
        assert_eq!(config.logs_dir, PathBuf::from("/tmp"));
    }
}
