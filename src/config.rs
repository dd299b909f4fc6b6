// Copyright 2026 The reading-archive Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_ARCHIVE: &str = "articles.csv";
pub const DEFAULT_SAVE_PATH: &str = "/api/save-csv";

/// Everything needed to run the reading archive server.
///
/// Relative paths are resolved against the working directory of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Interface to listen on. All of them by default.
    pub bind: IpAddr,

    /// Port to listen on. Zero picks a free one.
    pub port: u16,

    /// Directory whose files are served.
    pub root: PathBuf,

    /// The archive file overwritten by the save endpoint.
    pub archive: PathBuf,

    /// Request target of the save endpoint.
    pub save_path: String,

    /// Largest body the save endpoint accepts. `None` accepts any size.
    pub max_body_size: Option<u64>,

    /// Idle time after which a connection is dropped. `None` waits forever.
    pub client_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            root: PathBuf::from("."),
            archive: PathBuf::from(DEFAULT_ARCHIVE),
            save_path: DEFAULT_SAVE_PATH.to_owned(),
            max_body_size: None,
            client_timeout: None,
        }
    }
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn defaults_match_the_archive_layout() {
        let config = Config::default();

        assert_eq!(config.addr().to_string(), "0.0.0.0:8000");
        assert_eq!(config.archive.to_str(), Some("articles.csv"));
        assert_eq!(config.save_path, "/api/save-csv");
        assert_eq!(config.max_body_size, None);
    }
}
