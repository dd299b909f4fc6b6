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

use std::net::IpAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use reading_archive::{Config, ReadingArchive};

/// Serves the reading archive from the current directory.
#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"), version, about = env!("CARGO_PKG_DESCRIPTION"))]
struct Cli {
    /// Port to listen on
    #[arg(default_value_t = 8000)]
    port: u16,

    /// Interface to listen on
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Directory whose files are served
    #[arg(short, long, default_value = ".")]
    directory: PathBuf,

    /// File overwritten by POST /api/save-csv
    #[arg(short, long, default_value = "articles.csv")]
    archive: PathBuf,

    /// Refuse save requests whose body is larger than this many bytes
    #[arg(long)]
    max_body_size: Option<u64>,

    /// Close connections that stay silent for this many seconds
    #[arg(long)]
    client_timeout: Option<u64>,
}

impl Cli {
    fn to_config(&self) -> Config {
        Config {
            bind: self.bind,
            port: self.port,
            root: self.directory.clone(),
            archive: self.archive.clone(),
            max_body_size: self.max_body_size,
            client_timeout: self.client_timeout.map(Duration::from_secs),
            ..Config::default()
        }
    }
}

fn setup_logger() {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    setup_logger();

    let config = cli.to_config();
    let server = match reading_archive::bind(&config) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            error!("could not listen on {}: {}", config.addr(), e);
            process::exit(1);
        }
    };
    let app = ReadingArchive::new(&config);

    let interrupted = server.clone();
    if let Err(e) = ctrlc::set_handler(move || interrupted.unblock()) {
        warn!("could not install the Ctrl-C handler: {}", e);
    }

    println!("Server running at http://localhost:{}/", server.server_addr().port());
    println!("Press Ctrl+C to stop the server");
    info!(
        "serving {} and saving to {}",
        config.root.display(),
        config.archive.display()
    );

    reading_archive::serve(&server, &app);

    println!("\nServer stopped.");
}
