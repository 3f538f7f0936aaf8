// BSD 3-Clause License
//
// Copyright (c) 2025, BlackPortal ○
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this
//    list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice,
//    this list of conditions and the following disclaimer in the documentation
//    and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its
//    contributors may be used to endorse or promote products derived from
//    this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
// AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
// FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
// DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
// CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
// OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;

use revcast::ModelKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub address: String,
    pub port: u16,
    pub models_dir: PathBuf,
    pub model: ModelKind,
}

impl Settings {
    /// Reads `dashboard.toml` if present, then `REVCAST_*` environment variables.
    pub fn load() -> anyhow::Result<Self> {
        Config::builder()
            .set_default("address", "127.0.0.1")?
            .set_default("port", 3030_i64)?
            .set_default("models_dir", "models")?
            .set_default("model", "neural_network")?
            .add_source(File::with_name("dashboard").required(false))
            .add_source(Environment::with_prefix("REVCAST").try_parsing(true))
            .build()
            .context("failed to read dashboard settings")?
            .try_deserialize()
            .context("invalid dashboard settings")
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr =
            self.address.parse().with_context(|| format!("invalid address '{}'", self.address))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let settings = Settings {
            address: "0.0.0.0".to_string(),
            port: 8080,
            models_dir: PathBuf::from("models"),
            model: ModelKind::LinearRegression,
        };
        assert_eq!(settings.socket_addr().unwrap(), "0.0.0.0:8080".parse::<SocketAddr>().unwrap());

        let bad = Settings { address: "localhost:80".to_string(), ..settings };
        assert!(bad.socket_addr().is_err());
    }
}
