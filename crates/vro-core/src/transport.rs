//! Moving package archives to and from an orchestrator server.
//!
//! The pipeline only needs "bytes for package P" in both directions, so the
//! seam is the [`PackageTransport`] trait; [`HttpTransport`] is the REST
//! implementation used by the CLI.

use crate::config::ServerConfig;
use crate::error::{Result, VroError};
use reqwest::blocking::{multipart, Client};
use reqwest::StatusCode;

pub trait PackageTransport {
    fn fetch_package_bytes(&self, package: &str) -> Result<Vec<u8>>;
    fn send_package_bytes(&self, package: &str, bytes: Vec<u8>) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    /// Stored credentials win; `fallback` fills whatever the server entry lacks.
    pub fn resolve(
        server_name: &str,
        server: &ServerConfig,
        fallback_user: Option<String>,
        fallback_password: Option<String>,
    ) -> Result<Self> {
        let user = server.user.clone().or(fallback_user);
        let password = server.pwd.clone().or(fallback_password);
        match (user, password) {
            (Some(user), Some(password)) => Ok(Self { user, password }),
            _ => Err(VroError::MissingCredentials(server_name.to_string())),
        }
    }
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, credentials: Credentials, verify_ssl: bool) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!verify_ssl)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            credentials,
        })
    }

    pub fn for_server(server_name: &str, server: &ServerConfig, credentials: Credentials) -> Result<Self> {
        Self::new(server.base_url(server_name), credentials, server.verify_ssl)
    }

    fn packages_url(&self) -> String {
        format!("{}/vco/api/packages/", self.base_url)
    }
}

impl PackageTransport for HttpTransport {
    fn fetch_package_bytes(&self, package: &str) -> Result<Vec<u8>> {
        let url = format!("{}{package}", self.packages_url());
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .header(reqwest::header::ACCEPT, "application/zip")
            .send()?;
        if resp.status() != StatusCode::OK {
            return Err(VroError::HttpStatus {
                status: resp.status().as_u16(),
                url,
            });
        }
        Ok(resp.bytes()?.to_vec())
    }

    fn send_package_bytes(&self, package: &str, bytes: Vec<u8>) -> Result<()> {
        let url = format!("{}?overwrite=true", self.packages_url());
        let part = multipart::Part::bytes(bytes)
            .file_name(format!("{package}.package"))
            .mime_str("application/zip")?;
        let form = multipart::Form::new().part("file", part);
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .multipart(form)
            .send()?;
        if resp.status() != StatusCode::ACCEPTED {
            return Err(VroError::HttpStatus {
                status: resp.status().as_u16(),
                url,
            });
        }
        Ok(())
    }
}
