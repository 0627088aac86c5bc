use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use tokio::time::Instant;

use super::{classify, ProbeOutcome, Prober, Transport};
use crate::config::MonitorConfig;

const MAX_REDIRECTS: usize = 10;

/// HTTP prober backed by a single pooled client.
///
/// The client carries no global timeout; each probe applies its own deadline,
/// which covers connecting, headers and the full body.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn from_config(config: &MonitorConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(Self::build_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn build_client(config: &MonitorConfig) -> Result<Client, reqwest::Error> {
        let redirect = if config.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(redirect)
            .pool_max_idle_per_host(4)
            .gzip(true)
            .build()
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Transport {
        let start = Instant::now();

        let response = match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => return transport_error(&e),
        };

        let status = response.status().as_u16();
        if status != 200 {
            return Transport::Response {
                status,
                elapsed: start.elapsed(),
            };
        }

        match response.bytes().await {
            Ok(_) => Transport::Response {
                status,
                elapsed: start.elapsed(),
            },
            Err(e) => transport_error(&e),
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        classify(self.fetch(url, timeout).await)
    }
}

/// Connection failures win over timeouts, which win over everything else.
fn transport_error(err: &reqwest::Error) -> Transport {
    if err.is_connect() {
        Transport::ConnectFailed
    } else if err.is_timeout() {
        Transport::TimedOut
    } else {
        Transport::Failed(root_cause(err))
    }
}

fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut cause = err;
    while let Some(next) = cause.source() {
        cause = next;
    }
    cause.to_string()
}
