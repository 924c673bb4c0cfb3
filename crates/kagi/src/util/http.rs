use std::{ops::Deref, time::Duration};

use fake_user_agent::get_chrome_rua;
use reqwest::{Client, ClientBuilder, IntoUrl};

use crate::error::{KagiError, KagiResult};

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> KagiResult<Self> {
        let client = builder.user_agent(get_chrome_rua()).build()?;
        Ok(Self { client })
    }

    /// Client whose requests fail with a transport error after `timeout`.
    pub fn with_timeout(timeout: Duration) -> KagiResult<Self> {
        Self::new(Client::builder().timeout(timeout))
    }

    pub async fn fetch_text(&self, url: impl IntoUrl) -> KagiResult<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Error body: {body}");
            return Err(KagiError::HttpError { status, body });
        }

        Ok(response.text().await?)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
