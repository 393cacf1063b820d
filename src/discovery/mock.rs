//! Mock parameter store for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::remote::{Parameter, ParameterPage, ParameterStore};
use super::{DiscoveryError, Result};

/// Serves pre-built pages in order, handing out `page-{n}` tokens.
#[derive(Default)]
pub struct MockParameterStore {
    pages: Vec<Vec<Parameter>>,
    requests: RwLock<Vec<(String, Option<String>)>>,
    fail_on_page: RwLock<Option<usize>>,
}

impl MockParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(pages: Vec<Vec<Parameter>>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    /// Fail the request for page `index` (zero-based).
    pub async fn fail_on_page(&self, index: usize) {
        *self.fail_on_page.write().await = Some(index);
    }

    /// Every `(path, token)` requested so far.
    pub async fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl ParameterStore for MockParameterStore {
    async fn get_parameters_by_path(
        &self,
        path: &str,
        continuation_token: Option<String>,
    ) -> Result<ParameterPage> {
        self.requests
            .write()
            .await
            .push((path.to_string(), continuation_token.clone()));

        let index = match continuation_token.as_deref() {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| {
                    DiscoveryError::Parameters(format!("bad token '{}'", token).into())
                })?,
        };

        if *self.fail_on_page.read().await == Some(index) {
            return Err(DiscoveryError::Parameters(
                format!("simulated failure on page {}", index).into(),
            ));
        }

        let items = self.pages.get(index).cloned().unwrap_or_default();
        let continuation_token = if index + 1 < self.pages.len() {
            Some(format!("page-{}", index + 1))
        } else {
            None
        };

        Ok(ParameterPage {
            items,
            continuation_token,
        })
    }
}
