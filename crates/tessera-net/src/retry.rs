use std::{future::Future, time::Duration};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use crate::{
    error::NetError,
    traits::{ByteStream, Net},
    types::{Headers, RangeSpec, RetryPolicy},
};

pub trait RetryClassifier: Send + Sync {
    fn should_retry(&self, error: &NetError) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRetryClassifier;

impl RetryClassifier for DefaultRetryClassifier {
    fn should_retry(&self, error: &NetError) -> bool {
        error.is_retryable()
    }
}

/// Retry decorator for Net implementations
pub struct RetryNet<N, C = DefaultRetryClassifier> {
    inner: N,
    policy: RetryPolicy,
    classifier: C,
}

impl<N: Net> RetryNet<N, DefaultRetryClassifier> {
    pub fn new(inner: N, policy: RetryPolicy) -> Self {
        Self::with_classifier(inner, policy, DefaultRetryClassifier)
    }
}

impl<N: Net, C: RetryClassifier> RetryNet<N, C> {
    pub fn with_classifier(inner: N, policy: RetryPolicy, classifier: C) -> Self {
        Self {
            inner,
            policy,
            classifier,
        }
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }

    fn should_retry(&self, error: &NetError, attempt: u32) -> bool {
        attempt < self.policy.max_retries && self.classifier.should_retry(error)
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.policy.delay_for_attempt(attempt + 1)
    }

    async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, NetError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, NetError>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(out) => return Ok(out),
                Err(error) if self.should_retry(&error, attempt) => {
                    let delay = self.delay_for_attempt(attempt);
                    debug!(attempt, ?delay, error = %error, "retrying request");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(error) if attempt > 0 && self.classifier.should_retry(&error) => {
                    return Err(NetError::RetryExhausted {
                        max_retries: self.policy.max_retries,
                        source: Box::new(error),
                    });
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[async_trait]
impl<N: Net, C: RetryClassifier> Net for RetryNet<N, C> {
    async fn get_range(
        &self,
        url: Url,
        range: RangeSpec,
        headers: Option<Headers>,
    ) -> Result<ByteStream, NetError> {
        self.run(|| self.inner.get_range(url.clone(), range, headers.clone()))
            .await
    }

    async fn head(&self, url: Url, headers: Option<Headers>) -> Result<Headers, NetError> {
        self.run(|| self.inner.head(url.clone(), headers.clone()))
            .await
    }

    async fn get_headers(
        &self,
        url: Url,
        range: RangeSpec,
        headers: Option<Headers>,
    ) -> Result<Headers, NetError> {
        self.run(|| self.inner.get_headers(url.clone(), range, headers.clone()))
            .await
    }
}
