//! パブリッシャー名から所在国ラベルを推定する分類器。
pub mod label;
pub mod prompt;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

use crate::util::retry::RetryPolicy;

pub use self::label::{CountryLabel, UNKNOWN_LABEL};

/// パブリッシャー名に対して国名の生テキストを返す外部サービス。
#[async_trait]
pub trait CountryOracle: Send + Sync {
    /// 1回分の問い合わせを行う。通信・サービス側の失敗はすべて `Err` で返す。
    async fn locate(&self, publisher: &str) -> Result<String>;
}

#[async_trait]
impl<T: CountryOracle + ?Sized> CountryOracle for Arc<T> {
    async fn locate(&self, publisher: &str) -> Result<String> {
        (**self).locate(publisher).await
    }
}

/// 再試行付きでパブリッシャーを分類する。
pub struct PublisherClassifier<O> {
    oracle: O,
    retry_policy: RetryPolicy,
}

impl<O: CountryOracle> PublisherClassifier<O> {
    pub fn new(oracle: O, retry_policy: RetryPolicy) -> Self {
        Self {
            oracle,
            retry_policy,
        }
    }

    /// 1つのパブリッシャーを分類する。
    ///
    /// 失敗時は固定間隔で再試行し、最大試行回数に達したら `Unknown` を返す。
    /// 形式不正の応答は再試行せず `Unknown` に置き換える。このメソッドは失敗しない。
    pub async fn classify(&self, publisher: &str) -> CountryLabel {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.oracle.locate(publisher).await {
                Ok(raw) => {
                    let label = CountryLabel::from_response(&raw);
                    if attempt > 1 {
                        info!(publisher, attempt, "classification succeeded after retry");
                    }
                    debug!(publisher, label = %label, "classified publisher");
                    return label;
                }
                Err(err) => {
                    warn!(publisher, attempt, error = %err, "classification attempt failed");

                    let Some(delay) = self.retry_policy.delay_after(attempt) else {
                        warn!(
                            publisher,
                            max_attempts = self.retry_policy.max_attempts,
                            "max retries reached, falling back to Unknown"
                        );
                        return CountryLabel::Unknown;
                    };

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// 重複を除いた非nullのパブリッシャーを出現順に1回ずつ分類する。
    pub async fn classify_all<'a, I>(&self, publishers: I) -> PublisherCountryMap
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut seen = FxHashSet::default();
        let unique: Vec<&str> = publishers
            .into_iter()
            .flatten()
            .filter(|publisher| seen.insert(*publisher))
            .collect();

        info!(unique_publishers = unique.len(), "classifying publishers");

        let mut labels = FxHashMap::default();
        for publisher in unique {
            let label = self.classify(publisher).await;
            labels.insert(publisher.to_string(), label);
        }

        PublisherCountryMap { labels }
    }
}

/// 1回の実行中だけ保持されるパブリッシャー→国ラベルの対応表。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherCountryMap {
    labels: FxHashMap<String, CountryLabel>,
}

impl PublisherCountryMap {
    /// ラベルを引く。null・未登録のパブリッシャーは `Unknown`。
    #[must_use]
    pub fn label_for(&self, publisher: Option<&str>) -> &CountryLabel {
        publisher
            .and_then(|name| self.labels.get(name))
            .unwrap_or(&CountryLabel::Unknown)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// 国を特定できたパブリッシャー数。
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.labels.values().filter(|label| label.is_known()).count()
    }
}
