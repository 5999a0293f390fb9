/// 固定間隔バックオフ付き再試行ポリシー。
use std::time::Duration;

/// 再試行戦略の設定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大試行回数（初回を含む）
    pub max_attempts: usize,
    /// 失敗後、次の試行までに待機する時間
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// 新しい再試行ポリシーを作成する。
    #[must_use]
    pub const fn new(max_attempts: usize, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// 指定された試行回数の失敗後に待機すべき期間を返す。
    ///
    /// 最終試行の後は待機しないため `None` を返す。
    ///
    /// # Arguments
    /// * `attempt` - 失敗した試行の番号（1から開始）
    #[must_use]
    pub fn delay_after(&self, attempt: usize) -> Option<Duration> {
        self.can_retry(attempt).then_some(self.backoff)
    }

    /// この試行回数の後にさらに試行できるかどうかを判定する。
    #[must_use]
    pub const fn can_retry(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }
}
