//! 有上限的轮询原语
//!
//! 空闲等待、验证码等待、元素等待和登录跳转等待都基于这里的 `poll_until`。

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, Instant};

/// 轮询参数
#[derive(Debug, Clone, Copy)]
pub struct PollSpec {
    /// 首次轮询间隔
    pub interval: Duration,
    /// 总时长上限
    pub timeout: Duration,
    /// 每次未就绪后间隔乘以的系数，1.0 表示固定间隔
    pub backoff: f64,
    /// 间隔上限
    pub max_interval: Duration,
}

impl PollSpec {
    pub fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            backoff: 1.0,
            max_interval: interval,
        }
    }

    pub fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff = factor.max(1.0);
        self.max_interval = max_interval.max(self.interval);
        self
    }
}

/// 轮询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    TimedOut,
}

impl<T> PollOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            PollOutcome::Ready(v) => Some(v),
            PollOutcome::TimedOut => None,
        }
    }
}

/// 反复执行 `attempt` 直到返回 `Some` 或超时
///
/// `attempt` 至少执行一次；最后一次休眠会被截断到截止时间。
pub async fn poll_until<T, F, Fut>(spec: &PollSpec, mut attempt: F) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + spec.timeout;
    let mut interval = spec.interval;

    loop {
        if let Some(value) = attempt().await {
            return PollOutcome::Ready(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return PollOutcome::TimedOut;
        }

        sleep(interval.min(deadline - now)).await;
        interval = interval.mul_f64(spec.backoff).min(spec.max_interval);
    }
}

/// 在 [min, max] 秒之间随机停顿
pub async fn pause_between(min_secs: f64, max_secs: f64) {
    sleep(random_duration(min_secs, max_secs)).await;
}

pub fn random_duration(min_secs: f64, max_secs: f64) -> Duration {
    if max_secs <= min_secs {
        return Duration::from_secs_f64(min_secs.max(0.0));
    }
    Duration::from_secs_f64(rand::thread_rng().gen_range(min_secs..=max_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_third_attempt() {
        let calls = Cell::new(0);
        let spec = PollSpec::fixed(Duration::from_millis(300), Duration::from_secs(25));
        let started = Instant::now();

        let outcome = poll_until(&spec, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { (n == 3).then_some(n) }
        })
        .await;

        assert_eq!(outcome, PollOutcome::Ready(3));
        assert_eq!(started.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_deadline() {
        let calls = Cell::new(0u32);
        let spec = PollSpec::fixed(Duration::from_secs(1), Duration::from_millis(2500));
        let started = Instant::now();

        let outcome: PollOutcome<()> = poll_until(&spec, || {
            calls.set(calls.get() + 1);
            async { None }
        })
        .await;

        assert_eq!(outcome, PollOutcome::TimedOut);
        // 0s, 1s, 2s, 2.5s
        assert_eq!(calls.get(), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_capped() {
        let spec = PollSpec::fixed(Duration::from_millis(100), Duration::from_secs(1))
            .with_backoff(2.0, Duration::from_millis(300));
        let started = Instant::now();
        let mut stamps = Vec::new();

        let _: PollOutcome<()> = poll_until(&spec, || {
            stamps.push(started.elapsed());
            async { None }
        })
        .await;

        let expected: Vec<Duration> = [0, 100, 300, 600, 900, 1000]
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect();
        assert_eq!(stamps, expected);
    }

    #[test]
    fn test_random_duration_bounds() {
        for _ in 0..100 {
            let d = random_duration(1.0, 2.5);
            assert!(d >= Duration::from_secs_f64(1.0) && d <= Duration::from_secs_f64(2.5));
        }
        assert_eq!(random_duration(3.0, 3.0), Duration::from_secs(3));
    }
}
