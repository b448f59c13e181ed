//! 节奏控制 - 业务能力层
//!
//! 两次成功提交之间保持随机的最小间隔，并在提交前偶尔随手滚动页面。

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::{Config, JitterRange};
use crate::infrastructure::UiDriver;
use crate::utils::pause_between;

/// 上一次成功提交的时间，只存在内存中，每次运行重置
#[derive(Debug, Clone, Copy, Default)]
pub struct PacingState {
    pub last_action: Option<Instant>,
}

impl PacingState {
    pub fn mark(&mut self) {
        self.last_action = Some(Instant::now());
    }
}

/// 节奏控制器
pub struct Pacer {
    base: Duration,
    jitter: JitterRange,
    scroll_probability: f64,
    rng: StdRng,
}

impl Pacer {
    pub fn new(config: &Config) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: &Config, rng: StdRng) -> Self {
        Self {
            base: Duration::from_secs_f64(config.base_interval_sec),
            jitter: config.jitter_range,
            scroll_probability: config.scroll_probability,
            rng,
        }
    }

    /// 最小间隔的下限：`base + jitter.min`
    pub fn floor(&self) -> Duration {
        self.base + Duration::from_secs_f64(self.jitter.min)
    }

    /// 抽一次本轮需要的间隔：`base + uniform(jitter.min, jitter.max)`
    pub fn required_wait(&mut self) -> Duration {
        let jitter = if self.jitter.max > self.jitter.min {
            self.rng.gen_range(self.jitter.min..=self.jitter.max)
        } else {
            self.jitter.min
        };
        self.base + Duration::from_secs_f64(jitter)
    }

    /// 距离上次成功提交不足本轮间隔时，只睡剩下的部分
    ///
    /// # 返回
    /// 实际等待的时长
    pub async fn wait_since_last(&mut self, state: &PacingState) -> Duration {
        let Some(last) = state.last_action else {
            return Duration::ZERO;
        };

        let required = self.required_wait();
        let elapsed = last.elapsed();
        if elapsed >= required {
            return Duration::ZERO;
        }

        let remaining = required - elapsed;
        info!("⏳ 距上次提交 {:.1}s，再等待 {:.1}s", elapsed.as_secs_f64(), remaining.as_secs_f64());
        sleep(remaining).await;
        remaining
    }

    /// 按概率随手滚动一下页面，对功能没有影响
    ///
    /// # 返回
    /// 本次是否滚动
    pub async fn incidental_scroll<D: UiDriver>(&mut self, driver: &D) -> bool {
        if !self.rng.gen_bool(self.scroll_probability) {
            return false;
        }

        let amount = self.rng.gen_range(120..=520) * if self.rng.gen_bool(0.5) { 1 } else { -1 };
        if let Err(e) = driver
            .execute_script("window.scrollBy(0, arguments[0]);", &[amount.into()])
            .await
        {
            debug!("随手滚动失败: {}", e);
        }
        pause_between(0.06, 0.22).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake_driver::{FakeAction, FakeDriver};

    fn pacer(seed: u64) -> Pacer {
        Pacer::with_rng(&Config::default(), StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_required_wait_within_range() {
        let mut pacer = pacer(7);
        for _ in 0..500 {
            let wait = pacer.required_wait();
            assert!(wait >= Duration::from_secs(30));
            assert!(wait <= Duration::from_secs(45));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_before_first_submission() {
        let mut pacer = pacer(1);
        assert_eq!(pacer.wait_since_last(&PacingState::default()).await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gap_between_submissions_respects_floor() {
        for seed in 0..20 {
            let mut pacer = pacer(seed);
            let mut state = PacingState::default();
            state.mark();
            let marked = Instant::now();

            // 提交本身花掉的时间会被扣除
            sleep(Duration::from_secs(10)).await;
            pacer.wait_since_last(&state).await;

            assert!(marked.elapsed() >= pacer.floor());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_gap_needs_no_sleep() {
        let mut pacer = pacer(3);
        let mut state = PacingState::default();
        state.mark();
        sleep(Duration::from_secs(60)).await;

        assert_eq!(pacer.wait_since_last(&state).await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incidental_scroll_probability_extremes() {
        let driver = FakeDriver::new("https://example.test/create");
        let mut never = Pacer::with_rng(
            &Config { scroll_probability: 0.0, ..Config::default() },
            StdRng::seed_from_u64(9),
        );
        assert!(!never.incidental_scroll(&driver).await);
        assert!(driver.actions().is_empty());

        let mut always = Pacer::with_rng(
            &Config { scroll_probability: 1.0, ..Config::default() },
            StdRng::seed_from_u64(9),
        );
        assert!(always.incidental_scroll(&driver).await);
        assert!(matches!(
            driver.actions().as_slice(),
            [FakeAction::Script(s)] if s.contains("scrollBy")
        ));
    }
}
