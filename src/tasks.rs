//! Periodic background workers

use crate::{
	cacher::CacherPool,
	commands::{captcha, delay},
	constants::intervals,
	states::{ArcData, DiscordHandle},
};
use poise::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::time::{Instant, MissedTickBehavior};

/// A job run forever at a fixed interval
#[async_trait]
pub(crate) trait Looper {
	/// Name used in the logs
	const NAME: &'static str;
	/// Time between two runs
	const INTERVAL: Duration;

	/// One run of the job
	async fn loop_func(&self) -> anyhow::Result<()>;

	/// Run the job until the process stops, errors are logged and the job goes on
	async fn start(self: Arc<Self>)
	where
		Self: Sync,
	{
		let mut interval = tokio::time::interval(Self::INTERVAL);
		interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

		tracing::info!(looper = Self::NAME, interval = ?Self::INTERVAL, "starting looper");

		loop {
			interval.tick().await;

			if let Err(error) = self.loop_func().await {
				tracing::error!(looper = Self::NAME, error = ?error, "looper run failed");
			}
		}
	}
}

/// Drops the dead entries of every pooled cache
#[derive(Debug)]
pub(crate) struct CacherSweeper {
	/// The swept caches
	cachers: Arc<CacherPool>,
}

#[async_trait]
impl Looper for CacherSweeper {
	const NAME: &'static str = "cacher_sweeper";
	const INTERVAL: Duration = intervals::CACHER_SWEEP;

	async fn loop_func(&self) -> anyhow::Result<()> {
		let removed = self.cachers.sweep(Instant::now());
		if removed != 0 {
			tracing::trace!(removed = removed, "swept dead cache entries");
		}

		Ok(())
	}
}

/// Shared state of the workers touching Discord
#[derive(Debug, Clone)]
pub(crate) struct WorkerState {
	/// App data
	data: ArcData,
	/// Gateway cache and REST client
	discord: DiscordHandle,
}

/// Gives the roles members waited for
#[derive(Debug)]
pub(crate) struct DelayRoleWorker(WorkerState);

#[async_trait]
impl Looper for DelayRoleWorker {
	const NAME: &'static str = "delay_role";
	const INTERVAL: Duration = intervals::DELAY_ROLE;

	async fn loop_func(&self) -> anyhow::Result<()> {
		let mut connection = self.0.data.database.get().await?;
		delay::grant_delayed_roles(&self.0.discord, &mut connection).await
	}
}

/// Deletes the scheduled messages
#[derive(Debug)]
pub(crate) struct DelayDeleteWorker(WorkerState);

#[async_trait]
impl Looper for DelayDeleteWorker {
	const NAME: &'static str = "delay_delete";
	const INTERVAL: Duration = intervals::DELAY_DELETE;

	async fn loop_func(&self) -> anyhow::Result<()> {
		let mut connection = self.0.data.database.get().await?;
		delay::delete_due_messages(&self.0.discord, &mut connection).await
	}
}

/// Draws the lotteries
#[derive(Debug)]
pub(crate) struct DelayLotteryWorker(WorkerState);

#[async_trait]
impl Looper for DelayLotteryWorker {
	const NAME: &'static str = "delay_lottery";
	const INTERVAL: Duration = intervals::DELAY_LOTTERY;

	async fn loop_func(&self) -> anyhow::Result<()> {
		let mut connection = self.0.data.database.get().await?;
		delay::draw(&self.0.discord, &mut connection).await
	}
}

/// Drops or kicks the members who did not solve the captcha in time
#[derive(Debug)]
pub(crate) struct CaptchaTimeoutWorker(WorkerState);

#[async_trait]
impl Looper for CaptchaTimeoutWorker {
	const NAME: &'static str = "captcha_timeout";
	const INTERVAL: Duration = intervals::CAPTCHA_TIMEOUT;

	async fn loop_func(&self) -> anyhow::Result<()> {
		captcha::expire_queue(&self.0.discord, &self.0.data).await
	}
}

/// Spawn every worker
pub(crate) fn start_workers(data: &ArcData, discord: DiscordHandle) {
	let state = WorkerState {
		data: Arc::clone(data),
		discord,
	};

	tokio::spawn(
		Arc::new(CacherSweeper {
			cachers: Arc::clone(&data.cachers),
		})
		.start(),
	);
	tokio::spawn(Arc::new(DelayRoleWorker(state.clone())).start());
	tokio::spawn(Arc::new(DelayDeleteWorker(state.clone())).start());
	tokio::spawn(Arc::new(DelayLotteryWorker(state.clone())).start());
	tokio::spawn(Arc::new(CaptchaTimeoutWorker(state)).start());
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct Counter(AtomicUsize);

	#[async_trait]
	impl Looper for Counter {
		const NAME: &'static str = "counter";
		const INTERVAL: Duration = Duration::from_secs(10);

		async fn loop_func(&self) -> anyhow::Result<()> {
			self.0.fetch_add(1, Ordering::SeqCst);
			anyhow::bail!("failing runs do not stop the looper")
		}
	}

	#[tokio::test(start_paused = true)]
	async fn loopers_keep_running_after_errors() {
		let counter = Arc::new(Counter(AtomicUsize::new(0)));
		let task = tokio::spawn(Arc::clone(&counter).start());

		tokio::time::sleep(Duration::from_secs(25)).await;
		task.abort();

		assert_eq!(counter.0.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn sweeper_drops_dead_entries() {
		let cachers = Arc::new(CacherPool::default());
		let cacher = cachers.acquire::<u8, u8>(Duration::from_secs(1));
		cacher.set(1, 1);

		tokio::time::advance(Duration::from_secs(2)).await;
		CacherSweeper {
			cachers: Arc::clone(&cachers),
		}
		.loop_func()
		.await
		.unwrap();

		assert!(cacher.is_empty());
	}
}
