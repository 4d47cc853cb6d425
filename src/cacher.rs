//! In-memory caches with expiring entries
//!
//! A [`Cacher`] never removes a dead entry on its own, readers simply ignore it.
//! Cachers acquired from a [`CacherPool`] are swept periodically by the pool worker.

use parking_lot::Mutex;
use std::{
	collections::HashMap,
	fmt,
	hash::Hash,
	sync::{Arc, Weak},
};
use tokio::time::{Duration, Instant};

/// A cached value and the instant after which it is dead
#[derive(Debug, Clone)]
pub(crate) struct Cache<V> {
	/// The cached value
	pub(crate) data: V,
	/// Past this instant, the entry is dead
	pub(crate) deadline: Instant,
}

impl<V> Cache<V> {
	/// Whether the entry outlived its deadline
	#[must_use]
	pub(crate) fn is_dead(&self, now: Instant) -> bool {
		now > self.deadline
	}
}

/// Something the [`CacherPool`] can clean up
pub(crate) trait Sweep: Send + Sync {
	/// Drop every dead entry and return how many were removed
	fn sweep(&self, now: Instant) -> usize;
}

/// A map whose entries expire after a lifetime
pub(crate) struct Cacher<K, V> {
	/// The entries and their deadlines
	entries: Mutex<HashMap<K, Cache<V>>>,
	/// Default lifetime of new entries
	lifetime: Duration,
}

impl<K, V> fmt::Debug for Cacher<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cacher")
			.field("lifetime", &self.lifetime)
			.field("len", &self.entries.lock().len())
			.finish()
	}
}

impl<K: Eq + Hash + Clone, V: Clone> Cacher<K, V> {
	/// Create an empty cacher with a default entry lifetime
	#[must_use]
	pub(crate) fn new(lifetime: Duration) -> Self {
		Self {
			entries: Mutex::default(),
			lifetime,
		}
	}

	/// The default lifetime given to new entries
	#[must_use]
	pub(crate) const fn lifetime(&self) -> Duration {
		self.lifetime
	}

	/// Insert a value with the default lifetime
	pub(crate) fn set(&self, key: K, data: V) {
		self.set_with_lifetime(key, data, self.lifetime);
	}

	/// Insert a value with a specific lifetime
	pub(crate) fn set_with_lifetime(&self, key: K, data: V, lifetime: Duration) {
		let deadline = Instant::now() + lifetime;
		self.entries.lock().insert(key, Cache { data, deadline });
	}

	/// Get a copy of a live value
	#[must_use]
	pub(crate) fn get(&self, key: &K) -> Option<V> {
		self.get_raw(key).map(|cache| cache.data)
	}

	/// Get a copy of a live entry with its deadline
	#[must_use]
	pub(crate) fn get_raw(&self, key: &K) -> Option<Cache<V>> {
		let now = Instant::now();

		self.entries
			.lock()
			.get(key)
			.filter(|cache| !cache.is_dead(now))
			.cloned()
	}

	/// Get a live value or insert the one produced by `default`
	pub(crate) fn get_or_insert_with(&self, key: K, default: impl FnOnce() -> V) -> V {
		let now = Instant::now();
		let mut entries = self.entries.lock();

		match entries.get(&key) {
			Some(cache) if !cache.is_dead(now) => cache.data.clone(),
			_ => {
				let data = default();
				entries.insert(
					key,
					Cache {
						data: data.clone(),
						deadline: now + self.lifetime,
					},
				);
				data
			}
		}
	}

	/// Mutate a live value in place, keeping its deadline
	///
	/// Returns `false` when there is no live value for this key
	pub(crate) fn update(&self, key: &K, update: impl FnOnce(&mut V)) -> bool {
		let now = Instant::now();

		match self.entries.lock().get_mut(key) {
			Some(cache) if !cache.is_dead(now) => {
				update(&mut cache.data);
				true
			}
			_ => false,
		}
	}

	/// Remove an entry, dead or alive, and return its value
	pub(crate) fn remove(&self, key: &K) -> Option<V> {
		self.entries.lock().remove(key).map(|cache| cache.data)
	}

	/// Whether a live value exists for this key
	#[must_use]
	pub(crate) fn contains_key(&self, key: &K) -> bool {
		self.get_raw(key).is_some()
	}

	/// Number of stored entries, including dead ones not swept yet
	#[must_use]
	pub(crate) fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Whether nothing is stored
	#[must_use]
	pub(crate) fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	/// Keys of the live entries
	#[must_use]
	pub(crate) fn keys(&self) -> Vec<K> {
		self.items().into_iter().map(|(key, _)| key).collect()
	}

	/// Values of the live entries
	#[must_use]
	pub(crate) fn values(&self) -> Vec<V> {
		self.items().into_iter().map(|(_, value)| value).collect()
	}

	/// Live entries
	#[must_use]
	pub(crate) fn items(&self) -> Vec<(K, V)> {
		let now = Instant::now();

		self.entries
			.lock()
			.iter()
			.filter(|(_, cache)| !cache.is_dead(now))
			.map(|(key, cache)| (key.clone(), cache.data.clone()))
			.collect()
	}

	/// Remove the dead entries and hand them back
	pub(crate) fn take_expired(&self, now: Instant) -> Vec<(K, V)> {
		let mut entries = self.entries.lock();

		let expired: Vec<K> = entries
			.iter()
			.filter(|(_, cache)| cache.is_dead(now))
			.map(|(key, _)| key.clone())
			.collect();

		expired
			.into_iter()
			.filter_map(|key| entries.remove(&key).map(|cache| (key, cache.data)))
			.collect()
	}
}

impl<K, V> Sweep for Cacher<K, V>
where
	K: Eq + Hash + Send,
	V: Send,
{
	fn sweep(&self, now: Instant) -> usize {
		let mut entries = self.entries.lock();
		let before = entries.len();

		entries.retain(|_, cache| !cache.is_dead(now));

		before - entries.len()
	}
}

/// Owns weak references to cachers and sweeps them
#[derive(Default)]
pub(crate) struct CacherPool {
	/// The registered cachers, dropped ones are forgotten on the next sweep
	cachers: Mutex<Vec<Weak<dyn Sweep>>>,
}

impl fmt::Debug for CacherPool {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CacherPool")
			.field("cachers", &self.len())
			.finish()
	}
}

impl CacherPool {
	/// Create a cacher swept by this pool
	pub(crate) fn acquire<K, V>(&self, lifetime: Duration) -> Arc<Cacher<K, V>>
	where
		K: Eq + Hash + Clone + Send + 'static,
		V: Clone + Send + 'static,
	{
		let cacher = Arc::new(Cacher::new(lifetime));

		let weak: Weak<dyn Sweep> = Arc::downgrade(&cacher) as Weak<dyn Sweep>;
		self.cachers.lock().push(weak);

		cacher
	}

	/// Stop sweeping a cacher
	pub(crate) fn release<K, V>(&self, cacher: &Arc<Cacher<K, V>>)
	where
		K: Eq + Hash + Send + 'static,
		V: Send + 'static,
	{
		let target = Arc::as_ptr(cacher).cast::<()>();

		self.cachers
			.lock()
			.retain(|weak| weak.as_ptr().cast::<()>() != target);
	}

	/// Number of cachers still alive
	#[must_use]
	pub(crate) fn len(&self) -> usize {
		self.cachers
			.lock()
			.iter()
			.filter(|weak| weak.strong_count() > 0)
			.count()
	}

	/// Sweep every registered cacher and forget the dropped ones
	pub(crate) fn sweep(&self, now: Instant) -> usize {
		let cachers: Vec<Arc<dyn Sweep>> = {
			let mut cachers = self.cachers.lock();
			cachers.retain(|weak| weak.strong_count() > 0);
			cachers.iter().filter_map(Weak::upgrade).collect()
		};

		cachers.iter().map(|cacher| cacher.sweep(now)).sum()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn entries_die_after_their_lifetime() {
		let cacher = Cacher::<u64, &str>::new(Duration::from_secs(10));
		cacher.set(1, "one");
		cacher.set_with_lifetime(2, "two", Duration::from_secs(30));

		assert_eq!(cacher.get(&1), Some("one"));

		tokio::time::advance(Duration::from_secs(11)).await;

		assert_eq!(cacher.get(&1), None);
		assert_eq!(cacher.get(&2), Some("two"));
		// dead entries stay stored until swept
		assert_eq!(cacher.len(), 2);
		assert_eq!(cacher.keys(), vec![2]);

		assert_eq!(cacher.sweep(Instant::now()), 1);
		assert_eq!(cacher.len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn default_factory_replaces_dead_entries() {
		let cacher = Cacher::<&str, Vec<u8>>::new(Duration::from_secs(5));

		assert!(cacher.get_or_insert_with("a", Vec::new).is_empty());
		assert!(cacher.update(&"a", |list| list.push(1)));
		assert_eq!(cacher.get_or_insert_with("a", Vec::new), vec![1]);

		tokio::time::advance(Duration::from_secs(6)).await;

		assert!(!cacher.update(&"a", |list| list.push(2)));
		assert!(cacher.get_or_insert_with("a", Vec::new).is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn take_expired_returns_dead_values() {
		let cacher = Cacher::<u8, u8>::new(Duration::from_secs(1));
		cacher.set(1, 10);
		cacher.set_with_lifetime(2, 20, Duration::from_secs(60));

		tokio::time::advance(Duration::from_secs(2)).await;

		assert_eq!(cacher.take_expired(Instant::now()), vec![(1, 10)]);
		assert_eq!(cacher.items(), vec![(2, 20)]);
	}

	#[tokio::test(start_paused = true)]
	async fn pool_sweeps_and_forgets_cachers() {
		let pool = CacherPool::default();
		let kept = pool.acquire::<u8, u8>(Duration::from_secs(1));
		let dropped = pool.acquire::<u8, u8>(Duration::from_secs(1));
		let released = pool.acquire::<u8, u8>(Duration::from_secs(1));

		kept.set(1, 1);
		released.set(1, 1);
		assert_eq!(pool.len(), 3);

		drop(dropped);
		pool.release(&released);
		assert_eq!(pool.len(), 1);

		tokio::time::advance(Duration::from_secs(2)).await;

		assert_eq!(pool.sweep(Instant::now()), 1);
		assert!(kept.is_empty());
		assert_eq!(released.len(), 1);
	}
}
