//! Injectable effects for deterministic testing
//!
//! Time and randomness are the only ambient side effects the store
//! depends on. Both are injected behind small traits so production code
//! uses the real clock and OS entropy while tests and simulations run with
//! simulated time and seeded randomness (same inputs, same outputs).
//! Nothing in the workspace reads the clock or the OS RNG directly.

use crate::errors::{CordonError, Result};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

// ========== Time Source Abstraction ==========

/// Abstract time source - real system time or simulated time
pub trait TimeSource: Send + Sync {
    /// Get current Unix timestamp in seconds
    fn current_timestamp(&self) -> Result<u64>;

    /// Advance time by N seconds (no-op for real time, used in tests)
    fn advance(&self, _seconds: u64) -> Result<()> {
        Ok(())
    }

    /// Set absolute time (simulated sources only)
    fn set_time(&self, _timestamp: u64) -> Result<()> {
        Err(CordonError::internal(
            "Setting time is not supported for this time source",
        ))
    }

    /// Check if this is a simulated time source
    fn is_simulated(&self) -> bool {
        false
    }
}

/// Real system time source (production use)
#[derive(Debug, Clone, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    /// Create a new system time source
    pub fn new() -> Self {
        SystemTimeSource
    }
}

impl TimeSource for SystemTimeSource {
    fn current_timestamp(&self) -> Result<u64> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .map_err(|e| CordonError::internal(format!("System time is before UNIX epoch: {e}")))
    }
}

/// Simulated time source for deterministic tests.
///
/// Time only moves when the test advances it, which makes context-expiry
/// and cache-TTL behavior exactly reproducible.
#[derive(Debug, Clone)]
pub struct SimulatedTimeSource {
    current_time: Arc<Mutex<u64>>,
}

impl SimulatedTimeSource {
    /// Create a simulated source starting at the given timestamp
    pub fn new(initial_timestamp: u64) -> Self {
        SimulatedTimeSource {
            current_time: Arc::new(Mutex::new(initial_timestamp)),
        }
    }

    /// Create starting at a recent time (2025-01-01 00:00:00 UTC)
    pub fn from_recent() -> Self {
        Self::new(1_735_689_600)
    }
}

impl TimeSource for SimulatedTimeSource {
    fn current_timestamp(&self) -> Result<u64> {
        let time = self
            .current_time
            .lock()
            .map_err(|e| CordonError::internal(format!("Time lock poisoned: {e}")))?;
        Ok(*time)
    }

    fn advance(&self, seconds: u64) -> Result<()> {
        let mut time = self
            .current_time
            .lock()
            .map_err(|e| CordonError::internal(format!("Time lock poisoned: {e}")))?;
        *time = time.saturating_add(seconds);
        Ok(())
    }

    fn set_time(&self, timestamp: u64) -> Result<()> {
        let mut time = self
            .current_time
            .lock()
            .map_err(|e| CordonError::internal(format!("Time lock poisoned: {e}")))?;
        *time = timestamp;
        Ok(())
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

// ========== Random Source Abstraction ==========

/// Abstract randomness source - OS entropy or seeded deterministic RNG
pub trait RandomSource: Send + Sync {
    /// Fill a byte buffer with random data
    fn fill_bytes(&self, dest: &mut [u8]);

    /// Generate a random u64
    fn gen_u64(&self) -> u64;

    /// Generate a UUID (v4 in production, deterministic under a seed)
    fn gen_uuid(&self) -> Uuid;
}

/// Real randomness source using OS entropy (production use)
#[derive(Debug, Clone, Default)]
pub struct OsRandomSource;

impl OsRandomSource {
    /// Create a new OS random source
    pub fn new() -> Self {
        OsRandomSource
    }
}

impl RandomSource for OsRandomSource {
    fn fill_bytes(&self, dest: &mut [u8]) {
        rand::thread_rng().fill_bytes(dest);
    }

    fn gen_u64(&self) -> u64 {
        rand::thread_rng().next_u64()
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Seeded deterministic RNG for tests and reproducible simulations.
///
/// ChaCha12 keeps the cryptographic shape of production randomness while
/// being fully determined by the seed.
#[derive(Debug, Clone)]
pub struct SeededRandomSource {
    rng: Arc<Mutex<ChaCha12Rng>>,
}

impl SeededRandomSource {
    /// Create a new seeded RNG with the given seed
    pub fn new(seed: u64) -> Self {
        SeededRandomSource {
            rng: Arc::new(Mutex::new(ChaCha12Rng::seed_from_u64(seed))),
        }
    }

    /// Create with a seed derived from a test name, for test isolation
    pub fn from_test_name(test_name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        test_name.hash(&mut hasher);
        Self::new(hasher.finish())
    }
}

impl RandomSource for SeededRandomSource {
    fn fill_bytes(&self, dest: &mut [u8]) {
        #[allow(clippy::expect_used)] // Mutex poisoning is unrecoverable
        let mut rng = self.rng.lock().expect("RNG lock poisoned");
        rng.fill_bytes(dest);
    }

    fn gen_u64(&self) -> u64 {
        #[allow(clippy::expect_used)] // Mutex poisoning is unrecoverable
        let mut rng = self.rng.lock().expect("RNG lock poisoned");
        rng.next_u64()
    }

    fn gen_uuid(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.fill_bytes(&mut bytes);
        Uuid::from_bytes(bytes)
    }
}

// ========== RNG Adapter ==========

/// Adapter making a `RandomSource` usable where rand crate traits are
/// expected (e.g. keypair generation).
pub struct EffectsRng {
    source: Arc<dyn RandomSource>,
}

impl EffectsRng {
    /// Wrap a random source
    pub fn new(source: Arc<dyn RandomSource>) -> Self {
        EffectsRng { source }
    }
}

impl RngCore for EffectsRng {
    fn next_u32(&mut self) -> u32 {
        (self.source.gen_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.source.gen_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.source.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for EffectsRng {}

// ========== Effect Bundle ==========

/// Bundle of injectable effects passed into every stateful component
#[derive(Clone)]
pub struct Effects {
    /// Time source for timestamps
    pub time: Arc<dyn TimeSource>,
    /// Randomness for nonces, keys, and identifiers
    pub random: Arc<dyn RandomSource>,
}

impl Effects {
    /// Production effects: real time + OS randomness
    pub fn production() -> Self {
        Effects {
            time: Arc::new(SystemTimeSource::new()),
            random: Arc::new(OsRandomSource::new()),
        }
    }

    /// Deterministic effects: simulated time + seeded RNG
    pub fn deterministic(seed: u64, initial_time: u64) -> Self {
        Effects {
            time: Arc::new(SimulatedTimeSource::new(initial_time)),
            random: Arc::new(SeededRandomSource::new(seed)),
        }
    }

    /// Test effects with default seed and recent time
    pub fn test() -> Self {
        Self::deterministic(0, 1_735_689_600)
    }

    /// Test effects isolated by test name
    pub fn for_test(test_name: &str) -> Self {
        Effects {
            time: Arc::new(SimulatedTimeSource::from_recent()),
            random: Arc::new(SeededRandomSource::from_test_name(test_name)),
        }
    }

    /// Current Unix timestamp in seconds
    pub fn now(&self) -> Result<u64> {
        self.time.current_timestamp()
    }

    /// Random bytes as a fixed-size array
    pub fn random_bytes<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.random.fill_bytes(&mut bytes);
        bytes
    }

    /// An RNG adapter over this bundle's random source
    pub fn rng(&self) -> EffectsRng {
        EffectsRng::new(Arc::clone(&self.random))
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::production()
    }
}

impl std::fmt::Debug for Effects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effects")
            .field("simulated_time", &self.time.is_simulated())
            .finish()
    }
}
