use crate::{constants::CANCEL_POLL_INTERVAL, pow::meets_difficulty, Block, MineError};
use std::convert::Infallible;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Shared flag another thread can trip to stop a running search.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Limits on a nonce search. The default is unbounded.
#[derive(Clone, Debug, Default)]
pub struct MiningBudget {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl MiningBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Cancellation wins over an expired deadline.
    fn check(&self, nonce: u64) -> Result<(), MineError> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(MineError::Cancelled { nonce });
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(MineError::DeadlineExceeded { nonce });
        }
        Ok(())
    }
}

/// Work done by one successful search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MineStats {
    /// Hashes tested, counting the one computed before the first increment.
    pub attempts: u64,
    pub elapsed: Duration,
}

impl Block {
    /// Increments the nonce until the hash starts with `difficulty` zero
    /// characters. There is no upper bound on the number of attempts.
    pub fn mine(&mut self, difficulty: u32) -> MineStats {
        match self.search(difficulty, |_| Ok::<(), Infallible>(())) {
            Ok(stats) => stats,
            Err(never) => match never {},
        }
    }

    /// Bounded variant of [`Block::mine`]. The budget is polled every
    /// [`CANCEL_POLL_INTERVAL`] attempts. On error the block keeps the last
    /// nonce tried, with a matching hash that does not meet `difficulty`.
    pub fn mine_with(
        &mut self,
        difficulty: u32,
        budget: &MiningBudget,
    ) -> Result<MineStats, MineError> {
        self.search(difficulty, |nonce| budget.check(nonce))
    }

    /// Nonce search shared by both entry points. `poll` runs once before the
    /// first increment and then every [`CANCEL_POLL_INTERVAL`] attempts.
    fn search<E: std::fmt::Display>(
        &mut self,
        difficulty: u32,
        mut poll: impl FnMut(u64) -> Result<(), E>,
    ) -> Result<MineStats, E> {
        let started = Instant::now();
        let mut attempts: u64 = 1;

        while !meets_difficulty(&self.hash, difficulty) {
            if (attempts - 1) % CANCEL_POLL_INTERVAL == 0 {
                if let Err(err) = poll(self.nonce) {
                    debug!(index = self.index, attempts, %err, "mining stopped");
                    return Err(err);
                }
            }
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.compute_hash();
            attempts += 1;
        }

        let stats = MineStats {
            attempts,
            elapsed: started.elapsed(),
        };
        info!(
            index = self.index,
            nonce = self.nonce,
            attempts,
            "Block mined: {}",
            self.hash
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::leading_zero_hex;

    #[test]
    fn mine_block_example() {
        let mut block = Block::with_timestamp(1, 1_600_000_000, "hello", "abc");
        let stats = block.mine(2);
        assert_eq!(block.nonce(), 54);
        assert_eq!(
            block.hash(),
            "00a3d2de203a5ee10633f411088debf054704dc179b3c482f4179a163422e2ed"
        );
        assert_eq!(stats.attempts, 55);
        assert_eq!(block.hash(), block.compute_hash());
    }

    #[test]
    fn mine_genesis_example() {
        let mut block = Block::with_timestamp(0, 1_700_000_000, "Genesis Block", "0");
        block.mine(3);
        assert_eq!(block.nonce(), 4976);
        assert!(leading_zero_hex(block.hash()) >= 3);
    }

    #[test]
    fn difficulty_zero_is_immediate() {
        let mut block = Block::new(1, "anything", "prev");
        let before = block.hash().to_string();
        let stats = block.mine(0);
        assert_eq!(block.nonce(), 0);
        assert_eq!(stats.attempts, 1);
        assert_eq!(block.hash(), before);
    }

    #[test]
    fn cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let budget = MiningBudget::unbounded().with_cancel(token);
        let mut block = Block::with_timestamp(1, 1_600_000_000, "hello", "abc");
        let err = block.mine_with(2, &budget).unwrap_err();
        assert_eq!(err, MineError::Cancelled { nonce: 0 });
        assert_eq!(block.hash(), block.compute_hash());
    }

    #[test]
    fn expired_deadline_stops_search() {
        let budget = MiningBudget::unbounded().with_deadline(Instant::now());
        let mut block = Block::with_timestamp(1, 1_600_000_000, "hello", "abc");
        let err = block.mine_with(2, &budget).unwrap_err();
        assert!(matches!(err, MineError::DeadlineExceeded { .. }));
    }

    #[test]
    fn satisfied_block_ignores_spent_budget() {
        let token = CancelToken::new();
        token.cancel();
        let budget = MiningBudget::unbounded()
            .with_cancel(token)
            .with_deadline(Instant::now());
        let mut block = Block::new(1, "anything", "prev");
        assert!(block.mine_with(0, &budget).is_ok());
    }

    #[test]
    fn cancel_from_another_thread() {
        let token = CancelToken::new();
        let budget = MiningBudget::unbounded().with_cancel(token.clone());
        let handle = std::thread::spawn(move || {
            // 40 leading zeros will not be found before the flag flips.
            let mut block = Block::new(1, "unreachable", "prev");
            block.mine_with(40, &budget)
        });
        std::thread::sleep(Duration::from_millis(20));
        token.cancel();
        let res = handle.join().unwrap();
        assert!(matches!(res, Err(MineError::Cancelled { .. })));
    }

    #[test]
    fn generous_timeout_still_finds_hash() {
        let budget = MiningBudget::unbounded().with_timeout(Duration::from_secs(60));
        let mut block = Block::with_timestamp(1, 1_600_000_000, "hello", "abc");
        let stats = block.mine_with(2, &budget).unwrap();
        assert_eq!(block.nonce(), 54);
        assert_eq!(stats.attempts, 55);
    }

    #[test]
    fn unbounded_budget_matches_plain_mine() {
        let mut plain = Block::with_timestamp(1, 1_600_000_000, "hello", "abc");
        let mut bounded = plain.clone();
        let stats = plain.mine(2);
        let bounded_stats = bounded.mine_with(2, &MiningBudget::unbounded()).unwrap();
        assert_eq!(plain, bounded);
        assert_eq!(stats.attempts, bounded_stats.attempts);
    }
}
