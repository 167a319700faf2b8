use std::collections::HashSet;
use tokio::sync::Mutex;

/// Shared set of every distinct number the service has seen.
///
/// All access goes through one exclusive lock: connection handlers
/// insert, the snapshot worker copies the whole set out. The critical
/// sections never span I/O, so the lock is only ever held briefly.
pub struct NumberSet {
    numbers: Mutex<HashSet<i64>>,
}

impl NumberSet {
    pub fn new() -> Self {
        Self {
            numbers: Mutex::new(HashSet::new()),
        }
    }

    /// Adds a number if absent. Returns whether it was newly added.
    pub async fn insert(&self, number: i64) -> bool {
        self.numbers.lock().await.insert(number)
    }

    /// Adds a number and returns the sum of squares over all distinct
    /// numbers, in one critical section. The returned aggregate always
    /// reflects a set containing the number just inserted.
    pub async fn insert_and_aggregate(&self, number: i64) -> i64 {
        let mut numbers = self.numbers.lock().await;
        numbers.insert(number);
        sum_of_squares(&numbers)
    }

    /// Sum of squares over all distinct numbers currently held.
    /// Overflow wraps.
    pub async fn aggregate(&self) -> i64 {
        sum_of_squares(&*self.numbers.lock().await)
    }

    /// Copies every held number out under the lock, so a concurrent
    /// insert lands either fully before or fully after the copy. The
    /// returned order is unspecified.
    pub async fn snapshot(&self) -> Vec<i64> {
        self.numbers.lock().await.iter().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.numbers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.numbers.lock().await.is_empty()
    }

    /// Grabs the exclusive lock directly, to simulate a stalled
    /// critical section.
    #[cfg(test)]
    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, HashSet<i64>> {
        self.numbers.lock().await
    }
}

impl Default for NumberSet {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_of_squares(numbers: &HashSet<i64>) -> i64 {
    numbers
        .iter()
        .fold(0i64, |sum, &n| sum.wrapping_add(n.wrapping_mul(n)))
}
