use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use wikipage_domain::profile::ThrottlePolicy;

/// Actions that wait for an edit permit before being sent.
const PACED_ACTIONS: &[&str] = &["edit", "move", "delete"];

pub struct ThrottleController {
    policy: ThrottlePolicy,
    last_write: Mutex<Option<Instant>>,
}

impl ThrottleController {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self { policy, last_write: Mutex::new(None) }
    }

    pub fn is_paced(action: &str) -> bool {
        PACED_ACTIONS.contains(&action)
    }

    /// Waits until `min_edit_interval` has passed since the previous write.
    pub async fn acquire_edit_permit(&self) {
        let mut last = self.last_write.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.policy.min_edit_interval {
                sleep(self.policy.min_edit_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub fn maxlag(&self) -> u32 {
        self.policy.maxlag
    }
}
