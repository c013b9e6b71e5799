use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use url::Url;

/// Enforces a minimum gap between request starts to the same host.
///
/// Each caller reserves the next free slot for its host under the lock and
/// sleeps outside it, so concurrent workers queue up behind each other
/// instead of firing together.
#[derive(Debug)]
pub struct HostPacer {
    min_delay: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostPacer {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits until a request to `url`'s host may start.
    pub async fn wait(&self, url: &str) {
        let delay = self.reserve(&host_key(url));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn reserve(&self, host: &str) -> Duration {
        if self.min_delay.is_zero() {
            return Duration::ZERO;
        }
        let now = Instant::now();
        let mut slots = self
            .next_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = slots
            .get(host)
            .copied()
            .filter(|slot| *slot > now)
            .unwrap_or(now);
        slots.insert(host.to_string(), slot + self.min_delay);
        slot - now
    }
}

fn host_key(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.host_str()
                .map(|host| match u.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                })
        })
        .unwrap_or_default()
}
