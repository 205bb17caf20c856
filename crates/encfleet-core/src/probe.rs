// ── Liveness probing ──
//
// Classifies each candidate address as hosting an appliance or not. A probe
// never fails: timeouts, refused connections, error statuses and bodies
// that are not a successful `ping` all mean "absent".

use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use encfleet_api::DeviceClient;
use tracing::{debug, info, trace};

use crate::pool::run_bounded;

/// One liveness check against one address.
pub trait LivenessProbe: Send + Sync + 'static {
    fn probe(&self, address: Ipv4Addr) -> impl Future<Output = bool> + Send;
}

/// Probe over the device API's `ping` method.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: reqwest::Client,
    port: u16,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(http: reqwest::Client, port: u16, timeout: Duration) -> Self {
        Self {
            http,
            port,
            timeout,
        }
    }
}

impl LivenessProbe for HttpProbe {
    async fn probe(&self, address: Ipv4Addr) -> bool {
        let client = match DeviceClient::new(self.http.clone(), &address.to_string(), self.port) {
            Ok(client) => client.with_timeout(self.timeout),
            Err(e) => {
                debug!(%address, error = %e, "cannot build probe URL");
                return false;
            }
        };

        match tokio::time::timeout(self.timeout, client.ping()).await {
            Ok(Ok(present)) => {
                trace!(%address, present, "ping answered");
                present
            }
            Ok(Err(e)) => {
                trace!(%address, error = %e, "ping failed");
                false
            }
            Err(_) => {
                trace!(%address, "ping timed out");
                false
            }
        }
    }
}

/// Runs a [`LivenessProbe`] over many addresses with bounded concurrency.
pub struct Prober<P> {
    probe: Arc<P>,
    max_concurrent: usize,
}

impl<P: LivenessProbe> Prober<P> {
    pub fn new(probe: P, max_concurrent: usize) -> Self {
        Self {
            probe: Arc::new(probe),
            max_concurrent,
        }
    }

    /// Addresses that answered, in ascending order.
    pub async fn scan(&self, addresses: Vec<Ipv4Addr>) -> Vec<Ipv4Addr> {
        let candidates = addresses.len();
        let results = run_bounded(addresses, self.max_concurrent, |address| {
            let probe = Arc::clone(&self.probe);
            async move { probe.probe(address).await.then_some(address) }
        })
        .await;

        let mut present: Vec<Ipv4Addr> = results.into_iter().flatten().flatten().collect();
        present.sort_unstable();
        info!(candidates, present = present.len(), "liveness scan finished");
        present
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Semaphore;

    use super::*;

    /// Blocks every probe on a gate and records peak concurrency.
    struct BlockingProbe {
        gate: Arc<Semaphore>,
        in_flight: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    impl LivenessProbe for BlockingProbe {
        async fn probe(&self, address: Ipv4Addr) -> bool {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            let _permit = self.gate.acquire().await.unwrap();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            address.octets()[3] % 2 == 0
        }
    }

    #[tokio::test]
    async fn never_exceeds_concurrency_cap() {
        let gate = Arc::new(Semaphore::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let prober = Prober::new(
            BlockingProbe {
                gate: Arc::clone(&gate),
                in_flight: Arc::clone(&in_flight),
                max_seen: Arc::clone(&max_seen),
            },
            3,
        );

        let addresses: Vec<Ipv4Addr> = (1..=10).map(|n| Ipv4Addr::new(10, 0, 0, n)).collect();
        let scan = tokio::spawn(async move { prober.scan(addresses).await });

        // Let the first wave reach the gate.
        for _ in 0..100 {
            if in_flight.load(Ordering::SeqCst) == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(in_flight.load(Ordering::SeqCst), 3);

        gate.add_permits(10);
        let present = scan.await.unwrap();

        assert_eq!(max_seen.load(Ordering::SeqCst), 3);
        assert_eq!(
            present,
            vec![
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 0, 0, 4),
                Ipv4Addr::new(10, 0, 0, 6),
                Ipv4Addr::new(10, 0, 0, 8),
                Ipv4Addr::new(10, 0, 0, 10),
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_address_is_absent() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = HttpProbe::new(reqwest::Client::new(), port, Duration::from_millis(500));
        assert!(!probe.probe(Ipv4Addr::LOCALHOST).await);
    }
}
