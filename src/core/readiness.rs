//! Readiness probing - bounded, sequential polling of the backend health endpoint

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use super::error::SupervisorError;

/// Spacing between health checks
pub const PROBE_INTERVAL: Duration = Duration::from_millis(500);
/// Health checks before giving up (60 x 500 ms = 30 s)
pub const MAX_PROBE_ATTEMPTS: u32 = 60;
/// Upper bound for a single health check
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Fixed polling policy for one startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub probe_timeout: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: PROBE_INTERVAL,
            max_attempts: MAX_PROBE_ATTEMPTS,
            probe_timeout: PROBE_TIMEOUT,
        }
    }
}

impl ReadinessPolicy {
    /// Wall-clock ceiling of one readiness wait
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Progress of one readiness wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessProbeState {
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub interval: Duration,
    pub deadline_exceeded: bool,
}

impl ReadinessProbeState {
    pub fn new(policy: &ReadinessPolicy) -> Self {
        Self {
            attempt_count: 0,
            max_attempts: policy.max_attempts,
            interval: policy.interval,
            deadline_exceeded: false,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.deadline_exceeded || self.attempt_count >= self.max_attempts
    }
}

/// A single "is the backend answering yet?" check
pub trait HealthProbe {
    /// True once the backend answered. Failures mean "not yet"
    fn probe(&self) -> impl Future<Output = bool> + Send;
}

/// Probe that treats any HTTP response from the health URL as ready
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpHealthProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl HealthProbe for HttpHealthProbe {
    async fn probe(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let status = response.status();
                // Error statuses still prove the server is up
                if !status.is_success() {
                    debug!("Health endpoint answered with {}", status);
                }
                true
            }
            Err(e) => {
                trace!("Health check failed: {}", e);
                false
            }
        }
    }
}

/// Poll `probe` until it succeeds or the policy's budget is spent
///
/// One probe is in flight at a time; the first one is issued immediately and
/// the rest follow at `policy.interval`. Never runs longer than
/// `policy.budget()`: each probe is cut off at the remaining budget.
pub async fn wait_for_ready<P: HealthProbe>(
    probe: &P,
    policy: &ReadinessPolicy,
) -> Result<ReadinessProbeState, SupervisorError> {
    let started = Instant::now();
    let deadline = started + policy.budget();
    let mut state = ReadinessProbeState::new(policy);

    let mut ticker = time::interval(policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while !state.exhausted() {
        if time::timeout_at(deadline, ticker.tick()).await.is_err() {
            state.deadline_exceeded = true;
            break;
        }

        let now = Instant::now();
        if now >= deadline {
            state.deadline_exceeded = true;
            break;
        }

        state.attempt_count += 1;
        let window = policy.probe_timeout.min(deadline - now);
        let ready = time::timeout(window, probe.probe()).await.unwrap_or(false);

        if ready {
            info!(
                "Backend is ready (attempt {}/{}, {} ms)",
                state.attempt_count,
                state.max_attempts,
                started.elapsed().as_millis()
            );
            return Ok(state);
        }

        debug!(
            "Waiting for backend... ({}/{})",
            state.attempt_count, state.max_attempts
        );
    }

    Err(SupervisorError::Timeout {
        attempts: state.attempt_count,
        budget: policy.budget(),
    })
}


#[cfg(test)]
mod tests {
    use super::testing::{HangingProbe, ScriptedProbe};
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn default_policy_budget_is_thirty_seconds() {
        let policy = ReadinessPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert_eq!(policy.max_attempts, 60);
        assert_eq!(policy.probe_timeout, Duration::from_millis(2000));
        assert_eq!(policy.budget(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn ready_on_third_attempt_stops_polling() {
        let probe = ScriptedProbe::ready_on(3);
        let started = Instant::now();

        let state = wait_for_ready(&probe, &ReadinessPolicy::default())
            .await
            .unwrap();

        assert_eq!(state.attempt_count, 3);
        assert!(!state.deadline_exceeded);
        assert_eq!(started.elapsed(), Duration::from_millis(1000));

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(probe.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn never_ready_times_out_after_sixty_attempts() {
        let probe = ScriptedProbe::never();
        let policy = ReadinessPolicy::default();
        let started = Instant::now();

        let err = wait_for_ready(&probe, &policy).await.unwrap_err();

        match err {
            SupervisorError::Timeout { attempts, budget } => {
                assert_eq!(attempts, 60);
                assert_eq!(budget, Duration::from_secs(30));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(probe.calls(), 60);
        assert!(started.elapsed() <= policy.budget());
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_probes_cannot_stretch_the_budget() {
        let policy = ReadinessPolicy::default();
        let started = Instant::now();

        let err = wait_for_ready(&HangingProbe, &policy).await.unwrap_err();

        assert!(matches!(err, SupervisorError::Timeout { .. }));
        assert!(started.elapsed() <= policy.budget());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempt_budget_fails_without_probing() {
        let probe = ScriptedProbe::ready_on(1);
        let policy = ReadinessPolicy {
            max_attempts: 0,
            ..ReadinessPolicy::default()
        };

        let err = wait_for_ready(&probe, &policy).await.unwrap_err();

        assert!(matches!(err, SupervisorError::Timeout { attempts: 0, .. }));
        assert_eq!(probe.calls(), 0);
    }

    #[test]
    fn probe_state_exhaustion() {
        let mut state = ReadinessProbeState::new(&ReadinessPolicy::default());
        assert!(!state.exhausted());
        state.attempt_count = 60;
        assert!(state.exhausted());

        let mut state = ReadinessProbeState::new(&ReadinessPolicy::default());
        state.deadline_exceeded = true;
        assert!(state.exhausted());
    }

    #[tokio::test]
    async fn http_probe_accepts_error_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                )
                .await;
        });

        let probe =
            HttpHealthProbe::new(format!("http://{}/", addr), Duration::from_secs(2)).unwrap();
        assert!(probe.probe().await);
    }

    #[tokio::test]
    async fn http_probe_reports_refused_connection_as_not_ready() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe =
            HttpHealthProbe::new(format!("http://{}/", addr), Duration::from_secs(2)).unwrap();
        assert!(!probe.probe().await);
    }
}
