//! Retrieval of the readings for a single timestamp, with bounded retry.

pub mod error;
pub mod payload;
pub mod transport;

use crate::fetcher::error::{FailureKind, FetchError};
use crate::fetcher::payload::parse_readings;
use crate::fetcher::transport::Transport;
use crate::types::reading_set::ReadingSet;
use crate::types::variable::Variable;
use chrono::NaiveDateTime;
use log::{debug, error, warn};
use reqwest::StatusCode;
use std::time::Duration;

pub const DEFAULT_ATTEMPTS: u32 = 10;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(10);

/// How many times a timestamp is requested before giving up, and how long to
/// wait between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, bon::Builder)]
pub struct RetryPolicy {
    /// Total requests allowed per timestamp, the first one included.
    #[builder(default = DEFAULT_ATTEMPTS)]
    pub attempts: u32,
    #[builder(default = DEFAULT_BACKOFF)]
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Blocks between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Sleeps on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

pub struct Fetcher<T, S = ThreadSleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
}

impl<T: Transport> Fetcher<T, ThreadSleeper> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, ThreadSleeper, policy)
    }
}

impl<T: Transport, S: Sleeper> Fetcher<T, S> {
    pub fn with_sleeper(transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches the readings reported for `timestamp`.
    ///
    /// Returns `None` both when the API has no readings for that instant and
    /// when every attempt failed; failures are logged, never returned.
    ///
    /// Transient failures (bad status, connection errors) are retried until
    /// the policy's attempts are used up. After a malformed payload at most
    /// one further attempt is made.
    pub fn fetch(&self, variable: Variable, timestamp: NaiveDateTime) -> Option<ReadingSet> {
        let mut remaining = self.policy.attempts.max(1);
        loop {
            let err = match self.attempt(variable, timestamp) {
                Ok(readings) => return readings,
                Err(err) => err,
            };
            remaining -= 1;
            let kind = err.kind();
            if remaining == 0 {
                error!(
                    "dt = {}, {} error = {}, attempts left = 0. FAILED TO RETRIEVE DATA.",
                    timestamp, variable, err
                );
                return None;
            }
            if kind == FailureKind::Malformed {
                remaining = remaining.min(1);
            }
            warn!(
                "dt = {}, {} error = {}, attempts left = {}. Retrying in {:?}.",
                timestamp, variable, err, remaining, self.policy.backoff
            );
            self.sleeper.sleep(self.policy.backoff);
        }
    }

    fn attempt(
        &self,
        variable: Variable,
        timestamp: NaiveDateTime,
    ) -> Result<Option<ReadingSet>, FetchError> {
        let reply = self.transport.get(variable, timestamp)?;
        if reply.status != StatusCode::OK {
            return Err(FetchError::HttpStatus {
                url: reply.url,
                status: reply.status,
            });
        }
        let readings = parse_readings(variable, &reply.body)?;
        if readings.is_none() {
            debug!("No {} readings at {}", variable, timestamp);
        }
        Ok(readings)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::fetcher::transport::HttpReply;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    pub fn reply(status: u16, body: &str) -> HttpReply {
        HttpReply {
            url: "http://stub/v1/environment".to_string(),
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    /// Serves queued replies in order, then repeats the fallback.
    pub struct ScriptedTransport {
        queue: RefCell<VecDeque<HttpReply>>,
        fallback: HttpReply,
        pub calls: Cell<usize>,
    }

    impl ScriptedTransport {
        pub fn new(script: Vec<HttpReply>, fallback: HttpReply) -> Self {
            Self {
                queue: RefCell::new(script.into()),
                fallback,
                calls: Cell::new(0),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn get(&self, _: Variable, _: NaiveDateTime) -> Result<HttpReply, FetchError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self
                .queue
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone()))
        }
    }

    #[derive(Default)]
    pub struct CountingSleeper {
        pub waits: RefCell<Vec<Duration>>,
    }

    impl CountingSleeper {
        pub fn count(&self) -> usize {
            self.waits.borrow().len()
        }
    }

    impl Sleeper for CountingSleeper {
        fn sleep(&self, duration: Duration) {
            self.waits.borrow_mut().push(duration);
        }
    }
}
