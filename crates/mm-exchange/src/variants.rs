//! Endpoint variant probing.
//!
//! The exchange exposes several REST path spellings for the same
//! operation depending on deployment vintage. Rather than hardcode one,
//! each operation carries an ordered candidate list; the first variant
//! that succeeds is cached and used for the rest of the process
//! lifetime. A later failure of the cached winner propagates directly
//! instead of re-probing, so transient errors are not misread as a
//! routing change.

use crate::error::{ExchangeError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;

/// Remembers which endpoint variant worked for each operation.
#[derive(Debug, Default)]
pub struct VariantProber {
    resolved: Mutex<HashMap<&'static str, usize>>,
}

impl VariantProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` against its candidate variants.
    ///
    /// `attempt(i)` performs the request for variant `i` in `0..count`.
    /// On the first probe the variants are tried in order and the winner
    /// index is cached. Once cached only the winner is called.
    pub async fn run<T, F, Fut>(
        &self,
        op: &'static str,
        count: usize,
        mut attempt: F,
    ) -> Result<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        debug_assert!(count > 0);

        if let Some(winner) = self.winner(op) {
            return attempt(winner).await;
        }

        let mut errors: Vec<String> = Vec::with_capacity(count);
        for i in 0..count {
            match attempt(i).await {
                Ok(value) => {
                    self.resolved.lock().insert(op, i);
                    if i > 0 {
                        tracing::debug!(op, variant = i, "endpoint variant resolved");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    // Auth failures are credential problems, not routing
                    // problems; trying more spellings only buries the cause.
                    if err.is_auth() {
                        return Err(err);
                    }
                    errors.push(format!("variant {i}: {err}"));
                }
            }
        }

        Err(ExchangeError::AllVariantsFailed {
            op,
            errors: errors.join("; "),
        })
    }

    fn winner(&self, op: &'static str) -> Option<usize> {
        self.resolved.lock().get(op).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_first_success_wins_and_is_cached() {
        let prober = VariantProber::new();
        let calls = AtomicUsize::new(0);

        let attempt = |i: usize| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if i == 1 {
                    Ok("ok")
                } else {
                    Err(ExchangeError::Http {
                        status: 404,
                        message: "not found".into(),
                    })
                }
            }
        };

        let out = prober.run("get_order", 3, attempt).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Second call goes straight to the cached winner.
        let out = prober.run("get_order", 3, attempt).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_all_variants_failing_aggregates_errors() {
        let prober = VariantProber::new();

        let result: Result<()> = prober
            .run("balances", 2, |i| async move {
                Err(ExchangeError::Http {
                    status: 404,
                    message: format!("miss {i}"),
                })
            })
            .await;

        match result {
            Err(ExchangeError::AllVariantsFailed { op, errors }) => {
                assert_eq!(op, "balances");
                assert!(errors.contains("variant 0"));
                assert!(errors.contains("miss 1"));
            }
            other => panic!("expected AllVariantsFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cached_winner_failure_propagates() {
        let prober = VariantProber::new();

        prober
            .run("cancel", 2, |_| async { Ok(()) })
            .await
            .unwrap();

        // The winner now fails; the error must surface as-is.
        let result: Result<()> = prober
            .run("cancel", 2, |_| async {
                Err(ExchangeError::Api {
                    message: "order not found".into(),
                })
            })
            .await;
        assert!(matches!(result, Err(ExchangeError::Api { .. })));
    }

    #[tokio::test]
    async fn test_auth_failure_short_circuits_probing() {
        let prober = VariantProber::new();
        let calls = AtomicUsize::new(0);

        let result: Result<()> = prober
            .run("orders", 3, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ExchangeError::auth(401, "unauthorized")) }
            })
            .await;

        assert!(matches!(result, Err(ExchangeError::Auth { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_operations_cached_independently() {
        let prober = VariantProber::new();

        prober
            .run("a", 2, |i| async move {
                if i == 1 {
                    Ok(())
                } else {
                    Err(ExchangeError::Http {
                        status: 404,
                        message: "x".into(),
                    })
                }
            })
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        prober
            .run("b", 2, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap();
        // "b" probes from variant 0, unaffected by "a"'s winner.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
