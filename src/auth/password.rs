use anyhow::Context;
use bcrypt::{hash, verify};
use tokio::task;
use tracing::error;

/// bcrypt work factor for stored passwords.
pub const HASH_COST: u32 = 10;

/// Runs on the blocking pool.
pub async fn hash_password(plain: &str) -> anyhow::Result<String> {
    let plain = plain.to_owned();
    task::spawn_blocking(move || hash(&plain, HASH_COST))
        .await
        .context("bcrypt hash task")?
        .map_err(|e| {
            error!(error = %e, "bcrypt hash_password error");
            anyhow::anyhow!(e.to_string())
        })
}

pub async fn verify_password(plain: &str, hashed: &str) -> anyhow::Result<bool> {
    let (plain, hashed) = (plain.to_owned(), hashed.to_owned());
    task::spawn_blocking(move || verify(&plain, &hashed))
        .await
        .context("bcrypt verify task")?
        .map_err(|e| {
            error!(error = %e, "bcrypt verify error");
            anyhow::anyhow!(e.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).await.expect("hashing should succeed");
        assert!(verify_password(password, &hash)
            .await
            .expect("verify should succeed"));
    }

    #[tokio::test]
    async fn hash_uses_cost_ten() {
        let hash = hash_password("secret1").await.expect("hashing should succeed");
        assert!(hash.starts_with("$2b$10$"), "unexpected hash prefix: {hash}");
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).await.expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash)
            .await
            .expect("verify should not error"));
    }

    #[tokio::test]
    async fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash")
            .await
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn hashing_leaves_the_executor_free() {
        let hashes: Vec<_> = (0..4)
            .map(|i| tokio::spawn(async move { hash_password(&format!("pw-{i}")).await }))
            .collect();
        tokio::task::yield_now().await;

        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(
            started.elapsed() < Duration::from_millis(50),
            "timer starved for {:?} while hashing",
            started.elapsed()
        );

        for h in hashes {
            assert!(h.await.unwrap().is_ok());
        }
    }
}
