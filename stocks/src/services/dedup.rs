use std::{fmt, net::IpAddr};

use tokio::task;
use tracing::warn;

/// Lowest bcrypt work factor the hasher accepts.
pub const MIN_HASH_COST: u32 = 4;
/// Highest bcrypt work factor the hasher accepts.
pub const MAX_HASH_COST: u32 = 31;

/// Failure to produce or check a liker hash. A like must never be recorded
/// when this occurs.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Task(#[from] task::JoinError),
}

/// Salted one-way hash of a liker IP.
///
/// Only [`IpHasher::hash`] produces values of this type, so a stored hash is
/// always verifiable against the IP it came from.
#[derive(Clone, PartialEq, Eq)]
pub struct IpHash(String);

impl IpHash {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for IpHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Salt and cost prefix only.
        let prefix: String = self.0.chars().take(29).collect();
        write!(f, "IpHash({prefix}…)")
    }
}

/// Decides whether an IP already liked a stock without keeping the IP in
/// plaintext.
///
/// Hashes are bcrypt strings with a fresh random salt per call, so hashing the
/// same IP twice gives two different strings that both verify. Both hashing
/// and verification are deliberately slow and run on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct IpHasher {
    cost: u32,
}

impl IpHasher {
    /// The cost is not range-checked here; an out-of-range cost surfaces as
    /// [`HashError::Bcrypt`] on first use.
    #[must_use]
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, ip: IpAddr) -> Result<IpHash, HashError> {
        let cost = self.cost;
        let subject = canonical_ip(ip);

        let hashed = task::spawn_blocking(move || bcrypt::hash(subject, cost)).await??;
        Ok(IpHash(hashed))
    }

    /// Checks `ip` against `hashes` in order and stops at the first match.
    ///
    /// An empty list is never a match.
    pub async fn is_already_liked(
        &self,
        ip: IpAddr,
        hashes: Vec<String>,
    ) -> Result<bool, HashError> {
        if hashes.is_empty() {
            return Ok(false);
        }

        let subject = canonical_ip(ip);
        let liked = task::spawn_blocking(move || verify_any(&subject, &hashes)).await?;
        Ok(liked)
    }
}

/// IPv4-mapped IPv6 peers (`::ffff:a.b.c.d`) are the same caller as `a.b.c.d`.
fn canonical_ip(ip: IpAddr) -> String {
    ip.to_canonical().to_string()
}

fn verify_any(subject: &str, hashes: &[String]) -> bool {
    hashes
        .iter()
        .enumerate()
        .any(|(idx, hash)| match bcrypt::verify(subject, hash) {
            Ok(matched) => matched,
            Err(e) => {
                // An unparseable entry cannot match any IP.
                warn!(index = idx, error = %e, "skipping malformed liker hash");
                false
            }
        })
}
