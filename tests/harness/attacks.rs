// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Traffic patterns for abuse simulation.

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Number of unique client addresses to simulate
    pub unique_ips: usize,
    /// Share of requests carrying a malformed feed URL (0.0-1.0)
    pub malformed_ratio: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_ips: 1,
            malformed_ratio: 0.0,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single client flood, well past one bucket.
    pub fn single_ip_flood() -> Self {
        Self {
            total_requests: 200,
            ..Default::default()
        }
    }

    /// Many clients, each staying under its own budget.
    pub fn distributed_attack() -> Self {
        Self {
            total_requests: 500,
            unique_ips: 100,
            ..Default::default()
        }
    }

    /// One client scanning the validator with junk URLs.
    pub fn malformed_url_scan() -> Self {
        Self {
            total_requests: 50,
            malformed_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Junk URLs from one client beyond its budget.
    pub fn malformed_flood() -> Self {
        Self {
            total_requests: 120,
            malformed_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Single client flood where about half the URLs are junk.
    pub fn mixed_flood() -> Self {
        Self {
            total_requests: 200,
            malformed_ratio: 0.5,
            ..Default::default()
        }
    }

    /// Whether request `index` should carry a malformed URL.
    pub fn is_malformed(&self, index: usize) -> bool {
        if self.malformed_ratio >= 1.0 {
            true
        } else if self.malformed_ratio <= 0.0 {
            false
        } else {
            (index as f64 * 0.618033988749895) % 1.0 < self.malformed_ratio
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_ratio_extremes() {
        let clean = AttackConfig::default();
        let junk = AttackConfig::malformed_url_scan();

        assert!((0..50).all(|i| !clean.is_malformed(i)));
        assert!((0..50).all(|i| junk.is_malformed(i)));
    }
}
