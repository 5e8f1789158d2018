//! Server wide counters reported by the `stats` command

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// One `STAT <key> <value>` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatItem {
    pub key: String,
    pub value: String,
}

impl StatItem {
    pub fn new(key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ServerStats {
    version: String,
    start_time: DateTime<Utc>,
    curr_connections: AtomicI64,
    total_connections: AtomicU64,
    cmd_get: AtomicU64,
    cmd_set: AtomicU64,
}

impl ServerStats {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            start_time: Utc::now(),
            curr_connections: AtomicI64::new(0),
            total_connections: AtomicU64::new(0),
            cmd_get: AtomicU64::new(0),
            cmd_set: AtomicU64::new(0),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Whole seconds since the server started
    pub fn uptime(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }

    pub fn connection_opened(&self) {
        self.curr_connections.fetch_add(1, Ordering::SeqCst);
        self.total_connections.fetch_add(1, Ordering::SeqCst);
    }

    pub fn connection_closed(&self) {
        self.curr_connections.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn record_get(&self) {
        self.cmd_get.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.cmd_set.fetch_add(1, Ordering::Relaxed);
    }

    pub fn curr_connections(&self) -> i64 {
        self.curr_connections.load(Ordering::SeqCst)
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::SeqCst)
    }

    pub fn cmd_get(&self) -> u64 {
        self.cmd_get.load(Ordering::Relaxed)
    }

    pub fn cmd_set(&self) -> u64 {
        self.cmd_set.load(Ordering::Relaxed)
    }

    /// The server level lines, in reporting order
    pub fn items(&self) -> Vec<StatItem> {
        vec![
            StatItem::new("uptime", self.uptime()),
            StatItem::new("time", Utc::now().timestamp()),
            StatItem::new("version", &self.version),
            StatItem::new("curr_connections", self.curr_connections()),
            StatItem::new("total_connections", self.total_connections()),
            StatItem::new("cmd_get", self.cmd_get()),
            StatItem::new("cmd_set", self.cmd_set()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_counters() {
        let stats = ServerStats::new("stashq-test");
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();

        assert_eq!(stats.curr_connections(), 1);
        assert_eq!(stats.total_connections(), 2);
    }

    #[test]
    fn test_items_order_and_values() {
        let stats = ServerStats::new("stashq-test");
        stats.record_get();
        stats.record_get();
        stats.record_set();

        let items = stats.items();
        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "uptime",
                "time",
                "version",
                "curr_connections",
                "total_connections",
                "cmd_get",
                "cmd_set"
            ]
        );
        assert_eq!(items[0].value, "0");
        assert_eq!(items[2].value, "stashq-test");
        assert_eq!(items[5].value, "2");
        assert_eq!(items[6].value, "1");
    }
}
