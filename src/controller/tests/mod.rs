//! Test modules for the protocol controller
//!
//! Each test preloads the client input and inspects the replies written
//! after every dispatched command.

mod dispatch;

use crate::controller::{Controller, ControllerResult};
use crate::repository::QueueRepository;
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::BufReader;

pub(super) type TestController = Controller<BufReader<Cursor<Vec<u8>>>, Vec<u8>>;

pub(super) struct Session {
    pub ctrl: TestController,
    pub repo: Arc<QueueRepository>,
    _dir: TempDir,
}

impl Session {
    pub fn new(input: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(QueueRepository::open(dir.path()).unwrap());
        Self::with_repo(dir, repo, input)
    }

    /// Session whose queue `test` already holds `values`
    pub fn with_items(values: &[&str], input: &str) -> Self {
        let session = Self::new(input);
        let queue = session.repo.get_queue("test").unwrap();
        for value in values {
            queue.enqueue(value.as_bytes()).unwrap();
        }
        session
    }

    /// Lower the `set` size limit of this session to `limit` bytes
    pub fn max_item_size(mut self, limit: usize) -> Self {
        self.ctrl = self.ctrl.with_max_item_size(limit);
        self
    }

    fn with_repo(dir: TempDir, repo: Arc<QueueRepository>, input: &str) -> Self {
        let reader = BufReader::new(Cursor::new(input.as_bytes().to_vec()));
        let ctrl = Controller::new_session(reader, Vec::new(), Arc::clone(&repo));
        Self {
            ctrl,
            repo,
            _dir: dir,
        }
    }

    /// Dispatch one command; returns its result and everything it wrote
    pub async fn run(&mut self) -> (ControllerResult<()>, String) {
        let result = self.ctrl.dispatch().await;
        let output = std::mem::take(self.ctrl.writer_mut());
        (result, String::from_utf8(output).unwrap())
    }

    /// Dispatch one command that must succeed; returns what it wrote
    pub async fn ok(&mut self) -> String {
        let (result, output) = self.run().await;
        assert!(result.is_ok(), "unexpected error {:?}, output {:?}", result, output);
        output
    }

    pub fn queue_length(&self, name: &str) -> u64 {
        self.repo.get_queue(name).unwrap().length()
    }
}
