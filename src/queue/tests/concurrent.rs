//! Tests for concurrent queue operations

#[cfg(test)]
mod tests {
    use crate::queue::{Queue, QueueError};
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_concurrent_producers_and_consumers() {
        let dir = TempDir::new().unwrap();
        let queue = Arc::new(Queue::open("busy", dir.path()).unwrap());
        let producers = 4;
        let per_producer = 50;

        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..per_producer {
                        queue.enqueue(format!("{}-{}", p, i).as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.length(), (producers * per_producer) as u64);

        let seen = Arc::new(Mutex::new(HashSet::new()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let seen = Arc::clone(&seen);
                thread::spawn(move || loop {
                    match queue.get_next() {
                        Ok(value) => {
                            let fresh = seen.lock().unwrap().insert(value);
                            assert!(fresh, "item delivered twice");
                        }
                        Err(QueueError::Empty) => break,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(seen.lock().unwrap().len(), producers * per_producer);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_per_producer_order_is_kept() {
        let dir = TempDir::new().unwrap();
        let queue = Arc::new(Queue::open("ordered", dir.path()).unwrap());

        let handles: Vec<_> = (0..3)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..30u32 {
                        queue.enqueue(format!("{}:{}", p, i).as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut last = [None::<u32>; 3];
        while let Ok(value) = queue.get_next() {
            let text = String::from_utf8(value).unwrap();
            let (p, i) = text.split_once(':').unwrap();
            let (p, i): (usize, u32) = (p.parse().unwrap(), i.parse().unwrap());
            if let Some(prev) = last[p] {
                assert!(i > prev);
            }
            last[p] = Some(i);
        }
    }
}
