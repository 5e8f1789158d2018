//! Dispatch over a full command sequence

#[cfg(test)]
mod tests {
    use crate::controller::tests::Session;
    use crate::controller::ControllerError;
    use crate::core::version::server_version;

    #[tokio::test]
    async fn test_dispatch_sequence() {
        let input = concat!(
            "set test 0 0 1\r\n1\r\n",
            "SET test 0 0 2\r\n20\r\n",
            "SET test 0 0 2\r\nab\r\n",
            "set test 0 0 10\r\n123\r\n12\r\n1\r\n",
            "get test\r\n",
            "get test/open\r\n",
            "GET test/abort\r\n",
            "get test/open\r\n",
            "get test/close\r\n",
            "gets test/close/open\r\n",
            "version\r\n",
            "STATS\r\n",
            "flush test\r\n",
            "DELETE test\r\n",
            "flush_all\r\n",
            "quit\r\n",
        );
        let mut s = Session::new(input);

        for _ in 0..4 {
            assert_eq!(s.ok().await, "STORED\r\n");
        }
        assert_eq!(s.ok().await, "VALUE test 0 1\r\n1\r\nEND\r\n");
        assert_eq!(s.ok().await, "VALUE test 0 2\r\n20\r\nEND\r\n");
        assert_eq!(s.ok().await, "END\r\n");
        assert_eq!(s.ok().await, "VALUE test 0 2\r\n20\r\nEND\r\n");
        assert_eq!(s.ok().await, "END\r\n");
        assert_eq!(s.ok().await, "VALUE test 0 2\r\nab\r\nEND\r\n");
        assert_eq!(s.ok().await, format!("VERSION {}\r\n", server_version()));

        let stats = s.ok().await;
        assert!(stats.starts_with("STAT uptime "), "{stats}");
        assert!(stats.contains("STAT queue_test_items 1\r\n"), "{stats}");
        assert!(stats.contains("STAT queue_test_open_transactions 1\r\n"), "{stats}");
        assert!(stats.ends_with("END\r\n"));

        assert_eq!(s.ok().await, "END\r\n");
        assert_eq!(s.ok().await, "END\r\n");
        assert_eq!(s.ok().await, "Flushed all queues.\r\n");

        let (result, output) = s.run().await;
        assert!(matches!(result, Err(ControllerError::ClientQuit)));
        assert_eq!(output, "");
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let mut s = Session::new("frobnicate test\r\n\r\nversion\r\n");
        let (result, output) = s.run().await;
        assert_eq!(output, "ERROR Unknown command\r\n");
        assert!(!result.unwrap_err().is_fatal());

        // blank lines are unknown commands too
        let (_, output) = s.run().await;
        assert_eq!(output, "ERROR Unknown command\r\n");

        // and the connection stays usable
        assert!(s.ok().await.starts_with("VERSION "));
    }

    #[tokio::test]
    async fn test_end_of_input_is_disconnect() {
        let mut s = Session::new("version\r\n");
        s.ok().await;
        let (result, _) = s.run().await;
        assert!(matches!(result, Err(ControllerError::Disconnected)));
    }

    #[tokio::test]
    async fn test_bare_newlines_are_accepted() {
        let mut s = Session::new("set test 0 0 1\n1\r\nget test\n");
        assert_eq!(s.ok().await, "STORED\r\n");
        assert_eq!(s.ok().await, "VALUE test 0 1\r\n1\r\nEND\r\n");
    }

    #[tokio::test]
    async fn test_stats_lists_groups() {
        let mut s = Session::with_items(&["1", "2"], "get test.g/open\r\nstats\r\n");
        s.ok().await;
        let stats = s.ok().await;
        let lines: Vec<&str> = stats.lines().collect();
        let expected_tail = [
            "STAT queue_test_items 2",
            "STAT queue_test_open_transactions 0",
            "STAT queue_test.g_items 1",
            "STAT queue_test.g_open_transactions 1",
            "END",
        ];
        assert_eq!(&lines[lines.len() - 5..], &expected_tail);
        assert!(lines.contains(&"STAT curr_connections 1"));
        assert!(lines.contains(&"STAT cmd_get 1"));
    }
}
