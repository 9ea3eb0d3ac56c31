#[cfg(test)]
mod tests {
    use virtual_window::{
        Accumulator,
        BulkLoader,
        LoaderError,
        loader::LoaderConfig,
    };
    use std::{
        sync::Arc,
        thread,
        time::Duration,
    };

    fn slow<I>(items: I, delay: Duration) -> impl Iterator<Item = I::Item> + Send + 'static
    where
        I: IntoIterator + 'static,
        I::IntoIter: Send + 'static,
    {
        items.into_iter().inspect(move |_| thread::sleep(delay))
    }

    #[test]
    fn test_loads_everything() {
        let loader = BulkLoader::new();
        let task = loader.start(0..1000u32).unwrap().unwrap();
        let summary = task.join().unwrap();
        assert_eq!(summary.appended, 1000);
        assert_eq!(summary.skipped, 0);
        assert!(!summary.cancelled);
        assert!(loader.is_finished());
        assert_eq!(loader.loaded(), 1000);
        let snapshot = loader.accumulator().snapshot();
        let values: Vec<u32> = snapshot.iter().map(|v| **v).collect();
        assert_eq!(values, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_second_start_is_ignored() {
        let loader = BulkLoader::new();
        let task = loader.start(vec!["a", "b", "c"]).unwrap().unwrap();
        assert!(loader.start(vec!["x", "y"]).unwrap().is_none());
        task.join().unwrap();
        assert!(loader.start(vec!["z"]).unwrap().is_none());
        assert_eq!(loader.loaded(), 3);
    }

    #[test]
    fn test_shared_accumulator() {
        let accumulator = Arc::new(Accumulator::new());
        let loader = BulkLoader::with_accumulator(Arc::clone(&accumulator));
        loader.start(0..10).unwrap().unwrap().join().unwrap();
        assert_eq!(accumulator.len(), 10);
    }

    #[test]
    fn test_block_until_reaches_count() {
        let loader = BulkLoader::new();
        let _task = loader.start(slow(0..200u32, Duration::from_millis(1))).unwrap();
        loader.block_until(20);
        assert!(loader.loaded() >= 20);
        loader.dispose();
    }

    #[test]
    fn test_block_until_returns_when_source_is_short() {
        let loader = BulkLoader::new();
        let _task = loader.start(slow(0..5u32, Duration::from_millis(2))).unwrap();
        loader.block_until(50);
        assert!(loader.is_finished());
        assert_eq!(loader.loaded(), 5);
    }

    #[test]
    fn test_block_until_timeout() {
        let loader = BulkLoader::with_config(
            Arc::new(Accumulator::new()),
            LoaderConfig {
                poll_interval: Duration::from_millis(2),
                thread_name: "slow-loader".to_string(),
            },
        );
        let task = loader.start(slow(0u64.., Duration::from_millis(5))).unwrap().unwrap();
        assert!(!loader.block_until_timeout(1_000_000, Duration::from_millis(50)));
        assert!(loader.block_until_timeout(1, Duration::from_secs(5)));
        loader.dispose();
        let summary = task.join().unwrap();
        assert!(summary.cancelled);
    }

    #[test]
    fn test_dispose_stops_infinite_source() {
        let loader = BulkLoader::new();
        let task = loader.start(slow(0u64.., Duration::from_micros(200))).unwrap().unwrap();
        loader.block_until(10);
        loader.dispose();
        loader.dispose();
        let summary = task.join().unwrap();
        assert!(summary.cancelled);
        let after = loader.loaded();
        assert!(after >= 10);
        assert_eq!(summary.appended, after);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(loader.loaded(), after);
    }

    #[test]
    fn test_source_size_is_monotonic() {
        let loader = BulkLoader::new();
        let task = loader.start(slow(0..300u32, Duration::from_micros(100))).unwrap().unwrap();
        let mut last = 0;
        while !loader.is_finished() {
            let now = loader.loaded();
            assert!(now >= last);
            last = now;
        }
        task.join().unwrap();
        assert_eq!(loader.loaded(), 300);
    }

    #[test]
    fn test_item_errors_are_skipped() {
        let loader = BulkLoader::new();
        let items: Vec<Result<u32, String>> = vec![
            Ok(1),
            Err("permission denied".to_string()),
            Ok(2),
            Err("gone".to_string()),
            Ok(3),
        ];
        let summary = loader.start_fallible(items).unwrap().unwrap().join().unwrap();
        assert_eq!(summary.appended, 3);
        assert_eq!(summary.skipped, 2);
        let values: Vec<u32> = loader.accumulator().snapshot().iter().map(|v| **v).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_producer_panic_keeps_loaded_items() {
        let loader = BulkLoader::new();
        let items = (0..10u32).map(|i| {
            if i == 4 {
                panic!("broken source");
            }
            i
        });
        let task = loader.start(items).unwrap().unwrap();
        loader.block_until(1000);
        assert!(loader.is_finished());
        match task.join() {
            Err(LoaderError::ProducerPanicked { message }) => assert_eq!(message, "broken source"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(loader.loaded(), 4);
    }
}
