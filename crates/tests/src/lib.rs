//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端场景：有界在途、关闭流程、致命错误单次上报、取消


#[cfg(test)]
mod contract_tests {
    use contracts::FeederConfig;

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(FeederConfig::DEFAULT_QUEUE_DEPTH, 100);
        assert_eq!(dispatcher::EXIT_CODE, 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use dispatcher::{
        BoundedDispatcher, CancellationToken, DispatcherBuilder, DispatcherError, Phase,
        RunSummary, EXIT_CODE,
    };
    use sources::{ChannelSource, EndSignal, MockSource};

    use crate::fakes::{
        recording_gate, wait_until, BrokenSource, GatedTask, RecordingController, RecordingTask,
        StallingSource,
    };

    const WAIT: Duration = Duration::from_secs(5);

    fn items(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn spawn_run(
        dispatcher: BoundedDispatcher<String>,
    ) -> thread::JoinHandle<Result<RunSummary, DispatcherError>> {
        thread::Builder::new()
            .name("test-pull".into())
            .spawn(move || dispatcher.run())
            .unwrap()
    }

    /// N items: N process calls, one task_complete after all of them
    #[test]
    fn test_every_item_processed_before_completion() {
        let task = Arc::new(RecordingTask::default().with_delay(Duration::from_millis(2)));
        let controller = Arc::new(RecordingController::new(5).watching(task.clone()));
        let (gate, terminator) = recording_gate();

        let summary = DispatcherBuilder::<String>::new(
            Arc::new(MockSource::numbered(50)),
            task.clone(),
            controller.clone(),
        )
        .queue_depth(8)
        .parallelism(4)
        .gate(gate)
        .build()
        .unwrap()
        .run()
        .unwrap();

        assert_eq!(summary.metrics.dispatched, 50);
        assert_eq!(summary.metrics.completed, 50);
        assert_eq!(summary.throughput.items, 50);
        assert_eq!(task.order().len(), 50);
        assert_eq!(controller.completions(), 1);
        assert_eq!(controller.finished_at_completion(), 50);
        assert_eq!(terminator.calls(), 0);
    }

    /// In-flight never exceeds capacity, even with more workers than slots
    #[test]
    fn test_in_flight_bounded_by_capacity() {
        let task = Arc::new(RecordingTask::default().with_delay(Duration::from_millis(10)));
        let controller = Arc::new(RecordingController::new(5));
        let (gate, _) = recording_gate();

        let summary = DispatcherBuilder::<String>::new(
            Arc::new(MockSource::numbered(40)),
            task.clone(),
            controller,
        )
        .queue_depth(3)
        .parallelism(8)
        .gate(gate)
        .build()
        .unwrap()
        .run()
        .unwrap();

        assert!(summary.metrics.peak_in_flight <= 3);
        assert!(task.peak_running() <= 3);
        assert_eq!(summary.metrics.in_flight, 0);
    }

    /// Capacity 1 processes units one at a time in submission order
    #[test]
    fn test_capacity_one_preserves_order() {
        let task = Arc::new(RecordingTask::default());
        let controller = Arc::new(RecordingController::new(5));
        let (gate, _) = recording_gate();

        DispatcherBuilder::<String>::new(
            Arc::new(MockSource::numbered(25)),
            task.clone(),
            controller,
        )
        .queue_depth(1)
        .parallelism(4)
        .gate(gate)
        .build()
        .unwrap()
        .run()
        .unwrap();

        let expected: Vec<String> = (0..25).map(|i| format!("item-{i}")).collect();
        assert_eq!(task.order(), expected);
        assert_eq!(task.peak_running(), 1);
    }

    /// capacity=2, parallelism=2, [A, B, C]: C waits for A or B
    #[test]
    fn test_third_item_waits_for_free_slot() {
        let source = Arc::new(MockSource::new("abc", items(&["A", "B", "C"])));
        let (release, task) = GatedTask::new();
        let task = Arc::new(task);
        let controller = Arc::new(RecordingController::new(5));
        let (gate, terminator) = recording_gate();

        let dispatcher = DispatcherBuilder::<String>::new(
            source.clone(),
            task.clone(),
            controller.clone(),
        )
        .queue_depth(2)
        .parallelism(2)
        .gate(gate)
        .build()
        .unwrap();
        let handle = spawn_run(dispatcher);

        assert!(wait_until(WAIT, || task.started().len() == 2));
        thread::sleep(Duration::from_millis(100));
        assert_eq!(task.started(), items(&["A", "B"]));
        assert_eq!(source.pulls(), 2, "C must not be pulled while both slots are held");

        release.send_blocking(()).unwrap();
        assert!(wait_until(WAIT, || task.started().len() == 3));
        assert_eq!(task.started()[2], "C");
        assert_eq!(controller.completions(), 0);

        release.send_blocking(()).unwrap();
        release.send_blocking(()).unwrap();

        let summary = handle.join().unwrap().unwrap();
        assert_eq!(summary.metrics.dispatched, 3);
        assert_eq!(summary.metrics.peak_in_flight, 2);
        assert_eq!(task.finished(), 3);
        assert_eq!(controller.completions(), 1);
        assert_eq!(terminator.calls(), 0);
    }

    /// A failing unit halts once with a non-zero code and skips task_complete
    #[test]
    fn test_worker_failure_is_fatal() {
        let task = Arc::new(RecordingTask::default().failing_on(&["A"]));
        let controller = Arc::new(RecordingController::new(5));
        let (gate, terminator) = recording_gate();

        let result = DispatcherBuilder::<String>::new(
            Arc::new(MockSource::new("a", items(&["A"]))),
            task,
            controller.clone(),
        )
        .queue_depth(2)
        .parallelism(2)
        .gate(gate.clone())
        .build()
        .unwrap()
        .run();

        assert!(matches!(result, Err(DispatcherError::Halted)));
        assert!(gate.is_tripped());
        assert_eq!(terminator.calls(), 1);
        assert_eq!(terminator.last_code(), EXIT_CODE);
        assert_eq!(controller.completions(), 0);
    }

    /// Many concurrent failures still halt exactly once
    #[test]
    fn test_concurrent_failures_halt_once() {
        let names: Vec<String> = (0..16).map(|i| format!("item-{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let task = Arc::new(
            RecordingTask::default()
                .with_delay(Duration::from_millis(20))
                .failing_on(&refs),
        );
        let controller = Arc::new(RecordingController::new(5));
        let (gate, terminator) = recording_gate();

        let result = DispatcherBuilder::<String>::new(
            Arc::new(MockSource::numbered(16)),
            task,
            controller.clone(),
        )
        .queue_depth(8)
        .parallelism(8)
        .gate(gate)
        .build()
        .unwrap()
        .run();

        assert!(result.is_err());
        assert_eq!(terminator.calls(), 1);
        assert_eq!(controller.completions(), 0);
    }

    /// A panicking unit is escalated like an error
    #[test]
    fn test_worker_panic_is_fatal() {
        let task = Arc::new(RecordingTask::default().panicking_on(&["item-1"]));
        let controller = Arc::new(RecordingController::new(5));
        let (gate, terminator) = recording_gate();

        let result = DispatcherBuilder::<String>::new(
            Arc::new(MockSource::numbered(3)),
            task,
            controller.clone(),
        )
        .queue_depth(1)
        .parallelism(1)
        .gate(gate)
        .build()
        .unwrap()
        .run();

        assert!(result.is_err());
        assert_eq!(terminator.calls(), 1);
        assert_eq!(controller.completions(), 0);
    }

    /// After a failure no further item is pulled, even with a free slot
    #[test]
    fn test_failure_stops_pulling_before_slot_reuse() {
        let source = Arc::new(MockSource::numbered(5));
        let task = Arc::new(RecordingTask::default().failing_on(&["item-0"]));
        let controller = Arc::new(RecordingController::new(5));
        let (gate, terminator) = recording_gate();

        let result = DispatcherBuilder::<String>::new(
            source.clone(),
            task.clone(),
            controller.clone(),
        )
        .queue_depth(1)
        .parallelism(1)
        .gate(gate)
        .build()
        .unwrap()
        .run();

        assert!(matches!(result, Err(DispatcherError::Halted)));
        assert_eq!(task.order(), vec!["item-0".to_string()]);
        assert_eq!(source.pulls(), 1);
        assert_eq!(terminator.calls(), 1);
        assert_eq!(controller.completions(), 0);
    }

    /// Drain exceeding the controller timeout is fatal
    #[test]
    fn test_drain_timeout_is_fatal() {
        let task = Arc::new(RecordingTask::default().with_delay(Duration::from_millis(2500)));
        let controller = Arc::new(RecordingController::new(1));
        let (gate, terminator) = recording_gate();

        let result = DispatcherBuilder::<String>::new(
            Arc::new(MockSource::numbered(1)),
            task,
            controller.clone(),
        )
        .queue_depth(2)
        .parallelism(1)
        .gate(gate)
        .build()
        .unwrap()
        .run();

        match result {
            Err(err @ DispatcherError::DrainTimeout { timeout_secs: 1 }) => {
                assert_eq!(err.phase(), Phase::PoolDrain);
            }
            other => panic!("expected drain timeout, got {other:?}"),
        }
        assert_eq!(terminator.calls(), 1);
        assert_eq!(controller.completions(), 0);
    }

    /// A slow `close()` on cancellation must not hold up the drain timeout
    #[test]
    fn test_slow_close_does_not_stall_drain_timeout() {
        let source = Arc::new(
            StallingSource::new(&["A"]).with_close_delay(Duration::from_secs(5)),
        );
        let task = Arc::new(RecordingTask::default().with_delay(Duration::from_secs(8)));
        let controller = Arc::new(RecordingController::new(1));
        let (gate, terminator) = recording_gate();
        let cancel = CancellationToken::new();

        let dispatcher = DispatcherBuilder::<String>::new(
            source.clone(),
            task.clone(),
            controller.clone(),
        )
        .queue_depth(2)
        .parallelism(1)
        .cancellation(cancel.clone())
        .gate(gate)
        .build()
        .unwrap();
        let handle = spawn_run(dispatcher);

        assert!(wait_until(WAIT, || task.order().len() == 1));
        thread::sleep(Duration::from_millis(100));
        let cancelled_at = Instant::now();
        cancel.cancel();

        let result = handle.join().unwrap();
        let elapsed = cancelled_at.elapsed();

        assert!(
            matches!(result, Err(DispatcherError::DrainTimeout { timeout_secs: 1 })),
            "unexpected result: {result:?}"
        );
        assert!(elapsed < Duration::from_secs(3), "drain timeout of 1s took {elapsed:?}");
        assert_eq!(source.close_calls(), 1);
        assert_eq!(terminator.calls(), 1);
        assert_eq!(controller.completions(), 0);
    }

    /// A failing `close()` at shutdown is fatal and labelled as source-close
    #[test]
    fn test_close_failure_is_fatal() {
        let source = Arc::new(StallingSource::new(&["A", "B"]).ending().failing_close());
        let controller = Arc::new(RecordingController::new(5));
        let (gate, terminator) = recording_gate();

        let result = DispatcherBuilder::<String>::new(
            source.clone(),
            Arc::new(RecordingTask::default()),
            controller.clone(),
        )
        .queue_depth(2)
        .parallelism(2)
        .gate(gate)
        .build()
        .unwrap()
        .run();

        match result {
            Err(err @ DispatcherError::SourceClose(_)) => {
                assert_eq!(err.phase(), Phase::SourceClose)
            }
            other => panic!("expected close failure, got {other:?}"),
        }
        assert_eq!(source.close_calls(), 1);
        assert_eq!(terminator.calls(), 1);
        assert_eq!(controller.completions(), 0);
    }

    /// Exhaustion ends the run normally
    #[test]
    fn test_exhausted_source_completes() {
        let source = Arc::new(
            MockSource::new("xy", items(&["x", "y"])).with_end(EndSignal::Exhausted),
        );
        let task = Arc::new(RecordingTask::default());
        let controller = Arc::new(RecordingController::new(5));
        let (gate, terminator) = recording_gate();

        let summary = DispatcherBuilder::<String>::new(source.clone(), task, controller.clone())
            .queue_depth(4)
            .parallelism(2)
            .gate(gate)
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(summary.metrics.dispatched, 2);
        assert_eq!(source.close_calls(), 1);
        assert_eq!(controller.completions(), 1);
        assert_eq!(terminator.calls(), 0);
    }

    /// A transport error on the pull thread is fatal
    #[test]
    fn test_source_transport_error_is_fatal() {
        let task = Arc::new(RecordingTask::default());
        let controller = Arc::new(RecordingController::new(5));
        let (gate, terminator) = recording_gate();

        let result = DispatcherBuilder::<String>::new(
            Arc::new(BrokenSource::new(2)),
            task,
            controller.clone(),
        )
        .queue_depth(4)
        .parallelism(2)
        .gate(gate)
        .build()
        .unwrap()
        .run();

        match result {
            Err(err @ DispatcherError::Source(_)) => assert_eq!(err.phase(), Phase::PullLoop),
            other => panic!("expected source error, got {other:?}"),
        }
        assert_eq!(terminator.calls(), 1);
        assert_eq!(controller.completions(), 0);
    }

    /// A panicking completion callback is caught and escalated
    #[test]
    fn test_task_complete_panic_is_fatal() {
        let controller = Arc::new(RecordingController::new(5).panicking());
        let (gate, terminator) = recording_gate();

        let result = DispatcherBuilder::<String>::new(
            Arc::new(MockSource::numbered(2)),
            Arc::new(RecordingTask::default()),
            controller,
        )
        .queue_depth(2)
        .parallelism(1)
        .gate(gate)
        .build()
        .unwrap()
        .run();

        assert!(matches!(
            result,
            Err(DispatcherError::Panicked {
                phase: Phase::TaskComplete,
                ..
            })
        ));
        assert_eq!(terminator.calls(), 1);
    }

    /// Cancellation while `next()` blocks closes the source and completes
    #[test]
    fn test_cancel_while_blocked_in_next() {
        let (_tx, source) = ChannelSource::<String>::bounded(4);
        let source = Arc::new(source);
        let controller = Arc::new(RecordingController::new(5));
        let (gate, terminator) = recording_gate();
        let cancel = CancellationToken::new();

        let dispatcher = DispatcherBuilder::<String>::new(
            source.clone(),
            Arc::new(RecordingTask::default()),
            controller.clone(),
        )
        .queue_depth(2)
        .parallelism(2)
        .cancellation(cancel.clone())
        .gate(gate)
        .build()
        .unwrap();
        let handle = spawn_run(dispatcher);

        thread::sleep(Duration::from_millis(100));
        assert!(!handle.is_finished());
        cancel.cancel();

        assert!(wait_until(WAIT, || handle.is_finished()));
        let summary = handle.join().unwrap().unwrap();
        assert_eq!(summary.metrics.dispatched, 0);
        assert!(source.is_closed());
        assert_eq!(controller.completions(), 1);
        assert_eq!(terminator.calls(), 0);
    }

    /// Cancellation while waiting for a slot: loop continues to the closed source
    #[test]
    fn test_cancel_while_blocked_in_acquire() {
        let source = Arc::new(MockSource::numbered(5));
        let (release, task) = GatedTask::new();
        let task = Arc::new(task);
        let controller = Arc::new(RecordingController::new(5));
        let (gate, terminator) = recording_gate();
        let cancel = CancellationToken::new();

        let dispatcher = DispatcherBuilder::<String>::new(
            source.clone(),
            task.clone(),
            controller.clone(),
        )
        .queue_depth(1)
        .parallelism(1)
        .cancellation(cancel.clone())
        .gate(gate)
        .build()
        .unwrap();
        let handle = spawn_run(dispatcher);

        assert!(wait_until(WAIT, || task.started().len() == 1));
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
        assert!(wait_until(WAIT, || source.is_closed()));

        release.send_blocking(()).unwrap();

        let summary = handle.join().unwrap().unwrap();
        assert_eq!(summary.metrics.dispatched, 1);
        assert_eq!(source.close_calls(), 1);
        assert_eq!(controller.completions(), 1);
        assert_eq!(terminator.calls(), 0);
        assert!(cancel.is_cancelled());
    }

    /// Disabled source goes straight to shutdown
    #[test]
    fn test_disabled_source() {
        let source = Arc::new(MockSource::numbered(3).disabled());
        let controller = Arc::new(RecordingController::new(5));
        let (gate, _) = recording_gate();

        let summary = DispatcherBuilder::<String>::new(
            source.clone(),
            Arc::new(RecordingTask::default()),
            controller.clone(),
        )
        .gate(gate)
        .build()
        .unwrap()
        .run()
        .unwrap();

        assert_eq!(summary.metrics.dispatched, 0);
        assert_eq!(source.pulls(), 0);
        assert_eq!(source.remaining(), 3);
        assert_eq!(controller.completions(), 1);
    }
}

#[cfg(test)]
mod config_e2e_tests {
    use std::collections::BTreeSet;
    use std::io::Write;
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use dispatcher::{build_task, DispatcherBuilder};

    use crate::fakes::{recording_gate, RecordingController};

    /// TOML job: lines source -> file task, every line written once
    #[test]
    fn test_lines_to_file_job() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        let output = dir.path().join("out").join("result.txt");

        let mut file = std::fs::File::create(&input).unwrap();
        for i in 0..30 {
            writeln!(file, "line-{i}").unwrap();
        }
        drop(file);

        let toml = format!(
            r#"
            [feeder]
            queue_depth = 4
            parallelism = 3

            [source]
            source_type = "lines"
            params = {{ path = "{}" }}

            [task]
            task_type = "file"
            shutdown_timeout_secs = 10
            params = {{ path = "{}" }}
            "#,
            input.display(),
            output.display()
        );
        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let source = sources::build_source(&blueprint.source).unwrap();
        let task = build_task(&blueprint.task).unwrap();
        let controller = Arc::new(RecordingController::new(
            blueprint.task.shutdown_timeout_secs,
        ));
        let (gate, terminator) = recording_gate();

        let summary = DispatcherBuilder::<String>::new(source, Arc::clone(&task), controller.clone())
            .feeder_config(&blueprint.feeder)
            .gate(gate)
            .build()
            .unwrap()
            .run()
            .unwrap();
        task.flush().unwrap();

        assert_eq!(summary.metrics.dispatched, 30);
        assert!(summary.metrics.peak_in_flight <= 4);
        assert_eq!(controller.completions(), 1);
        assert_eq!(terminator.calls(), 0);

        let written: BTreeSet<String> = std::fs::read_to_string(&output)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        let expected: BTreeSet<String> = (0..30).map(|i| format!("line-{i}")).collect();
        assert_eq!(written, expected);
    }
}
