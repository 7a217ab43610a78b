use eventloop::{
    Error, EventLoopGroup, EventLoopRef, Future, LazyFuture, MainContext, ThreadEventLoopGroup,
    lazy, sync_flatten, sync_flatten_void,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("step {0} failed")]
struct StepError(u32);

// A step that counts its invocation and resolves to `outcome`.
fn counted_step(
    event_loop: &EventLoopRef,
    invoked: &Arc<AtomicUsize>,
    outcome: Result<u32, u32>,
) -> LazyFuture<u32> {
    let event_loop = event_loop.clone();
    let invoked = invoked.clone();

    lazy(move || {
        invoked.fetch_add(1, Ordering::SeqCst);
        Ok::<_, Error>(match outcome {
            Ok(value) => event_loop.make_succeeded_future(value),
            Err(code) => event_loop.make_failed_future(Error::new(StepError(code))),
        })
    })
}

#[test]
fn test_sync_flatten_collects_in_order() {
    let main = MainContext::builder().build();
    let event_loop = main.event_loop();
    let invoked = Arc::new(AtomicUsize::new(0));

    let steps = vec![
        counted_step(&event_loop, &invoked, Ok(1)),
        counted_step(&event_loop, &invoked, Ok(2)),
        counted_step(&event_loop, &invoked, Ok(3)),
    ];
    let chain = sync_flatten(steps, &event_loop);

    assert_eq!(main.run_until(&chain).unwrap(), vec![1, 2, 3]);
    assert_eq!(invoked.load(Ordering::SeqCst), 3);
}

#[test]
fn test_sync_flatten_stops_at_failed_future() {
    let main = MainContext::builder().build();
    let event_loop = main.event_loop();
    let invoked = Arc::new(AtomicUsize::new(0));

    let steps = vec![
        counted_step(&event_loop, &invoked, Ok(1)),
        counted_step(&event_loop, &invoked, Err(2)),
        counted_step(&event_loop, &invoked, Ok(3)),
    ];
    let chain = sync_flatten(steps, &event_loop);

    let error = main.run_until(&chain).unwrap_err();
    assert_eq!(error.downcast_ref::<StepError>(), Some(&StepError(2)));

    main.run_until_idle();
    assert_eq!(
        invoked.load(Ordering::SeqCst),
        2,
        "Steps after the failure must never be invoked"
    );
}

#[test]
fn test_sync_flatten_stops_at_synchronous_error() {
    let main = MainContext::builder().build();
    let event_loop = main.event_loop();
    let invoked = Arc::new(AtomicUsize::new(0));

    let steps = vec![
        counted_step(&event_loop, &invoked, Ok(1)),
        lazy(|| Err::<Future<u32>, _>(Error::new(StepError(9)))),
        counted_step(&event_loop, &invoked, Ok(3)),
    ];
    let chain = sync_flatten(steps, &event_loop);

    let error = main.run_until(&chain).unwrap_err();
    assert_eq!(error.downcast_ref::<StepError>(), Some(&StepError(9)));
    assert_eq!(invoked.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sync_flatten_runs_steps_one_after_another() {
    let group = ThreadEventLoopGroup::new(3).unwrap();
    let delays = [40u64, 30, 20];
    let spans = Arc::new(Mutex::new(Vec::new()));

    let steps: Vec<LazyFuture<u64>> = delays
        .iter()
        .map(|&delay| {
            let event_loop = group.next();
            let spans = spans.clone();
            lazy(move || {
                let started = Instant::now();
                let future = event_loop
                    .schedule_task_in(Duration::from_millis(delay), move || {
                        spans.lock().unwrap().push((started, Instant::now()));
                        Ok::<_, Error>(delay)
                    })
                    .future();
                Ok::<_, Error>(future)
            })
        })
        .collect();

    let start = Instant::now();
    let values = sync_flatten(steps, &group).wait().unwrap();
    let elapsed = start.elapsed();

    assert_eq!(values, vec![40, 30, 20]);
    assert!(
        elapsed >= Duration::from_millis(90),
        "Sequential steps should take at least the sum of their delays, took {elapsed:?}"
    );

    let spans = spans.lock().unwrap();
    for pair in spans.windows(2) {
        assert!(
            pair[1].0 >= pair[0].1,
            "A step must not start before the previous one finished"
        );
    }
}

#[test]
fn test_sync_flatten_empty_input() {
    let main = MainContext::builder().build();
    let event_loop = main.event_loop();

    let chain = sync_flatten(Vec::<LazyFuture<u32>>::new(), &event_loop);

    assert!(chain.is_settled(), "Empty input should settle immediately");
    assert_eq!(main.run_until_idle(), 0, "Empty input should schedule no work");
    assert_eq!(main.run_until(&chain).unwrap(), Vec::<u32>::new());
}

#[test]
fn test_sync_flatten_void_collapses() {
    let main = MainContext::builder().build();
    let event_loop = main.event_loop();
    let order = Arc::new(Mutex::new(Vec::new()));

    let steps: Vec<LazyFuture<()>> = (0..3)
        .map(|index| {
            let event_loop = event_loop.clone();
            let order = order.clone();
            lazy(move || {
                order.lock().unwrap().push(index);
                Ok::<_, Error>(event_loop.make_succeeded_future(()))
            })
        })
        .collect();

    let done = sync_flatten_void(steps, &event_loop);

    assert!(main.run_until(&done).is_ok());
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}
