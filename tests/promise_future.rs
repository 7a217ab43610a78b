use eventloop::{Error, EventLoopGroup, FutureResult, MainContext, ThreadEventLoopGroup};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("boom {0}")]
struct Boom(u32);

#[test]
fn test_awaiters_run_in_registration_order_on_owning_loop() {
    let main = MainContext::builder().build();
    let event_loop = main.event_loop();
    let promise = event_loop.make_promise::<u32>();
    let future = promise.future();
    let calls = Arc::new(Mutex::new(Vec::new()));

    for index in 0..5 {
        let calls = calls.clone();
        let event_loop = event_loop.clone();
        future.add_awaiter(move |result| {
            assert!(
                event_loop.in_event_loop(),
                "Awaiter should run on the owning loop"
            );
            calls.lock().unwrap().push((index, result.value().copied()));
        });
    }

    // Settled from another thread; delivery still happens on the main context.
    thread::spawn(move || promise.succeed(9)).join().unwrap();
    assert!(
        calls.lock().unwrap().is_empty(),
        "Awaiters must not run before the loop is pumped"
    );

    main.run_until_idle();

    let expected: Vec<_> = (0..5).map(|index| (index, Some(9))).collect();
    assert_eq!(*calls.lock().unwrap(), expected);
}

#[test]
fn test_each_awaiter_runs_exactly_once() {
    let main = MainContext::builder().build();
    let promise = main.event_loop().make_promise::<&'static str>();
    let future = promise.future();
    let count = Arc::new(AtomicUsize::new(0));

    for _ in 0..4 {
        let count = count.clone();
        future.add_awaiter(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }

    promise.succeed("done");
    main.run_until_idle();
    main.run_until_idle();

    assert_eq!(count.load(Ordering::SeqCst), 4);
}

#[test]
fn test_awaiter_after_settlement_is_deferred_to_loop() {
    let main = MainContext::builder().build();
    let promise = main.event_loop().make_promise::<u32>();
    let future = promise.future();
    promise.succeed(1);
    assert!(future.is_settled());

    let ran = Arc::new(Mutex::new(None));
    let ran_clone = ran.clone();
    future.add_awaiter(move |result| {
        *ran_clone.lock().unwrap() = result.value().copied();
    });

    assert_eq!(
        *ran.lock().unwrap(),
        None,
        "Awaiter must not run synchronously in the caller"
    );

    main.run_until_idle();
    assert_eq!(*ran.lock().unwrap(), Some(1));
}

#[test]
fn test_awaiter_added_during_settlement_runs_after_earlier_awaiters() {
    let group = ThreadEventLoopGroup::new(1).unwrap();
    let event_loop = group.next();
    let mut out_of_order = 0;

    for _ in 0..2_000 {
        let promise = event_loop.make_promise::<()>();
        let future = promise.future();
        let order = Arc::new(Mutex::new(Vec::new()));

        let early = order.clone();
        future.add_awaiter(move |_| early.lock().unwrap().push(1));

        // Registers as soon as the settlement becomes visible.
        let late = {
            let future = future.clone();
            let order = order.clone();
            thread::spawn(move || {
                while !future.is_settled() {
                    std::hint::spin_loop();
                }
                future.add_awaiter(move |_| order.lock().unwrap().push(2));
            })
        };

        promise.succeed_void();
        late.join().unwrap();
        future.wait().unwrap();

        if *order.lock().unwrap() != vec![1, 2] {
            out_of_order += 1;
        }
    }

    assert_eq!(
        out_of_order, 0,
        "An awaiter registered after settlement must run after the earlier ones"
    );
}

#[test]
fn test_succeed_void() {
    let main = MainContext::builder().build();
    let promise = main.event_loop().make_promise::<()>();
    let future = promise.future();

    promise.succeed_void();

    assert!(main.run_until(&future).is_ok());
}

#[test]
fn test_failure_carries_exact_error() {
    let main = MainContext::builder().build();
    let promise = main.event_loop().make_promise::<u32>();
    let future = promise.future();

    promise.fail(Error::new(Boom(3)));

    let error = main.run_until(&future).unwrap_err();
    assert_eq!(error.downcast_ref::<Boom>(), Some(&Boom(3)));
    assert_eq!(error.to_string(), "boom 3");
}

#[test]
fn test_dropped_promise_fails_future() {
    let main = MainContext::builder().build();
    let promise = main.event_loop().make_promise::<u32>();
    let future = promise.future();

    drop(promise);

    assert!(matches!(
        main.run_until(&future),
        Err(Error::PromiseDropped)
    ));
}

#[test]
fn test_map_and_try_map() {
    let main = MainContext::builder().build();
    let event_loop = main.event_loop();

    let doubled = event_loop.make_succeeded_future(21u32).map(|value| value * 2);
    assert_eq!(main.run_until(&doubled).unwrap(), 42);

    let rejected = doubled.try_map(|value| {
        if value > 10 {
            Err(Error::new(Boom(value)))
        } else {
            Ok(value)
        }
    });
    let error = main.run_until(&rejected).unwrap_err();
    assert_eq!(error.downcast_ref::<Boom>(), Some(&Boom(42)));
}

#[test]
fn test_map_skips_closure_on_error() {
    let main = MainContext::builder().build();
    let called = Arc::new(AtomicUsize::new(0));
    let called_clone = called.clone();

    let mapped = main
        .event_loop()
        .make_failed_future::<u32>(Error::new(Boom(1)))
        .map(move |value| {
            called_clone.fetch_add(1, Ordering::SeqCst);
            value
        });

    let error = main.run_until(&mapped).unwrap_err();
    assert_eq!(error.downcast_ref::<Boom>(), Some(&Boom(1)));
    assert_eq!(called.load(Ordering::SeqCst), 0);
}

#[test]
fn test_flat_map_across_loops() {
    let group = ThreadEventLoopGroup::new(2).unwrap();
    let first = group.next();
    let second = group.next();

    let chained = first
        .make_succeeded_future(2)
        .flat_map(move |value| second.make_succeeded_future(value + 1));

    assert_eq!(chained.wait().unwrap(), 3);
}

#[test]
fn test_transform_sees_errors() {
    let main = MainContext::builder().build();

    let outcome = main
        .event_loop()
        .make_failed_future::<u32>(Error::msg("bad input"))
        .transform(|result: FutureResult<u32>| Ok::<_, Error>(result.is_success()));

    assert_eq!(main.run_until(&outcome).unwrap(), false);
}

#[test]
fn test_recover_and_map_error() {
    let main = MainContext::builder().build();
    let event_loop = main.event_loop();

    let recovered = event_loop
        .make_failed_future::<u32>(Error::new(Boom(5)))
        .recover(|error| {
            let code = error.downcast_ref::<Boom>().map(|boom| boom.0);
            code.ok_or(error)
        });
    assert_eq!(main.run_until(&recovered).unwrap(), 5);

    let renamed = event_loop
        .make_failed_future::<u32>(Error::new(Boom(5)))
        .map_error(|_| Error::new(Boom(6)));
    let error = main.run_until(&renamed).unwrap_err();
    assert_eq!(error.downcast_ref::<Boom>(), Some(&Boom(6)));
}

#[test]
fn test_always_passes_result_through() {
    let main = MainContext::builder().build();
    let seen = Arc::new(Mutex::new(None));
    let seen_clone = seen.clone();

    let future = main
        .event_loop()
        .make_succeeded_future(8)
        .always(move |result| {
            *seen_clone.lock().unwrap() = result.value().copied();
        });

    assert_eq!(main.run_until(&future).unwrap(), 8);
    assert_eq!(*seen.lock().unwrap(), Some(8));
}

#[test]
fn test_hop_to_delivers_on_target_loop() {
    let main = MainContext::builder().build();
    let main_loop = main.event_loop();
    let group = ThreadEventLoopGroup::new(1).unwrap();

    let background = group.next().make_succeeded_future(11);
    let hopped = background.hop_to(&main_loop);
    assert!(hopped.event_loop().same_loop(&main_loop));

    let on_main = Arc::new(Mutex::new(false));
    let on_main_clone = on_main.clone();
    let check_loop = main_loop.clone();
    hopped.when_success(move |_| {
        *on_main_clone.lock().unwrap() = check_loop.in_event_loop();
    });

    assert_eq!(main.run_until(&hopped).unwrap(), 11);
    main.run_until_idle();
    assert!(*on_main.lock().unwrap(), "Hopped awaiters should run on the target");
}

#[test]
fn test_wait_inside_own_loop_is_refused() {
    let main = MainContext::builder().build();
    let future = main.event_loop().make_succeeded_future(1);

    assert!(matches!(future.wait(), Err(Error::WaitInEventLoop)));
}

#[test]
fn test_future_can_be_awaited() {
    let group = ThreadEventLoopGroup::new(1).unwrap();
    let promise = group.next().make_promise::<String>();
    let future = promise.future();

    let settle = thread::spawn(move || promise.succeed(String::from("hello")));
    let value = futures::executor::block_on(async move { future.await });
    settle.join().unwrap();

    assert_eq!(value.unwrap(), "hello");
}

#[test]
fn test_result_on_stopped_loop_reports_shutdown() {
    let group = ThreadEventLoopGroup::new(1).unwrap();
    let event_loop = group.next();
    group.shutdown_gracefully().unwrap();

    let promise = event_loop.make_promise::<u32>();
    let future = promise.future();
    promise.succeed(1);

    assert!(matches!(future.wait(), Err(Error::LoopShutdown)));
}

#[test]
fn test_run_until_on_stopped_loop_reports_shutdown() {
    let main = MainContext::builder().build();
    let group = ThreadEventLoopGroup::new(1).unwrap();
    let event_loop = group.next();
    group.shutdown_gracefully().unwrap();

    let promise = event_loop.make_promise::<u32>();
    let future = promise.future();
    promise.succeed(1);

    assert!(matches!(main.run_until(&future), Err(Error::LoopShutdown)));
}

#[test]
fn test_run_until_returns_when_loop_stops_while_pending() {
    let main = MainContext::builder().build();
    let group = ThreadEventLoopGroup::new(1).unwrap();
    let promise = group.next().make_promise::<u32>();
    let future = promise.future();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        group.shutdown_gracefully().unwrap();
        promise.succeed(1);
    });

    let result = main.run_until(&future);
    stopper.join().unwrap();

    assert!(matches!(result, Err(Error::LoopShutdown)));
}
