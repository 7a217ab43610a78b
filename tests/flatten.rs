use eventloop::{
    Error, EventLoopGroup, Future, MainContext, ThreadEventLoopGroup, flatten, flatten_void,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("input {0} failed")]
struct InputError(u32);

#[test]
fn test_flatten_keeps_input_order() {
    let group = ThreadEventLoopGroup::new(3).unwrap();
    let completed = Arc::new(Mutex::new(Vec::new()));

    // Submitted A, B, C but completing C, B, A.
    let inputs: Vec<Future<&'static str>> = [("A", 120u64), ("B", 60), ("C", 5)]
        .into_iter()
        .map(|(name, delay)| {
            let completed = completed.clone();
            group
                .next()
                .schedule_task_in(Duration::from_millis(delay), move || {
                    completed.lock().unwrap().push(name);
                    Ok::<_, Error>(name)
                })
                .future()
        })
        .collect();

    let joined = flatten(inputs, &group).wait().unwrap();

    assert_eq!(joined, vec!["A", "B", "C"]);
    assert_eq!(*completed.lock().unwrap(), vec!["C", "B", "A"]);
}

#[test]
fn test_flatten_first_error_to_settle_wins() {
    let main = MainContext::builder().build();
    let event_loop = main.event_loop();

    let promises: Vec<_> = (0..3).map(|_| event_loop.make_promise::<u32>()).collect();
    let joined = flatten(promises.iter().map(|promise| promise.future()), &event_loop);

    let mut promises = promises.into_iter();
    let (first, second, third) = (
        promises.next().unwrap(),
        promises.next().unwrap(),
        promises.next().unwrap(),
    );

    third.fail(Error::new(InputError(2)));
    main.run_until_idle();
    first.fail(Error::new(InputError(0)));
    second.succeed(1);

    let error = main.run_until(&joined).unwrap_err();
    assert_eq!(error.downcast_ref::<InputError>(), Some(&InputError(2)));
}

#[test]
fn test_flatten_fails_without_waiting_for_the_rest() {
    let main = MainContext::builder().build();
    let event_loop = main.event_loop();

    let pending = event_loop.make_promise::<u32>();
    let failed = event_loop.make_failed_future::<u32>(Error::new(InputError(1)));
    let joined = flatten(vec![pending.future(), failed], &event_loop);

    let error = main.run_until(&joined).unwrap_err();
    assert_eq!(error.downcast_ref::<InputError>(), Some(&InputError(1)));

    pending.succeed(5);
    main.run_until_idle();
}

#[test]
fn test_flatten_empty_input() {
    let main = MainContext::builder().build();
    let event_loop = main.event_loop();

    let joined = flatten(Vec::<Future<u32>>::new(), &event_loop);

    assert!(joined.is_settled(), "Empty input should settle immediately");
    assert_eq!(main.run_until_idle(), 0, "Empty input should schedule no work");
    assert_eq!(main.run_until(&joined).unwrap(), Vec::<u32>::new());
}

#[test]
fn test_flatten_void() {
    let group = ThreadEventLoopGroup::new(2).unwrap();

    let all_ok: Vec<Future<()>> = (0..4).map(|_| Future::done(&group)).collect();
    assert!(flatten_void(all_ok, &group).wait().is_ok());

    let one_bad = vec![
        Future::done(&group),
        Future::failed(&group, Error::new(InputError(7))),
    ];
    let error = flatten_void(one_bad, &group).wait().unwrap_err();
    assert_eq!(error.downcast_ref::<InputError>(), Some(&InputError(7)));
}
