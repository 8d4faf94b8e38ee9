//! Drives `ScheduledActor::resume` by hand, without the Tokio scheduler.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use event_actors::{
    Actor, ActorConfig, ActorContext, ActorError, ActorResult, ActorState, Behavior, ExitReason,
    Handled, Resumed, ScheduledActor, SendError,
};

/// Reschedule hook that only counts wake-ups.
fn counting_hook() -> (Arc<AtomicUsize>, Arc<dyn event_actors::Reschedule>) {
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = wakes.clone();
    (
        wakes,
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    )
}

/// Reschedule hook that forwards wake-ups to a channel.
fn channel_hook() -> (Receiver<()>, Arc<dyn event_actors::Reschedule>) {
    let (tx, rx) = unbounded();
    (
        rx,
        Arc::new(move || {
            let _ = tx.send(());
        }),
    )
}

#[derive(Default)]
struct Recorder {
    seen: Vec<u32>,
    exits: usize,
}

impl Recorder {
    fn accept_all() -> Behavior<Recorder> {
        Behavior::new(|recorder: &mut Recorder, msg, _| match msg.get_as::<u32>(0) {
            Some(value) => {
                recorder.seen.push(*value);
                Ok(Handled::Consumed)
            }
            None => Ok(Handled::Skipped),
        })
    }
}

impl Actor for Recorder {
    fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
        ctx.become_behavior(Recorder::accept_all());
        Ok(())
    }

    fn on_exit(&mut self, _ctx: &mut ActorContext<Self>) {
        self.exits += 1;
    }
}

fn recorder(reschedule: Arc<dyn event_actors::Reschedule>) -> ScheduledActor<Recorder> {
    ScheduledActor::new("recorder", Recorder::default(), (), reschedule)
}

#[test]
fn consumes_message_then_parks() {
    let (wakes, hook) = counting_hook();
    let mut actor = recorder(hook);
    let handle = actor.handle();

    handle.notify((1u32,)).unwrap();
    assert_eq!(wakes.load(Ordering::SeqCst), 0, "running actors are not rescheduled");

    assert_eq!(actor.resume(), Resumed::Parked);
    assert_eq!(actor.actor().seen, [1]);
    assert_eq!(actor.state(), ActorState::Blocked);

    handle.notify((2u32,)).unwrap();
    handle.notify((3u32,)).unwrap();
    assert_eq!(wakes.load(Ordering::SeqCst), 1, "only the first enqueue wakes");
    assert_eq!(actor.state(), ActorState::Running);

    assert_eq!(actor.resume(), Resumed::Parked);
    assert_eq!(actor.actor().seen, [1, 2, 3]);
}

#[test]
fn empty_behavior_stack_finishes_normally_once() {
    struct Idle {
        exits: usize,
    }

    impl Actor for Idle {
        fn init(&mut self, _ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            Ok(())
        }

        fn on_exit(&mut self, _ctx: &mut ActorContext<Self>) {
            self.exits += 1;
        }
    }

    let (_wakes, hook) = counting_hook();
    let mut actor = ScheduledActor::new("idle", Idle { exits: 0 }, (), hook);

    assert_eq!(actor.resume(), Resumed::Done(ExitReason::Normal));
    assert_eq!(actor.resume(), Resumed::Done(ExitReason::Normal));
    assert_eq!(actor.actor().exits, 1);
    assert_eq!(actor.exit_reason(), Some(ExitReason::Normal));
    assert_eq!(actor.state(), ActorState::Done);
}

#[test]
fn skipped_messages_are_retried_after_behavior_change() {
    #[derive(Default)]
    struct Gate {
        log: Vec<String>,
    }

    fn closed() -> Behavior<Gate> {
        Behavior::new(|gate: &mut Gate, msg, ctx| {
            match msg.values::<(&'static str,)>() {
                Some(("open",)) => {
                    gate.log.push("open".into());
                    ctx.become_behavior(opened());
                    Ok(Handled::Consumed)
                }
                _ => Ok(Handled::Skipped),
            }
        })
    }

    fn opened() -> Behavior<Gate> {
        Behavior::new(|gate: &mut Gate, msg, ctx| {
            if let Some((value,)) = msg.values::<(u8,)>() {
                gate.log.push(value.to_string());
                return Ok(Handled::Consumed);
            }
            if msg.values::<(&'static str,)>() == Some(&("close",)) {
                gate.log.push("close".into());
                ctx.unbecome();
                return Ok(Handled::Consumed);
            }
            Ok(Handled::Skipped)
        })
    }

    impl Actor for Gate {
        fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            ctx.become_behavior(closed());
            Ok(())
        }
    }

    let (_wakes, hook) = counting_hook();
    let mut actor = ScheduledActor::new("gate", Gate::default(), (), hook);
    let handle = actor.handle();

    handle.notify((1u8,)).unwrap();
    handle.notify((2u8,)).unwrap();
    assert_eq!(actor.resume(), Resumed::Parked);
    assert!(actor.actor().log.is_empty());
    assert_eq!(actor.cached_messages(), 2);

    handle.notify(("open",)).unwrap();
    handle.notify(("close",)).unwrap();
    handle.notify((3u8,)).unwrap();
    assert_eq!(actor.resume(), Resumed::Parked);

    assert_eq!(actor.actor().log, ["open", "1", "2", "close"]);
    assert_eq!(actor.cached_messages(), 1);
    assert_eq!(actor.context().behavior_depth(), 1);
}

#[test]
fn handler_error_finishes_with_unhandled_fault() {
    struct Faulty;

    impl Actor for Faulty {
        fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            ctx.become_behavior(Behavior::new(|_, _, ctx| {
                ctx.become_behavior(Behavior::new(|_, _, _| Ok(Handled::Consumed)));
                Err(ActorError::user("boom"))
            }));
            Ok(())
        }
    }

    let (_wakes, hook) = counting_hook();
    let mut actor = ScheduledActor::new("faulty", Faulty, (), hook);
    let handle = actor.handle();
    handle.notify((0u8,)).unwrap();

    assert_eq!(actor.resume(), Resumed::Done(ExitReason::UnhandledFault));
    assert_eq!(actor.context().behavior_depth(), 0);
    assert_eq!(actor.context().last_error(), Some(&ActorError::user("boom")));
    assert_eq!(handle.notify((0u8,)), Err(SendError::Closed));
}

#[test]
fn panicking_handler_finishes_with_unhandled_fault() {
    struct Panicky;

    impl Actor for Panicky {
        fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            ctx.become_behavior(Behavior::new(|_, _, _| panic!("handler exploded")));
            Ok(())
        }
    }

    let (_wakes, hook) = counting_hook();
    let mut actor = ScheduledActor::new("panicky", Panicky, (), hook);
    actor.handle().notify((0u8,)).unwrap();

    assert_eq!(actor.resume(), Resumed::Done(ExitReason::UnhandledFault));
    assert_eq!(
        actor.context().last_error(),
        Some(&ActorError::Panic("handler exploded".into()))
    );
}

#[test]
fn quit_finishes_with_the_requested_reason() {
    struct Quitter;

    impl Actor for Quitter {
        fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            ctx.become_behavior(Behavior::new(|_, msg, ctx| {
                let code = *msg.get_as::<u32>(0).unwrap_or(&0);
                Err(ctx.quit(ExitReason::User(code)))
            }));
            Ok(())
        }
    }

    let (_wakes, hook) = counting_hook();
    let mut actor = ScheduledActor::new("quitter", Quitter, (), hook);
    let handle = actor.handle();
    handle.notify((42u32,)).unwrap();
    handle.notify((7u32,)).unwrap();

    assert_eq!(actor.resume(), Resumed::Done(ExitReason::User(42)));
    assert_eq!(ExitReason::User(42).code(), 0x1002a);
    assert!(actor.context().last_error().is_none());
    assert_eq!(handle.exit_reason(), Some(ExitReason::User(42)));
}

#[test]
fn quit_is_honored_even_if_the_error_is_dropped() {
    struct Stubborn;

    impl Actor for Stubborn {
        fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            ctx.become_behavior(Behavior::new(|_, _, ctx| {
                let _ = ctx.quit(ExitReason::User(1));
                Ok(Handled::Consumed)
            }));
            Ok(())
        }
    }

    let (_wakes, hook) = counting_hook();
    let mut actor = ScheduledActor::new("stubborn", Stubborn, (), hook);
    actor.handle().notify((0u8,)).unwrap();

    assert_eq!(actor.resume(), Resumed::Done(ExitReason::User(1)));
}

#[test]
fn synchronous_receive_is_an_unallowed_call() {
    struct Blocking;

    impl Actor for Blocking {
        fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            ctx.become_behavior(Behavior::new(|_, _, ctx| {
                // Swallowing the error does not keep the actor alive.
                let _ = ctx.receive(Behavior::new(|_, _, _| Ok(Handled::Consumed)));
                Ok(Handled::Consumed)
            }));
            Ok(())
        }
    }

    let (_wakes, hook) = counting_hook();
    let mut actor = ScheduledActor::new("blocking", Blocking, (), hook);
    actor.handle().notify((0u8,)).unwrap();

    assert_eq!(
        actor.resume(),
        Resumed::Done(ExitReason::UnallowedFunctionCall)
    );
    assert_eq!(ExitReason::UnallowedFunctionCall.code(), 0x3);
}

#[test]
fn quit_from_init_skips_message_processing() {
    struct Early;

    impl Actor for Early {
        fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            ctx.become_behavior(Behavior::new(|_, _, _| {
                unreachable!("no message may be handled")
            }));
            Err(ctx.quit(ExitReason::User(5)))
        }
    }

    let (_wakes, hook) = counting_hook();
    let mut actor = ScheduledActor::new("early", Early, (), hook);
    actor.handle().notify((0u8,)).unwrap();

    assert_eq!(actor.resume(), Resumed::Done(ExitReason::User(5)));
    assert_eq!(actor.context().behavior_depth(), 0);
}

#[test]
fn zero_timeout_fires_once_then_next_behavior_matches() {
    #[derive(Default)]
    struct Poller {
        timeouts: usize,
        matched: Vec<u8>,
    }

    impl Actor for Poller {
        fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            ctx.become_behavior(
                Behavior::new(|_, _, _| Ok(Handled::Skipped)).with_timeout(
                    Duration::ZERO,
                    |poller: &mut Poller, ctx| {
                        poller.timeouts += 1;
                        ctx.replace_behavior(Behavior::new(|poller: &mut Poller, msg, _| {
                            poller.matched.push(*msg.get_as::<u8>(0).unwrap_or(&0));
                            Ok(Handled::Consumed)
                        }));
                        Ok(())
                    },
                ),
            );
            Ok(())
        }
    }

    let (_wakes, hook) = counting_hook();
    let mut actor = ScheduledActor::new("poller", Poller::default(), (), hook);
    let handle = actor.handle();
    handle.notify((4u8,)).unwrap();

    assert_eq!(actor.resume(), Resumed::Parked);
    assert_eq!(actor.actor().timeouts, 1);
    assert_eq!(actor.actor().matched, [4]);

    handle.notify((5u8,)).unwrap();
    assert_eq!(actor.resume(), Resumed::Parked);
    assert_eq!(actor.actor().timeouts, 1);
    assert_eq!(actor.actor().matched, [4, 5]);
}

#[test]
fn non_zero_timeout_without_runtime_is_a_fault() {
    struct Sleepy;

    impl Actor for Sleepy {
        fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            ctx.become_behavior(
                Behavior::new(|_, _, _| Ok(Handled::Consumed))
                    .with_timeout(Duration::from_millis(5), |_: &mut Sleepy, _| Ok(())),
            );
            Ok(())
        }
    }

    let (_wakes, hook) = counting_hook();
    let mut actor = ScheduledActor::new("sleepy", Sleepy, (), hook);
    assert_eq!(actor.resume(), Resumed::Done(ExitReason::UnhandledFault));
    assert!(matches!(
        actor.context().last_error(),
        Some(ActorError::Timer(_))
    ));
}

/// Skips every message and quits with `User(1)` when its timeout fires.
struct Impatient;

impl Actor for Impatient {
    fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
        ctx.become_behavior(
            Behavior::new(|_, _, _| Ok(Handled::Skipped))
                .with_timeout(Duration::ZERO, |_: &mut Impatient, ctx| {
                    Err(ctx.quit(ExitReason::User(1)))
                }),
        );
        Ok(())
    }
}

#[test]
fn zero_timeout_fires_on_a_full_bounded_mailbox() {
    let (_wakes, hook) = counting_hook();
    let config = ActorConfig::default().with_mailbox_capacity(1);
    let mut actor = ScheduledActor::new("impatient", Impatient, config, hook);
    let handle = actor.handle();
    handle.notify((0u8,)).unwrap();
    assert_eq!(handle.notify((1u8,)), Err(SendError::Full));

    assert_eq!(actor.resume(), Resumed::Done(ExitReason::User(1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timer_fires_while_bounded_mailbox_is_full() {
    struct Waiting;

    impl Actor for Waiting {
        fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            ctx.become_behavior(
                Behavior::new(|_, _, _| Ok(Handled::Skipped)).with_timeout(
                    Duration::from_millis(20),
                    |_: &mut Waiting, ctx| Err(ctx.quit(ExitReason::User(2))),
                ),
            );
            Ok(())
        }
    }

    let (wakes, hook) = counting_hook();
    let config = ActorConfig::default().with_mailbox_capacity(1);
    let mut actor = ScheduledActor::new("waiting", Waiting, config, hook);
    let handle = actor.handle();
    assert_eq!(actor.resume(), Resumed::Parked);

    handle.notify((0u8,)).unwrap();
    assert_eq!(wakes.load(Ordering::SeqCst), 1);
    assert_eq!(handle.notify((1u8,)), Err(SendError::Full));

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(handle.mailbox_len(), 1);
    assert_eq!(actor.resume(), Resumed::Done(ExitReason::User(2)));
}

#[test]
fn on_exit_sees_an_empty_stack() {
    struct Observer {
        depth_at_exit: Option<usize>,
    }

    impl Actor for Observer {
        fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
            ctx.become_behavior(Behavior::new(|_, _, _| Ok(Handled::Consumed)));
            ctx.become_behavior(Behavior::new(|_, _, ctx| Err(ctx.quit(ExitReason::User(9)))));
            Ok(())
        }

        fn on_exit(&mut self, ctx: &mut ActorContext<Self>) {
            self.depth_at_exit = Some(ctx.behavior_depth());
        }
    }

    let (_wakes, hook) = counting_hook();
    let mut actor = ScheduledActor::new("observer", Observer { depth_at_exit: None }, (), hook);
    actor.handle().notify((0u8,)).unwrap();

    assert_eq!(actor.resume(), Resumed::Done(ExitReason::User(9)));
    assert_eq!(actor.actor().depth_at_exit, Some(0));
}

#[test]
fn concurrent_producers_never_lose_a_wakeup() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 2_000;

    let (wakeups, hook) = channel_hook();
    let config = ActorConfig::default().with_fetch_batch(16);
    let mut actor = ScheduledActor::new("sink", Recorder::default(), config, hook);
    let handle = actor.handle();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let handle = handle.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    handle.notify((producer * PER_PRODUCER + i,)).unwrap();
                    if i % 64 == 0 {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    // Consumer: resume until parked, then wait for the next wake-up.
    let expected = (PRODUCERS * PER_PRODUCER) as usize;
    assert_eq!(actor.resume(), Resumed::Parked);
    while actor.actor().seen.len() < expected {
        wakeups
            .recv_timeout(Duration::from_secs(5))
            .expect("lost wake-up");
        assert_eq!(actor.resume(), Resumed::Parked);
    }
    for producer in producers {
        producer.join().unwrap();
    }
    // A producer can wake the actor after it already drained that
    // producer's message; settle those wake-ups before checking the state.
    while wakeups.try_recv().is_ok() {
        assert_eq!(actor.resume(), Resumed::Parked);
    }

    let mut seen = actor.actor().seen.clone();
    seen.sort_unstable();
    assert_eq!(seen, (0..PRODUCERS * PER_PRODUCER).collect::<Vec<_>>());
    assert_eq!(actor.state(), ActorState::Blocked);
    assert!(wakeups.try_recv().is_err(), "no wake-up without a pending message");
}

#[test]
fn per_producer_order_is_preserved() {
    let (wakeups, hook) = channel_hook();
    let mut actor = recorder(hook);
    let handle = actor.handle();
    assert_eq!(actor.resume(), Resumed::Parked);

    let producer = thread::spawn(move || {
        for i in 0..500u32 {
            handle.notify((i,)).unwrap();
        }
    });
    while actor.actor().seen.len() < 500 {
        wakeups.recv_timeout(Duration::from_secs(5)).unwrap();
        actor.resume();
    }
    producer.join().unwrap();
    assert!(actor.actor().seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(actor.actor().exits, 0);
}
