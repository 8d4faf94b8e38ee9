use event_actors::{
    Actor, ActorContext, ActorError, ActorExt, ActorHandle, ActorResult, Behavior, ExitReason,
    Handled,
};

/// Simple Ping-Pong example demonstrating bidirectional actor communication.
///
/// This example shows:
/// - Two actors communicating with each other
/// - Passing a reply handle inside the message payload
/// - Finishing both sides with user-defined exit reasons

const ROUNDS: u32 = 10;

// Pong actor - answers every ping through the handle it carries
#[derive(Default)]
struct PongActor {
    pings_received: u32,
}

impl Actor for PongActor {
    fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
        ctx.become_behavior(Behavior::new(|pong: &mut PongActor, msg, ctx| {
            let Some((tag, reply_to)) = msg.values::<(&'static str, ActorHandle)>() else {
                return Ok(Handled::Skipped);
            };
            match *tag {
                "ping" => {
                    pong.pings_received += 1;
                    let reply = ctx.message(("pong", ctx.self_handle()));
                    reply_to
                        .deliver_from(ctx.actor_id().clone(), reply)
                        .map_err(|e| ActorError::user(e.to_string()))?;
                    Ok(Handled::Consumed)
                }
                "done" => Err(ctx.quit(ExitReason::User(pong.pings_received))),
                _ => Ok(Handled::Skipped),
            }
        }));
        Ok(())
    }
}

// Ping actor
struct PingActor {
    pong: ActorHandle,
    pongs_received: u32,
}

impl Actor for PingActor {
    fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
        // Serve the first ball before any pong can arrive.
        let serve = ctx.message(("ping", ctx.self_handle()));
        self.pong
            .deliver(serve)
            .map_err(|e| ActorError::user(e.to_string()))?;

        ctx.become_behavior(Behavior::new(|ping: &mut PingActor, msg, ctx| {
            if msg.get_as::<&'static str>(0) != Some(&"pong") {
                return Ok(Handled::Skipped);
            }
            ping.pongs_received += 1;
            let tag = if ping.pongs_received < ROUNDS { "ping" } else { "done" };
            let next = ctx.message((tag, ctx.self_handle()));
            ping.pong
                .deliver(next)
                .map_err(|e| ActorError::user(e.to_string()))?;
            if tag == "done" {
                return Err(ctx.quit(ExitReason::User(ping.pongs_received)));
            }
            Ok(Handled::Consumed)
        }));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Spawn pong first
    let pong = PongActor::default().spawn_actor("pong", ())?;

    // Spawn ping with reference to pong
    let ping = PingActor {
        pong: pong.clone(),
        pongs_received: 0,
    }
    .spawn_actor("ping", ())?;

    let ping_exit = ping.wait_for_exit().await;
    let pong_exit = pong.wait_for_exit().await;
    println!("Ping actor finished: {ping_exit}");
    println!("Pong actor finished: {pong_exit}");

    Ok(())
}
