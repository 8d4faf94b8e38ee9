use event_actors::{
    Actor, ActorConfig, ActorContext, ActorExt, ActorResult, Behavior, ExitReason, Handled,
};

#[derive(Default)]
struct Counter {
    value: i64,
}

impl Actor for Counter {
    fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
        ctx.become_behavior(Behavior::new(|counter: &mut Counter, msg, ctx| {
            if let Some((delta,)) = msg.values::<(i64,)>() {
                counter.value += delta;
                return Ok(Handled::Consumed);
            }
            match msg.values::<(&'static str,)>() {
                Some(("get",)) => {
                    println!("counter value: {}", counter.value);
                    Ok(Handled::Consumed)
                }
                Some(("stop",)) => Err(ctx.quit(ExitReason::User(counter.value as u32))),
                _ => Ok(Handled::Skipped),
            }
        }));
        Ok(())
    }

    fn on_exit(&mut self, ctx: &mut ActorContext<Self>) {
        println!("{} stopping at {}", ctx.actor_id(), self.value);
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let handle = Counter::default().spawn_actor("counter", ActorConfig::default())?;
    handle.notify((2i64,))?;
    handle.notify((2i64,))?;
    handle.notify(("get",))?;
    handle.notify(("stop",))?;
    let reason = handle.wait_for_exit().await;
    println!("counter exited: {reason} (code {:#x})", reason.code());
    Ok(())
}
