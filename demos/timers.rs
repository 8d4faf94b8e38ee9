use event_actors::{
    Actor, ActorConfig, ActorContext, ActorExt, ActorResult, Behavior, ExitReason, Handled,
};
use tokio::time::Duration;

#[derive(Default)]
struct Heartbeat {
    ticks: u32,
}

impl Actor for Heartbeat {
    fn init(&mut self, ctx: &mut ActorContext<Self>) -> ActorResult<()> {
        // Any message postpones the next beat; silence for 200ms is a beat.
        ctx.become_behavior(
            Behavior::new(|_, msg, ctx| {
                if msg.get_as::<&'static str>(0) == Some(&"stop") {
                    return Err(ctx.quit(ExitReason::Normal));
                }
                Ok(Handled::Consumed)
            })
            .with_timeout(Duration::from_millis(200), |beat: &mut Heartbeat, ctx| {
                beat.ticks += 1;
                println!("{} tick {}", ctx.actor_id(), beat.ticks);
                Ok(())
            }),
        );
        Ok(())
    }

    fn on_exit(&mut self, _ctx: &mut ActorContext<Self>) {
        println!("heartbeat ticks: {}", self.ticks);
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let actor = Heartbeat::default().spawn_actor("heartbeat", ActorConfig::default())?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    actor.notify(("stop",))?;
    actor.wait_for_exit().await;
    Ok(())
}
