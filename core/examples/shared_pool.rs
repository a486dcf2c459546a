//! Fans three sub-tasks out on the crate's shared thread pool and combines
//! their results.

use taskflow::errors::TaskError;
use taskflow::scheduler::ThreadPoolScheduler;
use taskflow::task::Task;

fn priced_part(name: &'static str, price: u32) -> Task<u32> {
    Task::labeled(name, move |_ctx| async move {
        println!("[{name}] quoting {price}");
        Ok(price)
    })
}

fn main() -> Result<(), TaskError> {
    let quote = Task::labeled("quote", |ctx| async move {
        let frame = ctx.run(priced_part("frame", 320)).await?;
        let wheels = ctx.run(priced_part("wheels", 80)).await?;
        let saddle = ctx.run(priced_part("saddle", 45)).await?;
        Ok(frame + wheels + saddle)
    });

    let total = quote.sync_wait(ThreadPoolScheduler::shared())?;
    println!("[main] total: {total}");
    Ok(())
}
