//! The classic counter: a `Loop` prototype driving a `PrintLine` body until
//! its limit, then printing "Done!".
//!
//! This example demonstrates:
//! - Registering prototypes with a builder closure
//! - Wiring a feedback loop between prototype references
//! - Driving the engine step by step
//!
//! Run with `RUST_LOG=trace cargo run --example loop` to watch instances get
//! bound and recycled.

use pulsegraph::prelude::*;

// ============================================================================
// Prototypes
// ============================================================================

/// `Increment(x) -> x + 1`
fn register_increment(engine: &mut Engine) -> Result<()> {
    engine.register_prototype("Flow", "Increment", 1, 1, |p| {
        let one = p.add_constant(1);
        let add = p.add("Math", "Add")?;
        let input = p.input(0)?;
        p.connect(input.port(0), one.port(0))?;
        p.connect(input.port(0), add.port(0))?;
        p.connect(one.port(0), add.port(1))?;
        p.connect(add.port(0), p.output(0)?.port(0))
    })
}

/// `Loop(current, limit) -> (body, done, limit)`
///
/// The third output hands the limit back so the caller can feed it into the
/// next iteration.
fn register_loop(engine: &mut Engine) -> Result<()> {
    engine.register_prototype("Flow", "Loop", 2, 3, |p| {
        let less = p.add("Compare", "LessThan")?;
        p.connect(p.input(0)?.port(0), less.port(0))?;
        p.connect(p.input(1)?.port(0), less.port(1))?;
        p.connect(p.input(1)?.port(0), p.output(2)?.port(0))?;
        p.connect(less.port(0), p.output(0)?.port(0))?;
        p.connect(less.port(1), p.output(1)?.port(0))
    })
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    env_logger::init();

    let config = EngineConfig::new().max_steps(10_000).trace_firing(true);
    let mut engine = Engine::with_config(config);
    register_increment(&mut engine)?;
    register_loop(&mut engine)?;

    let looper = engine.create_node("Flow", "Loop")?;
    let body = engine.create_node("IO", "PrintLine")?;
    let increment = engine.create_node("Flow", "Increment")?;
    let done = engine.add_constant("Done!");
    let finish = engine.create_node("IO", "PrintLine")?;

    engine.connect(looper.port(0), body.port(0))?;
    engine.connect(looper.port(1), done.port(0))?;
    engine.connect(looper.port(2), looper.port(1))?;
    engine.connect(body.port(0), increment.port(0))?;
    engine.connect(increment.port(0), looper.port(0))?;
    engine.connect(done.port(0), finish.port(0))?;

    engine.pulse_input(looper.port(0), 0)?;
    engine.pulse_input(looper.port(1), 10)?;

    let steps = engine.run_until_idle()?;
    println!(
        "quiescent after {} steps, {} idle Loop instance(s)",
        steps,
        engine.idle_instances("Flow", "Loop")
    );
    Ok(())
}
