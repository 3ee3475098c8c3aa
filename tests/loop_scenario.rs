use pulsegraph::prelude::*;

/// `Increment(x) -> x + amount`
fn register_increment(engine: &mut Engine, amount: i64) {
    engine
        .register_prototype("Flow", "Increment", 1, 1, |p| {
            let step = p.add_constant(amount);
            let add = p.add("Math", "Add")?;
            let input = p.input(0)?;
            p.connect(input.port(0), step.port(0))?;
            p.connect(input.port(0), add.port(0))?;
            p.connect(step.port(0), add.port(1))?;
            p.connect(add.port(0), p.output(0)?.port(0))
        })
        .unwrap();
}

/// `Loop(current, limit) -> (body, done, limit)`
fn register_loop(engine: &mut Engine) {
    engine
        .register_prototype("Flow", "Loop", 2, 3, |p| {
            let less = p.add("Compare", "LessThan")?;
            p.connect(p.input(0)?.port(0), less.port(0))?;
            p.connect(p.input(1)?.port(0), less.port(1))?;
            p.connect(p.input(1)?.port(0), p.output(2)?.port(0))?;
            p.connect(less.port(0), p.output(0)?.port(0))?;
            p.connect(less.port(1), p.output(1)?.port(0))
        })
        .unwrap();
}

struct Counter {
    engine: Engine,
    console: BufferConsole,
    looper: NodeId,
}

fn counter(limit: i64) -> Counter {
    let console = BufferConsole::new();
    let mut engine = Engine::new().with_console(console.clone());
    register_increment(&mut engine, 1);
    register_loop(&mut engine);

    let looper = engine.create_node("Flow", "Loop").unwrap();
    let body = engine.create_node("IO", "Print").unwrap();
    let increment = engine.create_node("Flow", "Increment").unwrap();
    let done = engine.add_constant("Done!");
    let finish = engine.create_node("IO", "Print").unwrap();

    engine.connect(looper.port(0), body.port(0)).unwrap();
    engine.connect(looper.port(1), done.port(0)).unwrap();
    engine.connect(looper.port(2), looper.port(1)).unwrap();
    engine.connect(body.port(0), increment.port(0)).unwrap();
    engine.connect(increment.port(0), looper.port(0)).unwrap();
    engine.connect(done.port(0), finish.port(0)).unwrap();

    engine.pulse_input(looper.port(0), 0).unwrap();
    engine.pulse_input(looper.port(1), limit).unwrap();
    Counter {
        engine,
        console,
        looper,
    }
}

#[test]
fn test_loop_counts_then_finishes() {
    let Counter {
        mut engine,
        console,
        ..
    } = counter(10);

    while engine.step().unwrap() {}

    let mut expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    expected.push("Done!".to_string());
    assert_eq!(console.writes(), expected);
}

#[test]
fn test_loop_recycles_its_instances() {
    let Counter {
        mut engine,
        looper,
        ..
    } = counter(10);

    engine.run_until_idle().unwrap();

    assert!(engine.watched().is_empty());
    assert_eq!(engine.instance_of(looper), None);
    // One reference each, bound one iteration at a time.
    assert_eq!(engine.idle_instances("Flow", "Loop"), 1);
    assert_eq!(engine.idle_instances("Flow", "Increment"), 1);
}

#[test]
fn test_loop_with_zero_limit_goes_straight_to_done() {
    let Counter {
        mut engine,
        console,
        ..
    } = counter(0);
    engine.run_until_idle().unwrap();
    assert_eq!(console.writes(), vec!["Done!".to_string()]);
}

#[test]
fn test_loop_advances_one_wave_per_step() {
    let Counter { mut engine, .. } = counter(1_000);
    let before = engine.steps_taken();
    for _ in 0..20 {
        engine.step().unwrap();
    }
    assert_eq!(engine.steps_taken(), before + 20);
    assert!(engine.has_pending());
}
