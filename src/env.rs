use std::{cell::RefCell, ffi::OsStr};

#[derive(Clone, Copy)]
struct Env {
    trace: bool,
    seed: Option<u64>,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    let value = Env {
        trace: var_is("MARS_TRACE", "1"),
        seed: std::env::var("MARS_SEED")
            .ok()
            .and_then(|v| v.trim().parse().ok()),
    };
    set_env(value);
}

/// Print one line per tick while a battle runs.
pub fn is_trace_enabled() -> bool {
    with_env(|env| env.trace)
}

/// Placement seed to use when none is given on the command line.
pub fn seed() -> Option<u64> {
    with_env(|env| env.seed)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}
