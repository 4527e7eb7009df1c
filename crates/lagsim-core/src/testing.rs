//! Scripted environment for unit tests.

use std::{cell::RefCell, collections::VecDeque, rc::Rc, time::Duration};

use crate::env::Environment;

#[derive(Default)]
struct Script {
    now: Duration,
    draws: VecDeque<f64>,
    consumed: usize,
}

/// Virtual clock plus a fixed list of uniform draws.
///
/// Running out of scripted draws is a test bug and panics.
#[derive(Clone, Default)]
pub(crate) struct ScriptedEnv {
    script: Rc<RefCell<Script>>,
}

impl ScriptedEnv {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_draws(draws: &[f64]) -> Self {
        let env = Self::new();
        env.push_draws(draws);
        env
    }

    pub(crate) fn push_draws(&self, draws: &[f64]) {
        self.script.borrow_mut().draws.extend(draws.iter().copied());
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.script.borrow_mut().now += by;
    }

    pub(crate) fn draws_consumed(&self) -> usize {
        self.script.borrow().consumed
    }
}

impl Environment for ScriptedEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.script.borrow().now
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let value = self.random_unit();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        buffer.fill((value * 256.0) as u8);
    }

    fn random_unit(&self) -> f64 {
        let mut script = self.script.borrow_mut();
        script.consumed += 1;
        script.draws.pop_front().expect("unscripted random draw")
    }
}
