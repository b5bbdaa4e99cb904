//! Test-only helpers: fake steps and a recording reporter.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::anyhow;

use crate::core::report::Reporter;
use crate::core::step::Step;
use crate::core::types::StepFailure;

/// Shared record of which fake steps actually executed, in order.
#[derive(Debug, Clone, Default)]
pub struct StepLog(Rc<RefCell<Vec<String>>>);

impl StepLog {
    pub fn record(&self, name: &str) {
        self.0.borrow_mut().push(name.to_string());
    }

    pub fn ran(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

/// A step that records itself and succeeds.
pub fn succeeding(name: &str, log: &StepLog) -> Step {
    let log = log.clone();
    let label = name.to_string();
    Step::from_fn(name, move || {
        log.record(&label);
        Ok(())
    })
}

/// A step that records itself and fails with `message`.
pub fn failing(name: &str, log: &StepLog, message: &str) -> Step {
    let log = log.clone();
    let label = name.to_string();
    let message = message.to_string();
    Step::from_fn(name, move || {
        log.record(&label);
        Err(anyhow!(message.clone()))
    })
}

/// A step that panics when executed.
pub fn panicking(name: &str) -> Step {
    let label = name.to_string();
    Step::from_fn(name, move || panic!("step {label} panicked"))
}

/// Reporter notice captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RunStarted(String),
    StepStarted(usize, usize, String),
    Failed(StepFailure),
    Succeeded(String),
    Finished,
}

/// Reporter that keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<Event>,
}

impl RecordingReporter {
    pub fn started_names(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::StepStarted(_, _, name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn finished_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, Event::Finished))
            .count()
    }
}

impl Reporter for RecordingReporter {
    fn run_started(&mut self, title: &str) {
        self.events.push(Event::RunStarted(title.to_string()));
    }

    fn step_started(&mut self, position: usize, total: usize, name: &str) {
        self.events
            .push(Event::StepStarted(position, total, name.to_string()));
    }

    fn step_failed(&mut self, failure: &StepFailure) {
        self.events.push(Event::Failed(failure.clone()));
    }

    fn succeeded(&mut self, message: &str) {
        self.events.push(Event::Succeeded(message.to_string()));
    }

    fn finished(&mut self) {
        self.events.push(Event::Finished);
    }
}
