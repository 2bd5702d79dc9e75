// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use tracing::info;

use crate::config::EngineConfig;
use crate::exit::ExitSignal;
use crate::logging::{Logger, Severity};
use crate::subsystem::{Subsystem, SubsystemError, SubsystemRegistry};
use crate::timer::FrameTimer;

const CATEGORY: &str = "Engine";

/// Composition root: owns the subsystems, the frame timer and the exit signal.
pub struct Engine {
    config: EngineConfig,
    exit: ExitSignal,
    logger: Logger,
    timer: FrameTimer,
    subsystems: SubsystemRegistry,
    frame_limit: Option<u64>,
    frames: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let exit = ExitSignal::new();
        Engine {
            logger: Logger::new(exit.clone()),
            timer: FrameTimer::new(config.timing.target_fps),
            config,
            exit,
            subsystems: SubsystemRegistry::new(),
            frame_limit: None,
            frames: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn logger(&self) -> Logger {
        self.logger.clone()
    }

    pub fn exit_signal(&self) -> ExitSignal {
        self.exit.clone()
    }

    /// Requests exit after `limit` ticks.
    pub fn set_frame_limit(&mut self, limit: Option<u64>) {
        self.frame_limit = limit;
    }

    pub fn register<T: Subsystem>(&mut self, subsystem: T) -> Result<(), SubsystemError> {
        self.subsystems.register(subsystem)
    }

    pub fn subsystem<T: Subsystem>(&self) -> Option<&T> {
        self.subsystems.get()
    }

    pub fn subsystem_mut<T: Subsystem>(&mut self) -> Option<&mut T> {
        self.subsystems.get_mut()
    }

    pub fn init(&mut self) -> Result<()> {
        info!(
            "{} starting {} ({} subsystems)",
            self.config.engine_name,
            self.config.application_name,
            self.subsystems.len()
        );
        let result = self.subsystems.init_all();
        if let Err(e) = &result {
            self.report_failure(e);
        }
        result
    }

    pub fn tick(&mut self) {
        let delta_ms = self.timer.tick();
        if let Err(e) = self.subsystems.tick_all(delta_ms) {
            self.report_failure(&e);
        }
        self.frames += 1;
        if self.frame_limit.is_some_and(|limit| self.frames >= limit) {
            self.logger.log(
                Severity::Log,
                CATEGORY,
                format_args!("frame limit of {} reached", self.frames),
            );
            self.exit.request();
        }
        self.timer.pace();
    }

    pub fn has_requested_exit(&self) -> bool {
        self.exit.is_requested()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn shutdown(&mut self) {
        self.subsystems.shutdown_all();
        info!("{} shut down after {} frames", self.config.engine_name, self.frames);
    }

    // A subsystem that already reported its own fatal leaves the exit flag
    // raised; only escalate the ones that did not.
    fn report_failure(&self, e: &anyhow::Error) {
        let severity = if self.exit.is_requested() {
            Severity::Error
        } else {
            Severity::Fatal
        };
        self.logger.log(severity, CATEGORY, format_args!("{e:#}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Counter {
        ticks: Rc<RefCell<u32>>,
        fail: bool,
    }

    impl Subsystem for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }
        fn init(&mut self) -> Result<()> {
            if self.fail {
                anyhow::bail!("no device");
            }
            Ok(())
        }
        fn tick(&mut self, _delta_ms: f32) -> Result<()> {
            *self.ticks.borrow_mut() += 1;
            Ok(())
        }
        fn shutdown(&mut self) {}
        fn is_ticking(&self) -> bool {
            true
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn engine_with(fail: bool) -> (Engine, Rc<RefCell<u32>>) {
        let ticks = Rc::new(RefCell::new(0));
        let mut engine = Engine::new(EngineConfig::default());
        engine
            .register(Counter {
                ticks: ticks.clone(),
                fail,
            })
            .unwrap();
        (engine, ticks)
    }

    #[test]
    fn failed_init_requests_exit() {
        let (mut engine, ticks) = engine_with(true);
        assert!(engine.init().is_err());
        assert!(engine.has_requested_exit());
        while !engine.has_requested_exit() {
            engine.tick();
        }
        engine.shutdown();
        assert_eq!(*ticks.borrow(), 0);
    }

    #[test]
    fn frame_limit_stops_the_loop() {
        let (mut engine, ticks) = engine_with(false);
        engine.set_frame_limit(Some(3));
        engine.init().unwrap();
        while !engine.has_requested_exit() {
            engine.tick();
        }
        engine.shutdown();
        assert_eq!(engine.frames(), 3);
        assert_eq!(*ticks.borrow(), 3);
    }

    #[test]
    fn subsystems_are_reachable_by_type() {
        let (mut engine, _) = engine_with(false);
        assert_eq!(engine.subsystem::<Counter>().map(|c| c.fail), Some(false));
        engine.subsystem_mut::<Counter>().unwrap().fail = true;
        assert!(engine.init().is_err());
    }
}
