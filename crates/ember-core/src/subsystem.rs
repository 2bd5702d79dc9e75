// SPDX-License-Identifier: CEPL-1.0
use std::any::{Any, TypeId};
use std::collections::HashMap;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info};

/// A unit of engine functionality owned and driven by the [`SubsystemRegistry`].
pub trait Subsystem: Any {
    fn name(&self) -> &'static str;

    fn init(&mut self) -> Result<()>;

    fn tick(&mut self, _delta_ms: f32) -> Result<()> {
        Ok(())
    }

    fn shutdown(&mut self);

    /// Only ticking subsystems receive [`Subsystem::tick`].
    fn is_ticking(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubsystemError {
    #[error("subsystem `{0}` is already registered")]
    AlreadyRegistered(&'static str),
}

/// Type-indexed collection of subsystems.
///
/// Subsystems are initialized in registration order and shut down in reverse.
/// A subsystem whose `init` was entered is shut down even if `init` failed, so
/// it can release whatever it managed to create.
#[derive(Default)]
pub struct SubsystemRegistry {
    slots: Vec<Box<dyn Subsystem>>,
    by_type: HashMap<TypeId, usize>,
    started: usize,
}

impl SubsystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Subsystem>(&mut self, subsystem: T) -> Result<(), SubsystemError> {
        let id = TypeId::of::<T>();
        if self.by_type.contains_key(&id) {
            return Err(SubsystemError::AlreadyRegistered(subsystem.name()));
        }
        debug!(name = subsystem.name(), "registered subsystem");
        self.by_type.insert(id, self.slots.len());
        self.slots.push(Box::new(subsystem));
        Ok(())
    }

    pub fn get<T: Subsystem>(&self) -> Option<&T> {
        let &index = self.by_type.get(&TypeId::of::<T>())?;
        self.slots[index].as_any().downcast_ref()
    }

    pub fn get_mut<T: Subsystem>(&mut self) -> Option<&mut T> {
        let &index = self.by_type.get(&TypeId::of::<T>())?;
        self.slots[index].as_any_mut().downcast_mut()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Stops at the first failing subsystem.
    pub fn init_all(&mut self) -> Result<()> {
        while self.started < self.slots.len() {
            let subsystem = &mut self.slots[self.started];
            self.started += 1;
            let name = subsystem.name();
            subsystem
                .init()
                .with_context(|| format!("subsystem `{name}` failed to initialize"))?;
            info!(name, "subsystem initialized");
        }
        Ok(())
    }

    pub fn tick_all(&mut self, delta_ms: f32) -> Result<()> {
        for subsystem in self.slots[..self.started]
            .iter_mut()
            .filter(|s| s.is_ticking())
        {
            let name = subsystem.name();
            subsystem
                .tick(delta_ms)
                .with_context(|| format!("subsystem `{name}` failed to tick"))?;
        }
        Ok(())
    }

    pub fn shutdown_all(&mut self) {
        for subsystem in self.slots[..self.started].iter_mut().rev() {
            debug!(name = subsystem.name(), "shutting down subsystem");
            subsystem.shutdown();
        }
        self.started = 0;
    }
}
