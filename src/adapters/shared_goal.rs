//! In-process goal that another thread can change while the loop runs.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::app::ports::{ConfigError, GoalSource};
use crate::control::Goal;

pub struct SharedGoal {
    goal: Mutex<CriticalSectionRawMutex, Cell<Goal>>,
}

impl SharedGoal {
    pub fn new(goal: Goal) -> Result<Self, ConfigError> {
        goal.validate()?;
        Ok(Self {
            goal: Mutex::new(Cell::new(goal)),
        })
    }

    /// Replace the goal. Invalid goals are rejected and the old one kept.
    pub fn set(&self, goal: Goal) -> Result<(), ConfigError> {
        goal.validate()?;
        self.goal.lock(|g| g.set(goal));
        Ok(())
    }

    pub fn get(&self) -> Goal {
        self.goal.lock(Cell::get)
    }
}

impl GoalSource for SharedGoal {
    fn goal(&self) -> Result<Goal, ConfigError> {
        Ok(self.get())
    }
}
