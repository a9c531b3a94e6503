use bevy::prelude::*;
use std::collections::VecDeque;

const DEBUG_LOG_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStatus {
    Success,
    Warning,
    Error,
}

impl CheckpointStatus {
    pub fn marker(self) -> &'static str {
        match self {
            Self::Success => "ok",
            Self::Warning => "warn",
            Self::Error => "err",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DebugEntry {
    pub name: String,
    pub status: CheckpointStatus,
    pub details: String,
    pub elapsed_s: f64,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct DebugLog {
    entries: VecDeque<DebugEntry>,
    elapsed_s: f64,
}

impl DebugLog {
    pub fn set_clock(&mut self, elapsed_s: f64) {
        self.elapsed_s = elapsed_s;
    }

    pub fn checkpoint(
        &mut self,
        name: impl Into<String>,
        status: CheckpointStatus,
        details: impl Into<String>,
    ) {
        let name = name.into();
        let details = details.into();

        match (status, details.is_empty()) {
            (CheckpointStatus::Success, true) => info!("[checkpoint] {name}"),
            (CheckpointStatus::Success, false) => info!("[checkpoint] {name}: {details}"),
            (CheckpointStatus::Warning, true) => warn!("{name}"),
            (CheckpointStatus::Warning, false) => warn!("{name}: {details}"),
            (CheckpointStatus::Error, true) => error!("{name}"),
            (CheckpointStatus::Error, false) => error!("{name}: {details}"),
        }

        if self.entries.len() == DEBUG_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(DebugEntry {
            name,
            status,
            details,
            elapsed_s: self.elapsed_s,
        });
    }

    pub fn success(&mut self, name: impl Into<String>, details: impl Into<String>) {
        self.checkpoint(name, CheckpointStatus::Success, details);
    }

    pub fn warning(&mut self, message: impl Into<String>, details: impl Into<String>) {
        self.checkpoint(message, CheckpointStatus::Warning, details);
    }

    pub fn error(&mut self, message: impl Into<String>, details: impl Into<String>) {
        self.checkpoint(message, CheckpointStatus::Error, details);
    }

    pub fn recent(&self, count: usize) -> impl Iterator<Item = &DebugEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(count))
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

pub(super) fn advance_debug_log_clock(time: Res<Time>, mut log: ResMut<DebugLog>) {
    log.set_clock(time.elapsed_secs_f64());
}
