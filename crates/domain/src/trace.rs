use serde::Serialize;

/// Structured trace events emitted across all tierguard crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    StateCreated {
        path: String,
    },
    StateMigrated {
        path: String,
        detail: String,
    },
    StateQuarantined {
        path: String,
        moved_to: String,
    },
    CountersReset {
        window: String,
        counters: Vec<String>,
        cleared_records: usize,
    },
    ChangeRecorded {
        change_id: String,
        counter: String,
        count: u32,
        hash: String,
    },
    LimitDenied {
        counter: String,
        reason: String,
    },
    InterlockChanged {
        switch: String,
        enabled: bool,
        reason: String,
    },
    JobCompleted {
        job: String,
        status: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "tg_event");
    }
}
