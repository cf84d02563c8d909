use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{TaskRecord, TaskStatus};

/// Number of capabilities ranked in a summary, and the default for
/// `top_capabilities`.
pub const DEFAULT_TOP_CAPABILITIES: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapabilityUsage {
    pub id: String,
    /// Display name. Capabilities are not resolved, so this is the id.
    pub name: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub total_workflows: usize,
    pub completed_workflows: usize,
    pub failed_workflows: usize,
    pub cancelled_workflows: usize,
    pub active_workflows: usize,
    /// Completed workflows as a percentage of all workflows.
    pub success_rate: f64,
    pub average_response_time_ms: f64,
    pub today_workflows: usize,
    pub agent_count: usize,
    pub target_count: usize,
    pub top_capabilities: Vec<CapabilityUsage>,
    pub last_updated: DateTime<Utc>,
}

pub fn summarize(records: &[TaskRecord], now: DateTime<Utc>) -> WorkflowSummary {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now);

    let mut completed = 0;
    let mut failed = 0;
    let mut cancelled = 0;
    let mut active = 0;
    let mut today = 0;
    let mut total_response_ms = 0.0;
    let mut agents = BTreeSet::new();
    let mut targets = BTreeSet::new();

    for record in records {
        if record.started_at >= midnight {
            today += 1;
        }
        agents.insert(record.agent_ref.as_str());
        targets.insert(record.target_ref.as_str());

        match record.status {
            TaskStatus::Completed => {
                completed += 1;
                if let Some(ended_at) = record.ended_at {
                    total_response_ms +=
                        (ended_at - record.started_at).num_milliseconds() as f64;
                }
            }
            TaskStatus::Failed => failed += 1,
            TaskStatus::Cancelled => cancelled += 1,
            TaskStatus::Pending | TaskStatus::Running => active += 1,
        }
    }

    let total = records.len();
    let success_rate = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    let average_response_time_ms = if completed > 0 {
        total_response_ms / completed as f64
    } else {
        0.0
    };

    WorkflowSummary {
        total_workflows: total,
        completed_workflows: completed,
        failed_workflows: failed,
        cancelled_workflows: cancelled,
        active_workflows: active,
        success_rate,
        average_response_time_ms,
        today_workflows: today,
        agent_count: agents.len(),
        target_count: targets.len(),
        top_capabilities: top_capabilities(records, DEFAULT_TOP_CAPABILITIES),
        last_updated: now,
    }
}

/// Most used capabilities, by count descending with ties in id order, capped
/// at `limit`.
pub fn top_capabilities(records: &[TaskRecord], limit: usize) -> Vec<CapabilityUsage> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.capability_ref.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<CapabilityUsage> = counts
        .into_iter()
        .map(|(id, count)| CapabilityUsage {
            id: id.to_string(),
            name: id.to_string(),
            count,
        })
        .collect();
    // Stable sort keeps ties in id order from the BTreeMap.
    ranked.sort_by(|left, right| right.count.cmp(&left.count));
    ranked.truncate(limit);
    ranked
}
