//! Per-component and overall service health (spec §4.9, §6 `/health`,
//! `/api/v1/health/detailed`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            detail: None,
        }
    }

    pub fn degraded(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            detail: Some(detail.into()),
        }
    }

    pub fn unhealthy(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            detail: Some(detail.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealth>,
}

/// Rolls per-component statuses into one overall status.
///
/// Any `Unhealthy` component makes the whole service `Unhealthy`. A single
/// `Degraded` component is tolerated as overall `Degraded` (spec §4.9); two
/// or more degraded components escalate to `Unhealthy` since that's no
/// longer "one optional dependency is slow", it's a pattern.
pub fn aggregate(components: Vec<ComponentHealth>) -> HealthReport {
    let unhealthy = components.iter().filter(|c| c.status == HealthStatus::Unhealthy).count();
    let degraded = components.iter().filter(|c| c.status == HealthStatus::Degraded).count();

    let status = if unhealthy > 0 {
        HealthStatus::Unhealthy
    } else if degraded >= 2 {
        HealthStatus::Unhealthy
    } else if degraded == 1 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    HealthReport { status, components }
}
