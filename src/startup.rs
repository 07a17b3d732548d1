//! Startup checks: health and area list load concurrently and settle independently.

use crate::format::group_thousands;
use crate::model::HealthStatus;
use crate::service::ServiceError;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Fetch<T> {
    #[default]
    Pending,
    Ready(T),
    Failed,
}

impl<T> Fetch<T> {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Fetch::Pending)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Fetch::Ready(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthBadge {
    Loaded(u64),
    NoData,
    Unknown,
}

impl HealthBadge {
    pub fn text(self) -> String {
        match self {
            HealthBadge::Loaded(n) => format!("Data Loaded ({} records)", group_thousands(n as f64)),
            HealthBadge::NoData => "No Data".to_string(),
            HealthBadge::Unknown => "Unknown".to_string(),
        }
    }
}

pub const MAX_AREA_BADGES: usize = 10;

#[derive(Debug, Default)]
pub struct Startup {
    health: Fetch<HealthStatus>,
    areas: Fetch<Vec<String>>,
    warning: Option<String>,
}

impl Startup {
    pub fn apply_health(&mut self, outcome: Result<HealthStatus, ServiceError>) {
        match outcome {
            Ok(status) => {
                log::info!(
                    "service health: loaded={} records={}",
                    status.data_loaded,
                    status.total_records
                );
                self.health = Fetch::Ready(status);
            }
            Err(e) => {
                log::warn!("health check failed: {}", e);
                self.health = Fetch::Failed;
                self.warn(&e);
            }
        }
    }

    pub fn apply_areas(&mut self, outcome: Result<Vec<String>, ServiceError>) {
        match outcome {
            Ok(areas) => {
                log::info!("{} areas available", areas.len());
                self.areas = Fetch::Ready(areas);
            }
            Err(e) => {
                log::warn!("loading areas failed: {}", e);
                if self.areas.ready().is_none() {
                    self.areas = Fetch::Failed;
                }
                self.warn(&e);
            }
        }
    }

    fn warn(&mut self, err: &ServiceError) {
        if self.warning.is_none() {
            self.warning = Some(connectivity_warning(err));
        }
    }

    pub fn is_complete(&self) -> bool {
        self.health.is_settled() && self.areas.is_settled()
    }

    pub fn badge(&self) -> HealthBadge {
        match &self.health {
            Fetch::Ready(s) if s.data_loaded => HealthBadge::Loaded(s.total_records),
            Fetch::Ready(_) => HealthBadge::NoData,
            _ => HealthBadge::Unknown,
        }
    }

    pub fn areas(&self) -> &[String] {
        self.areas.ready().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Areas shown as badges and the count hidden behind "+N more".
    pub fn area_badges(&self) -> (&[String], usize) {
        let areas = self.areas();
        let shown = areas.len().min(MAX_AREA_BADGES);
        (&areas[..shown], areas.len() - shown)
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn dismiss_warning(&mut self) {
        self.warning = None;
    }
}

pub fn connectivity_warning(err: &ServiceError) -> String {
    format!(
        "Failed to connect to the server. Please check if the backend is running. Error: {}",
        err
    )
}
