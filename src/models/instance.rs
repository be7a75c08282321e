// ABOUTME: Instance descriptor identifying the workload a terminal session attaches to
// Carries optional metadata shown in the connection banner

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstanceTarget {
    pub id: String,
    pub container_address: Option<String>,
    pub uptime: Option<String>,
    pub cpu_usage: Option<f32>,    // Percent of one core
    pub memory_usage: Option<String>,
}

impl InstanceTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_container_address(mut self, address: impl Into<String>) -> Self {
        self.container_address = Some(address.into());
        self
    }

    pub fn with_uptime(mut self, uptime: impl Into<String>) -> Self {
        self.uptime = Some(uptime.into());
        self
    }

    pub fn with_resources(mut self, cpu_usage: Option<f32>, memory_usage: Option<String>) -> Self {
        self.cpu_usage = cpu_usage;
        self.memory_usage = memory_usage;
        self
    }

    pub fn is_known(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Metadata lines for the connection banner, without the heading
    pub fn detail_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Container: {}    Uptime: {}",
            self.container_address.as_deref().unwrap_or("unknown"),
            self.uptime.as_deref().unwrap_or("unknown")
        )];

        if self.cpu_usage.is_some() || self.memory_usage.is_some() {
            let cpu = self
                .cpu_usage
                .map_or_else(|| "unknown".to_string(), |cpu| format!("{cpu:.1}%"));
            lines.push(format!(
                "CPU: {}    Memory: {}",
                cpu,
                self.memory_usage.as_deref().unwrap_or("unknown")
            ));
        }

        lines
    }
}
