use studio_protocol::fs::HealthResponse;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiStatus {
    #[default]
    Unknown,
    Up,
    Down,
}

impl std::fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ApiStatus::Unknown => "unknown",
            ApiStatus::Up => "up",
            ApiStatus::Down => "down",
        };
        f.write_str(label)
    }
}

/// Backend health as shown in the top bar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthStatus {
    pub api: ApiStatus,
    pub project_root: Option<String>,
    pub codex_configured: bool,
}

impl HealthStatus {
    /// The API only counts as up when it reports ok together with a project
    /// root.
    pub fn from_response(response: &HealthResponse) -> Self {
        let project_root = response
            .project_root
            .clone()
            .filter(|root| !root.is_empty());
        let api = if response.ok && project_root.is_some() {
            ApiStatus::Up
        } else {
            ApiStatus::Down
        };
        Self {
            api,
            project_root,
            codex_configured: response.codex_configured,
        }
    }

    /// A failed probe. Keeps nothing from the previous status.
    pub fn down() -> Self {
        Self {
            api: ApiStatus::Down,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn up_requires_ok_and_project_root() {
        let healthy = HealthResponse {
            ok: true,
            project_root: Some("/work".to_string()),
            codex_configured: true,
        };
        assert_eq!(HealthStatus::from_response(&healthy).api, ApiStatus::Up);

        let rootless = HealthResponse {
            project_root: None,
            ..healthy.clone()
        };
        assert_eq!(HealthStatus::from_response(&rootless).api, ApiStatus::Down);

        let not_ok = HealthResponse {
            ok: false,
            ..healthy
        };
        let status = HealthStatus::from_response(&not_ok);
        assert_eq!(status.api, ApiStatus::Down);
        assert!(status.codex_configured);
    }
}
