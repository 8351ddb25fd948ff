//! Core domain primitives shared across handlers.
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, as stamped onto clients and publishes.
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

/// Client, check, and aggregate names share one charset.
pub fn valid_resource_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-')
}

/// Named severity bucket derived from a result's integer status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Severity {
    pub fn from_status(status: i64) -> Self {
        match status {
            0 => Severity::Ok,
            1 => Severity::Warning,
            2 => Severity::Critical,
            _ => Severity::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "ok",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
            Severity::Unknown => "unknown",
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ok" => Ok(Severity::Ok),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            "unknown" => Ok(Severity::Unknown),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_mapping_is_closed() {
        assert_eq!(Severity::from_status(0), Severity::Ok);
        assert_eq!(Severity::from_status(1), Severity::Warning);
        assert_eq!(Severity::from_status(2), Severity::Critical);
        assert_eq!(Severity::from_status(3), Severity::Unknown);
        assert_eq!(Severity::from_status(-1), Severity::Unknown);
        assert_eq!(Severity::from_status(255), Severity::Unknown);
    }

    #[test]
    fn severity_parses_its_own_names() {
        for severity in [
            Severity::Ok,
            Severity::Warning,
            Severity::Critical,
            Severity::Unknown,
        ] {
            assert_eq!(severity.as_str().parse::<Severity>(), Ok(severity));
        }
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn resource_names_are_constrained() {
        assert!(valid_resource_name("web-01"));
        assert!(valid_resource_name("db_7.internal"));
        assert!(!valid_resource_name(""));
        assert!(!valid_resource_name("web 01"));
        assert!(!valid_resource_name("web/01"));
        assert!(!valid_resource_name("web:01"));
    }
}
