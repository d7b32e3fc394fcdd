use schemars::JsonSchema;
use serde::Deserialize;
use tracing_appender::rolling::Rotation;

/// How often a new log file is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
pub enum LogRotationKind {
    #[serde(alias = "minutely", alias = "MINUTELY")]
    Minutely,
    #[serde(alias = "hourly", alias = "HOURLY")]
    Hourly,
    #[serde(alias = "daily", alias = "DAILY")]
    Daily,
    #[serde(alias = "never", alias = "NEVER")]
    Never,
}

impl From<LogRotationKind> for Rotation {
    fn from(value: LogRotationKind) -> Self {
        match value {
            LogRotationKind::Minutely => Rotation::MINUTELY,
            LogRotationKind::Hourly => Rotation::HOURLY,
            LogRotationKind::Daily => Rotation::DAILY,
            LogRotationKind::Never => Rotation::NEVER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LogRotationKind;
    use rstest::rstest;
    use tracing_appender::rolling::Rotation;

    #[rstest]
    #[case(LogRotationKind::Minutely, Rotation::MINUTELY)]
    #[case(LogRotationKind::Daily, Rotation::DAILY)]
    #[case(LogRotationKind::Never, Rotation::NEVER)]
    fn it_maps_to_rotation(#[case] kind: LogRotationKind, #[case] expected: Rotation) {
        assert_eq!(Rotation::from(kind), expected);
    }

    #[rstest]
    #[case("hourly", LogRotationKind::Hourly)]
    #[case("NEVER", LogRotationKind::Never)]
    #[case("Daily", LogRotationKind::Daily)]
    fn it_accepts_any_casing(#[case] value: &str, #[case] expected: LogRotationKind) {
        let kind: LogRotationKind = serde_json::from_value(serde_json::json!(value)).unwrap();
        assert_eq!(kind, expected);
    }
}
