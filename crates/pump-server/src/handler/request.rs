//! Request body decoding.

use pump_core::JobSpec;
use strum::{AsRefStr, Display};

/// Encoding of a job request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum JobFormat {
    #[default]
    Json,
    Yaml,
}

impl JobFormat {
    /// Picks the format named by the path segment.
    ///
    /// `yaml` and `yml` select YAML, in any case. Anything else is JSON.
    pub fn from_path(segment: &str) -> Self {
        if segment.eq_ignore_ascii_case("yaml") || segment.eq_ignore_ascii_case("yml") {
            Self::Yaml
        } else {
            Self::Json
        }
    }

    /// Decodes and validates a job.
    pub fn decode(self, body: &[u8]) -> Result<JobSpec, String> {
        let spec: JobSpec = match self {
            Self::Json => serde_json::from_slice(body).map_err(|e| e.to_string())?,
            Self::Yaml => serde_yaml::from_slice(body).map_err(|e| e.to_string())?,
        };

        spec.validate().map_err(|e| e.to_string())?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_JOB: &str = r#"{
        "id": "job-1",
        "source": {"subscription": "EVENTS/pump", "max_stall": 10},
        "target": {"dataset": "public", "table": "events", "batch_size": 500},
        "max_duration": 300
    }"#;

    const YAML_JOB: &str = "
id: job-1
source:
  subscription: EVENTS/pump
  max_stall: 10
target:
  dataset: public
  table: events
  batch_size: 500
max_duration: 300
";

    #[test]
    fn format_from_path() {
        assert_eq!(JobFormat::from_path("yaml"), JobFormat::Yaml);
        assert_eq!(JobFormat::from_path("YML"), JobFormat::Yaml);
        assert_eq!(JobFormat::from_path("json"), JobFormat::Json);
        assert_eq!(JobFormat::from_path("xml"), JobFormat::Json);
    }

    #[test]
    fn json_and_yaml_decode_to_the_same_job() {
        let json = JobFormat::Json.decode(JSON_JOB.as_bytes()).unwrap();
        let yaml = JobFormat::Yaml.decode(YAML_JOB.as_bytes()).unwrap();

        assert_eq!(json, yaml);
        assert_eq!(json.target.batch_size, 500);
        assert!(!json.target.ignore_unknowns);
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        assert!(JobFormat::Json.decode(b"not json").is_err());
        assert!(JobFormat::Json.decode(br#"{"id":"job-1"}"#).is_err());
        assert!(JobFormat::Yaml.decode(b"source: [").is_err());
    }

    #[test]
    fn invalid_jobs_are_rejected() {
        let job = JSON_JOB.replace(r#""max_stall": 10"#, r#""max_stall": 1"#);
        let error = JobFormat::Json.decode(job.as_bytes()).unwrap_err();
        assert!(error.contains("max_stall"));
    }
}
