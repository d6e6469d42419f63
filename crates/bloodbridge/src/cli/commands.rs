//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands and the parsing
//! of record field arguments.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};
use crate::record::RESERVED_FIELDS;

/// Fields for a new record.
///
/// `--json` supplies a base object; each `--field KEY=VALUE` is applied on
/// top of it in order.
#[derive(Debug, Clone, Default, Args)]
pub struct FieldArgs {
    /// Record field as KEY=VALUE (repeatable)
    #[arg(short, long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,

    /// Record fields as a JSON object
    #[arg(long, value_name = "OBJECT")]
    pub json: Option<String>,
}

impl FieldArgs {
    /// Collect the arguments into a field map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] for malformed pairs, reserved keys or
    /// a `--json` value that is not an object.
    pub fn to_fields(&self) -> Result<Map<String, Value>> {
        let mut fields = match &self.json {
            Some(raw) => parse_json_object(raw)?,
            None => Map::new(),
        };
        for pair in &self.fields {
            let (key, value) = parse_field(pair)?;
            fields.insert(key, value);
        }
        Ok(fields)
    }
}

fn parse_json_object(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => {
            if let Some(key) = map.keys().find(|k| RESERVED_FIELDS.contains(&k.as_str())) {
                return Err(Error::invalid_field(key.as_str(), "field is set by the store"));
            }
            Ok(map)
        }
        Ok(_) => Err(Error::invalid_field(raw, "expected a JSON object")),
        Err(e) => Err(Error::invalid_field(raw, e.to_string())),
    }
}

/// Parse one `KEY=VALUE` argument.
///
/// Integers and finite decimals written in canonical form, and
/// `true`/`false`, become JSON numbers and booleans; anything else (phone
/// numbers with `+` or leading zeros, postcodes, exponents) is kept as a string.
///
/// # Errors
///
/// Returns [`Error::InvalidField`] if there is no `=`, the key is empty, or
/// the key is one the store manages itself.
pub fn parse_field(pair: &str) -> Result<(String, Value)> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| Error::invalid_field(pair, "expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::invalid_field(pair, "key is empty"));
    }
    if RESERVED_FIELDS.contains(&key) {
        return Err(Error::invalid_field(pair, "field is set by the store"));
    }
    Ok((key.to_string(), parse_scalar(value)))
}

fn parse_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    // Only text that prints back unchanged is a number; "+91..." and "0411" stay strings.
    let number = raw
        .parse::<i64>()
        .ok()
        .map(Number::from)
        .or_else(|| raw.parse::<f64>().ok().and_then(Number::from_f64))
        .filter(|n| n.to_string() == raw);
    number.map_or_else(|| Value::String(raw.to_string()), Value::Number)
}

/// Commands on donor or staff applications.
#[derive(Debug, Subcommand)]
pub enum RecordCommand {
    /// Submit a new application
    Add(FieldArgs),

    /// List all applications
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one application
    Show {
        /// Record ID
        id: String,
    },

    /// Set an application's status
    Status {
        /// Record ID
        id: String,
        /// New status (Pending, Approved, Rejected)
        status: String,
    },

    /// Delete an application
    Delete {
        /// Record ID
        id: String,
    },

    /// List emergency requests relevant to an applicant
    ///
    /// Donors see active requests for their blood group or for any group.
    /// Staff see every request raised for their hospital.
    Requests {
        /// Record ID
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Commands on emergency blood requests.
#[derive(Debug, Subcommand)]
pub enum EmergencyCommand {
    /// Raise a new emergency request
    Add(FieldArgs),

    /// List all emergency requests
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one emergency request
    Show {
        /// Record ID
        id: String,
    },

    /// Set a request's status
    Status {
        /// Record ID
        id: String,
        /// New status (Active, Resolved)
        status: String,
    },

    /// Delete a request
    Delete {
        /// Record ID
        id: String,
    },

    /// List approved donors who could answer a request
    Matches {
        /// Emergency request ID
        id: String,

        /// Search radius in kilometres (defaults to the configured radius)
        #[arg(short, long)]
        radius_km: Option<f64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Hospital search arguments.
#[derive(Debug, Args)]
pub struct HospitalsCommand {
    /// Latitude of the search origin (defaults to the configured location)
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the search origin
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Search radius in metres
    #[arg(short, long)]
    pub radius_m: Option<u32>,

    /// Maximum number of hospitals to list
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Pick the Nth hospital (1-based) and print its record fields
    #[arg(short, long, value_name = "N")]
    pub select: Option<usize>,

    /// Output as JSON
    #[arg(short, long, conflicts_with = "html")]
    pub json: bool,

    /// Output map popup HTML fragments for the listed hospitals
    #[arg(long)]
    pub html: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_field_string() {
        let (key, value) = parse_field("name=Alice Smith").unwrap();
        assert_eq!(key, "name");
        assert_eq!(value, json!("Alice Smith"));
    }

    #[test]
    fn test_parse_field_scalars() {
        assert_eq!(parse_field("age=42").unwrap().1, json!(42));
        assert_eq!(parse_field("lat=18.52").unwrap().1, json!(18.52));
        assert_eq!(parse_field("lng=-73.5").unwrap().1, json!(-73.5));
        assert_eq!(parse_field("consent=true").unwrap().1, json!(true));
        assert_eq!(parse_field("phone=+91 98").unwrap().1, json!("+91 98"));
        assert_eq!(parse_field("note=NaN").unwrap().1, json!("NaN"));
    }

    #[test]
    fn test_parse_field_keeps_number_like_text() {
        assert_eq!(
            parse_field("phone=+919876543210").unwrap().1,
            json!("+919876543210")
        );
        assert_eq!(
            parse_field("phone=09876543210").unwrap().1,
            json!("09876543210")
        );
        assert_eq!(parse_field("postcode=011001").unwrap().1, json!("011001"));
        assert_eq!(parse_field("units=1e3").unwrap().1, json!("1e3"));
        assert_eq!(parse_field("units=-0").unwrap().1, json!("-0"));
        assert_eq!(parse_field("dose=2.50").unwrap().1, json!("2.50"));
        assert_eq!(parse_field("postcode=411001").unwrap().1, json!(411001));
    }

    #[test]
    fn test_parse_field_value_may_contain_equals() {
        let (key, value) = parse_field("note=a=b").unwrap();
        assert_eq!(key, "note");
        assert_eq!(value, json!("a=b"));
    }

    #[test]
    fn test_parse_field_empty_value() {
        assert_eq!(parse_field("note=").unwrap().1, json!(""));
    }

    #[test]
    fn test_parse_field_rejects_malformed() {
        assert!(matches!(
            parse_field("name"),
            Err(Error::InvalidField { .. })
        ));
        assert!(matches!(
            parse_field("=value"),
            Err(Error::InvalidField { .. })
        ));
    }

    #[test]
    fn test_parse_field_rejects_reserved() {
        for key in RESERVED_FIELDS {
            let err = parse_field(&format!("{key}=x")).unwrap_err();
            assert!(err.to_string().contains("set by the store"));
        }
    }

    #[test]
    fn test_field_args_merge_json_then_pairs() {
        let args = FieldArgs {
            fields: vec!["bloodGroup=O-".to_string()],
            json: Some(r#"{"name": "Bob", "bloodGroup": "A+"}"#.to_string()),
        };
        let fields = args.to_fields().unwrap();
        assert_eq!(fields["name"], "Bob");
        assert_eq!(fields["bloodGroup"], "O-");
    }

    #[test]
    fn test_field_args_json_must_be_object() {
        let args = FieldArgs {
            fields: Vec::new(),
            json: Some("[1, 2]".to_string()),
        };
        assert!(args.to_fields().is_err());

        let args = FieldArgs {
            fields: Vec::new(),
            json: Some("{not json".to_string()),
        };
        assert!(args.to_fields().is_err());
    }

    #[test]
    fn test_field_args_json_rejects_reserved() {
        let args = FieldArgs {
            fields: Vec::new(),
            json: Some(r#"{"status": "Approved"}"#.to_string()),
        };
        assert!(args.to_fields().is_err());
    }

    #[test]
    fn test_field_args_empty() {
        assert!(FieldArgs::default().to_fields().unwrap().is_empty());
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        assert!(format!("{cmd:?}").contains("Show"));
    }
}
