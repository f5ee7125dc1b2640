//! CLI command implementations
//!
//! Every command loads the configuration, installs logging and reads the
//! schema directory before doing its own work. Commands return their result
//! and `run_command` prints it, so each one can be tested without stdout.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::observability::init_tracing;
use crate::query::{Query, QueryBuilder, RequestParams};
use crate::schema::SchemaRegistry;

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Run a parsed command, printing its output to stdout.
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Schemas { config } => {
            let config = setup(config.as_deref())?;
            print_json(&schemas(&config)?)
        }
        Command::Validate {
            resource,
            config,
            file,
        } => {
            let config = setup(config.as_deref())?;
            validate(&config, &resource, &file)?;
            println!("{}: valid", file.display());
            Ok(())
        }
        Command::Query {
            resource,
            config,
            params,
        } => {
            let config = setup(config.as_deref())?;
            let query = query(&config, &resource, &params)?;
            print_json(&to_json(&query, "<query>")?)
        }
    }
}

/// Dump every schema of the configured directory.
pub fn schemas(config: &Config) -> CliResult<Value> {
    load_registry(config)?
        .to_json()
        .map_err(|e| json_error("<schemas>", e))
}

/// Validate a JSON document file against a resource schema.
///
/// A document that fails validation is reported as `CliError::Invalid`
/// carrying every violation.
pub fn validate(config: &Config, resource: &str, file: &Path) -> CliResult<()> {
    let registry = load_registry(config)?;
    let schema = registry.get(resource)?;
    let validator = config.compiler().compile(&schema)?;

    let content = fs::read_to_string(file).map_err(|e| CliError::Io {
        path: file.display().to_string(),
        reason: e.to_string(),
    })?;
    let document: Value = serde_json::from_str(&content).map_err(|e| CliError::Json {
        path: file.display().to_string(),
        reason: e.to_string(),
    })?;

    validator.validate(&document)?;
    Ok(())
}

/// Build the query a resource request with these `key=value` parameters
/// would run.
pub fn query(config: &Config, resource: &str, params: &[String]) -> CliResult<Query> {
    let registry = load_registry(config)?;
    let schema = registry.get(resource)?;

    let pairs = params
        .iter()
        .map(|param| {
            param
                .split_once('=')
                .ok_or_else(|| CliError::Parameter(param.clone()))
        })
        .collect::<CliResult<Vec<_>>>()?;

    Ok(QueryBuilder::build(&schema, &RequestParams::from_pairs(pairs)))
}

fn setup(path: Option<&Path>) -> CliResult<Config> {
    let config = Config::load(path)?;
    init_tracing(&config.log_level);
    Ok(config)
}

fn load_registry(config: &Config) -> CliResult<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry.load_dir(&config.schema_dir)?;
    Ok(registry)
}

fn to_json<T: Serialize>(value: &T, what: &str) -> CliResult<Value> {
    serde_json::to_value(value).map_err(|e| json_error(what, e))
}

fn json_error(what: &str, e: serde_json::Error) -> CliError {
    CliError::Json {
        path: what.to_string(),
        reason: e.to_string(),
    }
}

fn print_json(value: &Value) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| json_error("<stdout>", e))?;
    println!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaError;
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("user.json"),
            json!({
                "name": "user",
                "pluralName": "users",
                "properties": {
                    "name": { "type": "string" },
                    "email": { "type": "string", "format": "email" },
                    "tags": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["name", "email"]
            })
            .to_string(),
        )
        .unwrap();

        let config = Config {
            schema_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        (dir, config)
    }

    #[test]
    fn test_schemas_dump() {
        let (_dir, config) = workspace();
        let dump = schemas(&config).unwrap();
        assert_eq!(dump["user"]["pluralName"], "users");
    }

    #[test]
    fn test_validate_reports_all_violations() {
        let (dir, config) = workspace();
        let file = dir.path().join("doc.data");
        fs::write(&file, json!({ "email": "nope" }).to_string()).unwrap();

        match validate(&config, "user", &file).unwrap_err() {
            CliError::Invalid(err) => {
                assert_eq!(err.with_reason("required").count(), 1);
                assert_eq!(err.with_reason("format-mismatch").count(), 1);
            }
            other => panic!("unexpected error: {}", other),
        }

        fs::write(&file, json!({ "name": "ann", "email": "ann@example.com" }).to_string()).unwrap();
        validate(&config, "user", &file).unwrap();
    }

    #[test]
    fn test_validate_unknown_resource() {
        let (dir, config) = workspace();
        let err = validate(&config, "ghost", &dir.path().join("doc.data")).unwrap_err();
        assert!(matches!(err, CliError::Schema(SchemaError::UnknownResource(_))));
    }

    #[test]
    fn test_query_from_params() {
        let (_dir, config) = workspace();
        let params = vec![
            "name=ann".to_string(),
            "tags[]=a".to_string(),
            "orderBy=name".to_string(),
            "limit=5".to_string(),
        ];

        let built = query(&config, "user", &params).unwrap();
        assert_eq!(built.table, "users");
        assert_eq!(built.equality_filters["name"], json!("ann"));
        assert_eq!(built.membership_filters["tags"], vec![json!("a")]);
        assert_eq!(built.limit, Some(5));

        let err = query(&config, "user", &["name".to_string()]).unwrap_err();
        assert!(matches!(err, CliError::Parameter(_)));
    }

    #[test]
    fn test_serialization_failure_is_an_error() {
        let unrepresentable = HashMap::from([((1u8, 2u8), "pair")]);
        let err = to_json(&unrepresentable, "<query>").unwrap_err();
        assert!(matches!(err, CliError::Json { ref path, .. } if path == "<query>"));
        assert_eq!(err.code(), "RESOURCEKIT_CLI_IO_ERROR");

        let built = to_json(&Query::table("users"), "<query>").unwrap();
        assert_eq!(built["table"], "users");
    }
}
