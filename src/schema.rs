//! Schema extraction for provider resource types.
//!
//! Each registered resource type contributes its config and outputs JSON
//! Schemas, generated from the Rust types with `schemars`. Provider builds
//! dump them as a JSON array on stdout; the platform stores the array with
//! the build and validates submitted configs against it.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> Result<(), pragma_sdk::ProviderError> {
//!     let provider = my_provider::provider()?;
//!     if std::env::args().any(|a| a == "--extract-schemas") {
//!         return pragma_sdk::schema::print_schemas(&[&provider]);
//!     }
//!     // ...
//! }
//! ```

use std::io::Write;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ConfigError, ProviderError};
use crate::provider::Provider;
use crate::resource::{Config, Outputs};

/// Schemas of one resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSchema {
    /// Provider name.
    pub provider: String,
    /// Resource type name.
    pub resource: String,
    /// JSON Schema of the config.
    pub config_schema: Value,
    /// JSON Schema of the outputs.
    pub outputs_schema: Value,
}

/// JSON Schema of a config type.
///
/// Unknown properties are always forbidden at the top level, whether or not
/// the type carries `#[serde(deny_unknown_fields)]`.
pub fn config_schema<C: Config>() -> Value {
    strict_schema::<C>()
}

/// JSON Schema of an outputs type, with the same top-level strictness as
/// [`config_schema`].
pub fn outputs_schema<O: Outputs>() -> Value {
    strict_schema::<O>()
}

fn strict_schema<T: JsonSchema>() -> Value {
    let mut schema = schemars::schema_for!(T).to_value();
    forbid_additional_properties(&mut schema);
    schema
}

fn forbid_additional_properties(schema: &mut Value) {
    let Some(obj) = schema.as_object_mut() else {
        return;
    };
    if obj.get("type") == Some(&Value::String("object".to_string()))
        && !obj.contains_key("additionalProperties")
    {
        obj.insert("additionalProperties".to_string(), Value::Bool(false));
    }
}

/// Schemas of every resource type of every provider.
///
/// Ordered by provider name, then resource name.
pub fn extract_schemas(providers: &[&Provider]) -> Vec<ResourceSchema> {
    let mut schemas: Vec<_> = providers.iter().flat_map(|p| p.schemas()).collect();
    schemas.sort_by(|a, b| (&a.provider, &a.resource).cmp(&(&b.provider, &b.resource)));
    debug!(count = schemas.len(), "extracted resource schemas");
    schemas
}

/// Write the schemas as a pretty-printed JSON array.
pub fn write_schemas<W: Write>(providers: &[&Provider], mut writer: W) -> Result<(), ProviderError> {
    let schemas = extract_schemas(providers);
    if schemas.is_empty() {
        warn!("no resource types registered, writing an empty schema list");
    }
    serde_json::to_writer_pretty(&mut writer, &schemas)?;
    writeln!(writer)?;
    Ok(())
}

/// Write the schemas to stdout.
pub fn print_schemas(providers: &[&Provider]) -> Result<(), ProviderError> {
    let stdout = std::io::stdout();
    write_schemas(providers, stdout.lock())
}

/// Detect the provider package name from the `Cargo.toml` in `dir`.
///
/// Checks, in order:
/// 1. `[package.metadata.pragma] package`
/// 2. `[package] name`, if it ends with `-provider`, with `-` turned into `_`
///
/// Returns `Ok(None)` when there is no manifest or neither rule matches.
pub fn detect_provider_package(dir: &Path) -> Result<Option<String>, ConfigError> {
    let manifest = dir.join("Cargo.toml");
    if !manifest.exists() {
        return Ok(None);
    }
    let path = manifest.display().to_string();
    let content = std::fs::read_to_string(&manifest).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let table: toml::Table = content
        .parse()
        .map_err(|source| ConfigError::Toml { path, source })?;

    let package = table.get("package");
    let explicit = package
        .and_then(|p| p.get("metadata"))
        .and_then(|m| m.get("pragma"))
        .and_then(|p| p.get("package"))
        .and_then(|p| p.as_str());
    if let Some(name) = explicit {
        return Ok(Some(name.to_string()));
    }

    let name = package.and_then(|p| p.get("name")).and_then(|n| n.as_str());
    Ok(name
        .filter(|n| n.ends_with("-provider"))
        .map(|n| n.replace('-', "_")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::references::{Dependency, Field};
    use crate::resource::{ResourceHandler, ResourceOf};
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
    struct AppConfig {
        /// Application name.
        name: Field<String>,
        replicas: Option<u32>,
        database: Dependency<ResourceOf<Db>>,
    }
    impl Config for AppConfig {}

    #[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
    struct AppOutputs {
        url: String,
    }
    impl Outputs for AppOutputs {}

    struct App;

    #[async_trait::async_trait]
    impl ResourceHandler for App {
        type Config = AppConfig;
        type Outputs = AppOutputs;
    }

    #[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
    #[serde(deny_unknown_fields)]
    struct DbConfig {
        size: i64,
    }
    impl Config for DbConfig {}

    #[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
    struct DbOutputs {
        connection_url: String,
    }
    impl Outputs for DbOutputs {}

    struct Db;

    #[async_trait::async_trait]
    impl ResourceHandler for Db {
        type Config = DbConfig;
        type Outputs = DbOutputs;
    }

    fn provider() -> Result<Provider, ProviderError> {
        let mut provider = Provider::new("acme");
        provider.register("app", App)?;
        provider.register("database", Db)?;
        Ok(provider)
    }

    #[test]
    fn test_config_schema_forbids_extra_properties() {
        let schema = config_schema::<AppConfig>();
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["additionalProperties"], json!(false));

        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("name")));
        assert!(required.contains(&json!("database")));
        assert!(!required.contains(&json!("replicas")));
    }

    #[test]
    fn test_outputs_schema_forbids_extra_properties() {
        let schema = outputs_schema::<AppOutputs>();
        assert_eq!(schema["additionalProperties"], json!(false));
        assert!(schema["properties"].get("url").is_some());

        assert!(crate::validation::is_valid(&schema, &json!({"url": "http://app"})));
        assert!(!crate::validation::is_valid(
            &schema,
            &json!({"url": "http://app", "port": 80})
        ));
    }

    #[test]
    fn test_extract_schemas_orders_by_resource() {
        let provider = provider().unwrap();
        let schemas = extract_schemas(&[&provider]);

        let names: Vec<_> = schemas.iter().map(|s| s.resource.as_str()).collect();
        assert_eq!(names, vec!["app", "database"]);
        assert!(schemas.iter().all(|s| s.provider == "acme"));
        assert!(schemas[1].config_schema["properties"].get("size").is_some());
        assert!(schemas[1].outputs_schema["properties"]
            .get("connection_url")
            .is_some());
    }

    #[test]
    fn test_field_schema_accepts_reference() {
        let schema = config_schema::<AppConfig>();
        let reference = json!({
            "provider": "acme",
            "resource": "database",
            "name": "main",
            "field": "outputs.connection_url"
        });
        let dependency = json!({
            "__dependency__": true,
            "provider": "acme",
            "resource": "database",
            "name": "main"
        });

        assert!(crate::validation::is_valid(
            &schema,
            &json!({"name": "web", "database": dependency})
        ));
        assert!(crate::validation::is_valid(
            &schema,
            &json!({"name": reference, "database": dependency})
        ));
        assert!(!crate::validation::is_valid(
            &schema,
            &json!({"name": 5, "database": dependency})
        ));
    }

    #[test]
    fn test_write_schemas_outputs_json_array() {
        let provider = provider().unwrap();
        let mut out = Vec::new();
        write_schemas(&[&provider], &mut out).unwrap();

        let parsed: Vec<ResourceSchema> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].resource, "app");
    }

    #[test]
    fn test_extract_schemas_orders_by_provider() {
        let mut zeta = Provider::new("zeta");
        zeta.register("app", App).unwrap();
        let acme = provider().unwrap();

        let schemas = extract_schemas(&[&zeta, &acme]);
        let keys: Vec<_> = schemas
            .iter()
            .map(|s| (s.provider.as_str(), s.resource.as_str()))
            .collect();
        assert_eq!(keys, vec![("acme", "app"), ("acme", "database"), ("zeta", "app")]);
    }

    #[test]
    fn test_write_schemas_empty_provider() {
        let provider = Provider::new("empty");
        let mut out = Vec::new();
        write_schemas(&[&provider], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "[]");
    }

    #[test]
    fn test_detect_provider_package_prefers_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"postgres-provider\"\n\n[package.metadata.pragma]\npackage = \"pg_custom\"\n",
        )
        .unwrap();

        assert_eq!(
            detect_provider_package(dir.path()).unwrap(),
            Some("pg_custom".to_string())
        );
    }

    #[test]
    fn test_detect_provider_package_from_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"postgres-provider\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        assert_eq!(
            detect_provider_package(dir.path()).unwrap(),
            Some("postgres_provider".to_string())
        );

        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"something-else\"\n",
        )
        .unwrap();
        assert_eq!(detect_provider_package(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_detect_provider_package_missing_or_invalid() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_provider_package(dir.path()).unwrap(), None);

        std::fs::write(dir.path().join("Cargo.toml"), "[package\n").unwrap();
        assert!(matches!(
            detect_provider_package(dir.path()),
            Err(ConfigError::Toml { .. })
        ));
    }
}
