//! # Descriptor Sources
//!
//! Stateless parse-then-normalize adapters. Each source format maps onto one
//! canonical [`RouteDescriptor`](crate::domain::RouteDescriptor).
//!
//! - `annotations`: ingress-like objects configured through annotations
//! - `manifest`: structured route manifests

pub mod annotations;
pub mod manifest;

pub use annotations::AnnotatedRoute;
pub use manifest::RouteManifest;

use crate::domain::RouteDescriptor;
use crate::errors::{EdgeplaneError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// A file of route sources, in either format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouteFile {
    #[serde(default)]
    pub routes: Vec<RouteManifest>,
    #[serde(default)]
    pub annotated_routes: Vec<AnnotatedRoute>,
}

impl RouteFile {
    /// Parse YAML (a superset of JSON)
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Read a route file, choosing the parser from the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| EdgeplaneError::Io {
            source: e,
            context: format!("Failed to read route file '{}'", path.display()),
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// Normalize every entry. References must be unique across the file.
    pub fn descriptors(&self) -> Result<Vec<RouteDescriptor>> {
        let mut descriptors = Vec::with_capacity(self.routes.len() + self.annotated_routes.len());
        for route in &self.routes {
            descriptors.push(manifest::normalize(route)?);
        }
        for route in &self.annotated_routes {
            descriptors.push(annotations::normalize(route)?);
        }

        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if !seen.insert(&descriptor.reference) {
                return Err(EdgeplaneError::validation_field(
                    format!("route '{}' is declared more than once", descriptor.reference),
                    "routes",
                ));
            }
        }

        debug!(descriptors = descriptors.len(), "Route file normalized");
        Ok(descriptors)
    }
}
