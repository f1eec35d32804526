use crate::error::{EvalError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One semantic category and the functions it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    /// Category name (e.g., "Polynomial Arithmetic")
    pub name: String,

    /// Functions attributed to this category
    #[serde(default)]
    pub functions: Vec<String>,
}

/// A named grouping scheme as written in TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeDefinition {
    /// Scheme identifier (e.g., "mlkem", "mldsa")
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub category: Vec<CategoryDefinition>,
}

#[derive(Deserialize)]
struct GroupingFile {
    scheme: Vec<SchemeDefinition>,
}

/// Function → category lookup for one scheme
#[derive(Debug, Clone)]
pub struct CategoryMap {
    scheme: String,
    categories: Vec<String>,
    function_to_category: HashMap<String, String>,
}

impl CategoryMap {
    /// Build the reverse index, rejecting functions listed in two categories
    pub fn from_definition(definition: &SchemeDefinition) -> Result<Self> {
        let mut categories = Vec::new();
        let mut function_to_category = HashMap::new();

        for category in &definition.category {
            if categories.contains(&category.name) {
                return Err(EvalError::Config(format!(
                    "category '{}' defined twice in scheme '{}'",
                    category.name, definition.name
                )));
            }
            categories.push(category.name.clone());

            for function in &category.functions {
                if let Some(existing) =
                    function_to_category.insert(function.clone(), category.name.clone())
                {
                    return Err(EvalError::Config(format!(
                        "function '{}' listed in categories '{}' and '{}' of scheme '{}'",
                        function, existing, category.name, definition.name
                    )));
                }
            }
        }

        Ok(Self {
            scheme: definition.name.clone(),
            categories,
            function_to_category,
        })
    }

    /// Category of `function`
    ///
    /// # Errors
    /// `UnknownCategory` if the scheme does not list the function.
    pub fn category_of(&self, function: &str) -> Result<&str> {
        self.function_to_category
            .get(function)
            .map(String::as_str)
            .ok_or_else(|| EvalError::UnknownCategory {
                function: function.to_string(),
                scheme: self.scheme.clone(),
            })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Category names in definition order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

/// Registry of grouping schemes loaded from TOML
///
/// # Example TOML
/// ```toml
/// [[scheme]]
/// name = "mlkem"
///
///   [[scheme.category]]
///   name = "Polynomial Arithmetic"
///   functions = ["ntt", "intt"]
/// ```
#[derive(Debug, Clone)]
pub struct GroupingRegistry {
    schemes: Vec<CategoryMap>,
}

impl GroupingRegistry {
    /// Load grouping schemes from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read groupings file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content).with_context(|| {
            format!("Failed to load groupings from {}", path.as_ref().display())
        })
    }

    /// Parse grouping schemes from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: GroupingFile = toml::from_str(content)
            .map_err(|e| EvalError::Config(format!("invalid grouping TOML: {}", e)))?;

        let mut schemes: Vec<CategoryMap> = Vec::new();
        for definition in &file.scheme {
            if schemes.iter().any(|s| s.scheme == definition.name) {
                return Err(EvalError::Config(format!(
                    "scheme '{}' defined twice",
                    definition.name
                )));
            }
            schemes.push(CategoryMap::from_definition(definition)?);
        }

        Ok(Self { schemes })
    }

    /// Embedded ML-KEM / ML-DSA groupings
    pub fn default_schemes() -> Result<Self> {
        const DEFAULT_TOML: &str = include_str!("../../groupings-default.toml");
        Self::from_toml_str(DEFAULT_TOML)
    }

    /// Look up a scheme by identifier
    ///
    /// # Errors
    /// `UnknownScheme` if no scheme has that name.
    pub fn scheme(&self, name: &str) -> Result<&CategoryMap> {
        self.schemes
            .iter()
            .find(|s| s.scheme == name)
            .ok_or_else(|| EvalError::UnknownScheme {
                scheme: name.to_string(),
            })
    }

    pub fn scheme_names(&self) -> impl Iterator<Item = &str> {
        self.schemes.iter().map(|s| s.scheme.as_str())
    }
}
