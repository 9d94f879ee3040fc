//! Query template placeholder substitution.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::client::{QueryDefinition, QueryParameter};
use crate::error::{Error, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern"));

/// Binds `{name}` placeholders in a query template.
///
/// Each distinct placeholder is replaced with a store-native `@name`
/// parameter marker and paired with its runtime value. Repeated use of the
/// same name yields a single parameter entry. A placeholder without a
/// supplied value is a configuration error.
pub fn bind_template(text: &str, values: &HashMap<String, Value>) -> Result<QueryDefinition> {
    let mut parameters: Vec<QueryParameter> = Vec::new();

    for capture in PLACEHOLDER.captures_iter(text) {
        let name = &capture[1];
        let marker = format!("@{name}");
        if parameters.iter().any(|p| p.name == marker) {
            continue;
        }

        let value = values.get(name).ok_or_else(|| {
            Error::configuration(format!(
                "query placeholder '{{{name}}}' has no supplied value"
            ))
        })?;
        parameters.push(QueryParameter {
            name: marker,
            value: value.clone(),
        });
    }

    let bound = PLACEHOLDER.replace_all(text, "@$1").into_owned();
    Ok(QueryDefinition {
        text: bound,
        parameters,
    })
}
