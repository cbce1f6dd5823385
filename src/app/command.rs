use crate::tracker::{Mixpanel, Properties};
use anyhow::{Context, Result, bail};
use clap::Subcommand;
use serde_json::Value;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Track an event
    Track {
        distinct_id: String,
        event: String,
        /// Event properties as key=value
        properties: Vec<String>,
    },
    /// Import an event older than five days (needs --api-key)
    Import {
        distinct_id: String,
        event: String,
        properties: Vec<String>,
    },
    /// Alias a new id to an existing profile
    Alias {
        alias_id: String,
        original_id: String,
    },
    /// Set profile properties
    Set {
        distinct_id: String,
        #[arg(required = true)]
        properties: Vec<String>,
    },
    /// Set profile properties without overwriting existing values
    SetOnce {
        distinct_id: String,
        #[arg(required = true)]
        properties: Vec<String>,
    },
    /// Add to numeric profile properties
    Add {
        distinct_id: String,
        #[arg(required = true, allow_negative_numbers = true)]
        properties: Vec<String>,
    },
    /// Append values to list profile properties
    Append {
        distinct_id: String,
        #[arg(required = true)]
        properties: Vec<String>,
    },
    /// Merge values into list profile properties
    Union {
        distinct_id: String,
        #[arg(required = true)]
        properties: Vec<String>,
    },
    /// Remove profile properties
    Unset {
        distinct_id: String,
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Delete a profile
    Delete { distinct_id: String },
    /// Record a transaction on a profile
    Charge {
        distinct_id: String,
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        properties: Vec<String>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Track { .. } => "track",
            Command::Import { .. } => "import",
            Command::Alias { .. } => "alias",
            Command::Set { .. } => "set",
            Command::SetOnce { .. } => "set-once",
            Command::Add { .. } => "add",
            Command::Append { .. } => "append",
            Command::Union { .. } => "union",
            Command::Unset { .. } => "unset",
            Command::Delete { .. } => "delete",
            Command::Charge { .. } => "charge",
        }
    }

    pub async fn execute(&self, mixpanel: &Mixpanel) -> Result<()> {
        match self {
            Command::Track {
                distinct_id,
                event,
                properties,
            } => {
                let properties = optional(parse_properties(properties)?);
                mixpanel.track(distinct_id, event, properties).await?;
            }
            Command::Import {
                distinct_id,
                event,
                properties,
            } => {
                let properties = optional(parse_properties(properties)?);
                mixpanel.import(distinct_id, event, properties).await?;
            }
            Command::Alias {
                alias_id,
                original_id,
            } => mixpanel.alias(alias_id, original_id).await?,
            Command::Set {
                distinct_id,
                properties,
            } => {
                mixpanel
                    .people_set(distinct_id, parse_properties(properties)?)
                    .await?;
            }
            Command::SetOnce {
                distinct_id,
                properties,
            } => {
                mixpanel
                    .people_set_once(distinct_id, parse_properties(properties)?)
                    .await?;
            }
            Command::Add {
                distinct_id,
                properties,
            } => {
                mixpanel
                    .people_increment(distinct_id, parse_numeric_properties(properties)?)
                    .await?;
            }
            Command::Append {
                distinct_id,
                properties,
            } => {
                mixpanel
                    .people_append(distinct_id, parse_properties(properties)?)
                    .await?;
            }
            Command::Union {
                distinct_id,
                properties,
            } => {
                mixpanel
                    .people_union(distinct_id, parse_list_properties(properties)?)
                    .await?;
            }
            Command::Unset { distinct_id, names } => {
                mixpanel.people_unset(distinct_id, names.clone()).await?;
            }
            Command::Delete { distinct_id } => mixpanel.people_delete(distinct_id).await?,
            Command::Charge {
                distinct_id,
                amount,
                properties,
            } => {
                let properties = optional(parse_properties(properties)?);
                mixpanel
                    .people_track_charge(distinct_id, *amount, properties)
                    .await?;
            }
        }
        Ok(())
    }
}

/// Parses `key=value` arguments into string-valued properties.
///
/// Only the first `=` splits, so values may contain `=`. A later duplicate
/// key wins.
pub fn parse_properties(args: &[String]) -> Result<Properties> {
    let mut properties = Properties::new();
    for arg in args {
        let (key, value) = split_pair(arg)?;
        properties.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(properties)
}

/// Like [`parse_properties`], but every value must be a number.
pub fn parse_numeric_properties(args: &[String]) -> Result<Properties> {
    let mut properties = Properties::new();
    for arg in args {
        let (key, value) = split_pair(arg)?;
        let number: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("value for '{key}' is not a number: '{value}'"))?;
        let number = serde_json::Number::from_f64(number)
            .with_context(|| format!("value for '{key}' is not finite: '{value}'"))?;
        properties.insert(key.to_string(), Value::Number(number));
    }
    Ok(properties)
}

/// Like [`parse_properties`], with each value wrapped in a one-element list.
pub fn parse_list_properties(args: &[String]) -> Result<Properties> {
    Ok(parse_properties(args)?
        .into_iter()
        .map(|(key, value)| (key, Value::Array(vec![value])))
        .collect())
}

fn split_pair(arg: &str) -> Result<(&str, &str)> {
    let Some((key, value)) = arg.split_once('=') else {
        bail!("invalid property '{arg}': expected key=value");
    };
    if key.is_empty() {
        bail!("invalid property '{arg}': empty key");
    }
    Ok((key, value))
}

fn optional(properties: Properties) -> Option<Properties> {
    (!properties.is_empty()).then_some(properties)
}
