//! Command-line definition and argument conversion

use clap::builder::RangedU64ValueParser;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use discovery_api::{DiscoveryDomain, EntityKind};
use discovery_collection::Conditions;
use serde_json::Value;

/// Build the command-line interface
pub(crate) fn cli() -> Command {
    Command::new("discovery")
        .version(discovery_api::VERSION)
        .about("Browse discovery listings page by page")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .help("TOML client configuration"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .value_name("URL")
                .help("Server root, overrides the configuration"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("Log filter used when RUST_LOG is unset"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Log output format"),
        )
        .subcommand(
            Command::new("page")
                .about("Load one page of a listing")
                .args(query_args())
                .arg(
                    Arg::new("page")
                        .long("page")
                        .default_value("0")
                        .value_parser(value_parser!(usize))
                        .help("Zero-based page number"),
                ),
        )
        .subcommand(
            Command::new("ids")
                .about("Print the ordered ids of a listing")
                .args(query_args()),
        )
}

fn query_args() -> Vec<Arg> {
    vec![
        Arg::new("kind")
            .long("kind")
            .default_value("samples")
            .value_parser(|s: &str| s.parse::<EntityKind>().map_err(|e| e.to_string()))
            .help("samples, projects, visualizations or workflow_runs"),
        Arg::new("domain")
            .long("domain")
            .default_value("my_data")
            .value_parser(|s: &str| s.parse::<DiscoveryDomain>().map_err(|e| e.to_string()))
            .help("my_data, all_data, public or snapshot"),
        Arg::new("page-size")
            .long("page-size")
            .value_parser(RangedU64ValueParser::<usize>::new().range(1..))
            .help("Rows per page, overrides the configuration"),
        Arg::new("condition")
            .long("condition")
            .short('c')
            .action(ArgAction::Append)
            .value_name("KEY=VALUE")
            .value_parser(parse_condition)
            .help("Query condition; JSON values are decoded, repeated keys collect into a list"),
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Output as JSON"),
    ]
}

/// Listing selected by a subcommand
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Query {
    pub(crate) kind: EntityKind,
    pub(crate) domain: DiscoveryDomain,
    pub(crate) conditions: Conditions,
    pub(crate) page_size: Option<usize>,
    pub(crate) json: bool,
}

impl Query {
    pub(crate) fn from_matches(args: &ArgMatches) -> Self {
        let pairs = args
            .get_many::<(String, Value)>("condition")
            .into_iter()
            .flatten()
            .cloned();
        Self {
            kind: args
                .get_one::<EntityKind>("kind")
                .copied()
                .unwrap_or(EntityKind::Samples),
            domain: args
                .get_one::<DiscoveryDomain>("domain")
                .copied()
                .unwrap_or_default(),
            conditions: collect_conditions(pairs),
            page_size: args.get_one::<usize>("page-size").copied(),
            json: args.get_flag("json"),
        }
    }
}

/// Split `key=value`; the value is decoded as JSON when it parses
pub(crate) fn parse_condition(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty condition key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
    Ok((key.to_string(), value))
}

/// Build conditions, gathering repeated keys into an array
pub(crate) fn collect_conditions(pairs: impl IntoIterator<Item = (String, Value)>) -> Conditions {
    let mut conditions = Conditions::new();
    for (key, value) in pairs {
        let merged = match conditions.get(&key) {
            Some(Value::Array(existing)) => {
                let mut items = existing.clone();
                items.push(value);
                Value::Array(items)
            }
            Some(existing) => Value::Array(vec![existing.clone(), value]),
            None => value,
        };
        conditions.insert(key, merged);
    }
    conditions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parse_condition_decodes_json() {
        assert_eq!(
            parse_condition("search=lung").unwrap(),
            ("search".to_string(), json!("lung"))
        );
        assert_eq!(
            parse_condition("sampleIds=[1,2]").unwrap(),
            ("sampleIds".to_string(), json!([1, 2]))
        );
        assert_eq!(
            parse_condition("projectId=7").unwrap(),
            ("projectId".to_string(), json!(7))
        );
        assert_eq!(
            parse_condition("note=a=b").unwrap(),
            ("note".to_string(), json!("a=b"))
        );
        assert!(parse_condition("nokey").is_err());
        assert!(parse_condition("=x").is_err());
    }

    #[test]
    fn repeated_keys_collect() {
        let conditions = collect_conditions(vec![
            ("host".to_string(), json!("human")),
            ("host".to_string(), json!("mosquito")),
            ("host".to_string(), json!("tick")),
            ("search".to_string(), json!("x")),
        ]);
        assert_eq!(conditions.get("host"), Some(&json!(["human", "mosquito", "tick"])));
        assert_eq!(conditions.get("search"), Some(&json!("x")));
    }

    #[test]
    fn page_subcommand_arguments() {
        let matches = cli()
            .try_get_matches_from([
                "discovery",
                "page",
                "--kind",
                "projects",
                "--domain",
                "public",
                "--page",
                "3",
                "--page-size",
                "10",
                "-c",
                "search=flu",
                "--json",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "page");

        let query = Query::from_matches(args);
        assert_eq!(query.kind, EntityKind::Projects);
        assert_eq!(query.domain, DiscoveryDomain::Public);
        assert_eq!(query.page_size, Some(10));
        assert_eq!(query.conditions.get("search"), Some(&json!("flu")));
        assert!(query.json);
        assert_eq!(args.get_one::<usize>("page").copied(), Some(3));
    }

    #[test]
    fn defaults_and_rejections() {
        let matches = cli()
            .try_get_matches_from(["discovery", "ids", "--base-url", "http://x"])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>("base-url").map(String::as_str),
            Some("http://x")
        );
        assert_eq!(
            matches.get_one::<String>("log-level").map(String::as_str),
            Some("info")
        );
        let (_, args) = matches.subcommand().unwrap();
        let query = Query::from_matches(args);
        assert_eq!(query.kind, EntityKind::Samples);
        assert_eq!(query.domain, DiscoveryDomain::MyData);
        assert!(query.conditions.is_empty());
        assert!(!query.json);

        assert!(cli()
            .try_get_matches_from(["discovery", "page", "--kind", "users"])
            .is_err());
        assert!(cli()
            .try_get_matches_from(["discovery", "page", "--page-size", "0"])
            .is_err());
    }
}
