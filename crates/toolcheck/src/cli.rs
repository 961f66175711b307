//! Command-line interface.
//!
//! Argument parsing with `clap` derive and the command implementations.
//! Commands return their output as text so `main` only prints it.

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use toolcheck_core::inventory::Entity;
use toolcheck_core::query::{Filter, FilterOp, Query, SortDirection, SortKey};
use toolcheck_core::storage::{EntityUpdate, Items, PageRequest, Repository};

use crate::config::Config;
use crate::state::{Cached, Repositories};
use crate::storage::{ReadOptions, RefreshMode};

/// toolcheck - cached inventory repositories for tool check-in management
#[derive(Parser, Debug)]
#[command(name = "toolcheck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Cache TTL in seconds
    #[arg(long, global = true, env = "CACHE_TTL_SECONDS")]
    pub cache_ttl: Option<u64>,

    /// How cached reads are recomputed after a write (background or inline)
    #[arg(long, global = true, env = "CACHE_REFRESH_MODE")]
    pub refresh_mode: Option<RefreshMode>,
}

impl Cli {
    /// Overrides `config` with any flags given on the command line.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(ttl) = self.cache_ttl {
            config.cache_ttl_seconds = ttl;
        }
        if let Some(mode) = self.refresh_mode {
            config.refresh_mode = mode;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List one page of an entity type
    List {
        entity: EntityKind,

        /// 1-based page index
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Page size
        #[arg(long, default_value_t = 10)]
        limit: u32,

        /// Filter as `field<op>value`, op one of = != > >= < <= ~
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<Filter>,

        /// Sort key as `field` or `field:desc`
        #[arg(long = "sort", value_parser = parse_sort)]
        sort: Vec<SortKey>,

        /// Read through the cache
        #[arg(long)]
        cached: bool,
    },

    /// Get a record by id (read through the cache)
    Get { entity: EntityKind, id: i64 },

    /// Apply a JSON merge patch to a record
    Update {
        entity: EntityKind,
        id: i64,
        /// JSON object with the fields to change, e.g. '{"quantity": 2}'
        data: String,
    },

    /// Cached page read, update, re-read, then print cache stats
    Demo,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Tools,
    Projects,
    Personnel,
    Checkins,
    Users,
    Images,
    ToolRequests,
    ToolRepairRequests,
    ConditionTypes,
    StatusTypes,
}

/// Runs `$body` with `$repo` bound to the repository for `$kind`.
macro_rules! with_repository {
    ($repos:expr, $kind:expr, |$repo:ident| $body:expr) => {
        match $kind {
            EntityKind::Tools => {
                let $repo = &$repos.tools;
                $body
            }
            EntityKind::Projects => {
                let $repo = &$repos.projects;
                $body
            }
            EntityKind::Personnel => {
                let $repo = &$repos.personnel;
                $body
            }
            EntityKind::Checkins => {
                let $repo = &$repos.checkins;
                $body
            }
            EntityKind::Users => {
                let $repo = &$repos.users;
                $body
            }
            EntityKind::Images => {
                let $repo = &$repos.images;
                $body
            }
            EntityKind::ToolRequests => {
                let $repo = &$repos.tool_requests;
                $body
            }
            EntityKind::ToolRepairRequests => {
                let $repo = &$repos.tool_repair_requests;
                $body
            }
            EntityKind::ConditionTypes => {
                let $repo = &$repos.condition_types;
                $body
            }
            EntityKind::StatusTypes => {
                let $repo = &$repos.status_types;
                $body
            }
        }
    };
}

const FILTER_OPS: [(&str, FilterOp); 7] = [
    (">=", FilterOp::Gte),
    ("<=", FilterOp::Lte),
    ("!=", FilterOp::Ne),
    ("=", FilterOp::Eq),
    (">", FilterOp::Gt),
    ("<", FilterOp::Lt),
    ("~", FilterOp::Contains),
];

/// Parses `field<op>value`. The value is read as JSON when it parses,
/// otherwise as a plain string.
pub fn parse_filter(s: &str) -> Result<Filter, String> {
    let (position, token, op) = FILTER_OPS
        .iter()
        .filter_map(|(token, op)| s.find(token).map(|pos| (pos, *token, *op)))
        // Earliest operator wins; at the same position the longer one does.
        .min_by_key(|(pos, token, _)| (*pos, std::cmp::Reverse(token.len())))
        .ok_or_else(|| format!("'{s}' has no operator (= != > >= < <= ~)"))?;

    let field = s[..position].trim();
    if field.is_empty() {
        return Err(format!("'{s}' has no field name"));
    }
    let raw = s[position + token.len()..].trim();
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));

    Ok(Filter::new(field, op, value))
}

/// Parses `field`, `field:asc` or `field:desc`.
pub fn parse_sort(s: &str) -> Result<SortKey, String> {
    let (field, direction) = match s.split_once(':') {
        None => (s, SortDirection::Asc),
        Some((field, "asc")) => (field, SortDirection::Asc),
        Some((field, "desc")) => (field, SortDirection::Desc),
        Some((_, other)) => return Err(format!("unknown sort direction '{other}'")),
    };
    if field.is_empty() {
        return Err("sort key needs a field name".to_string());
    }
    Ok(SortKey {
        field: field.to_string(),
        direction,
    })
}

async fn list<T: Entity>(
    repo: &Cached<T>,
    query: &Query,
    page: PageRequest,
    cached: bool,
) -> anyhow::Result<String> {
    let options = ReadOptions {
        cached,
        params: None,
    };
    let page = repo.get_all_paged_with(query, page, options).await?;
    Ok(serde_json::to_string_pretty(&page)?)
}

async fn get<T: Entity>(repo: &Cached<T>, id: i64) -> anyhow::Result<String> {
    match repo.get_by_id(id).await? {
        Some(entity) => Ok(serde_json::to_string_pretty(&entity)?),
        None => anyhow::bail!("{} {id} not found", T::NAME),
    }
}

async fn update<T: Entity>(repo: &Cached<T>, id: i64, data: Value) -> anyhow::Result<String> {
    let updated = repo.update(Items::one(EntityUpdate::new(id, data))).await?;
    Ok(serde_json::to_string_pretty(&updated)?)
}

async fn demo(repos: &Repositories) -> anyhow::Result<String> {
    let tools = &repos.tools;
    let query = Query::all();
    let page = PageRequest::new(1, 10);
    let mut out = Vec::new();

    let before = tools
        .get_all_paged_with(&query, page, ReadOptions::cached())
        .await?;
    let quantity_of = |items: &[toolcheck_core::inventory::Tool]| {
        items.iter().find(|t| t.id == 3).map(|t| t.quantity)
    };
    out.push(format!(
        "page 1: {} of {} tools, tool 3 quantity = {:?}",
        before.items.len(),
        before.total_count,
        quantity_of(&before.items)
    ));

    tools
        .update(Items::one(EntityUpdate::new(3, serde_json::json!({"quantity": 2}))))
        .await?;
    out.push(format!(
        "updated tool 3 quantity to 2 ({} refresh)",
        tools.refresh_mode()
    ));

    let after = tools
        .get_all_paged_with(&query, page, ReadOptions::cached())
        .await?;
    out.push(format!(
        "page 1 again: tool 3 quantity = {:?}",
        quantity_of(&after.items)
    ));

    let stats = tools.cache().stats();
    out.push(format!(
        "cache: {} hits, {} misses, keys = {:?}",
        stats.hits,
        stats.misses,
        tools.cached_keys()
    ));
    Ok(out.join("\n"))
}

/// Runs `command` against `repos`, returning what to print.
pub async fn run(command: Command, repos: &Repositories) -> anyhow::Result<String> {
    match command {
        Command::List {
            entity,
            page,
            limit,
            filters,
            sort,
            cached,
        } => {
            let query = Query { filters, sort };
            let page = PageRequest::new(page, limit);
            with_repository!(repos, entity, |repo| list(repo, &query, page, cached).await)
        }
        Command::Get { entity, id } => {
            with_repository!(repos, entity, |repo| get(repo, id).await)
        }
        Command::Update { entity, id, data } => {
            let data: Value = serde_json::from_str(&data)
                .map_err(|e| anyhow::anyhow!("update data is not valid JSON: {e}"))?;
            with_repository!(repos, entity, |repo| update(repo, id, data).await)
        }
        Command::Demo => demo(repos).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_filter_operators() {
        assert_eq!(
            parse_filter("quantity>=2").unwrap(),
            Filter::new("quantity", FilterOp::Gte, 2)
        );
        assert_eq!(
            parse_filter("quantity>2").unwrap(),
            Filter::new("quantity", FilterOp::Gt, 2)
        );
        assert_eq!(
            parse_filter("name=Hammer").unwrap(),
            Filter::new("name", FilterOp::Eq, "Hammer")
        );
        assert_eq!(
            parse_filter("name~saw").unwrap(),
            Filter::new("name", FilterOp::Contains, "saw")
        );
        assert_eq!(
            parse_filter("description!=null").unwrap(),
            Filter::new("description", FilterOp::Ne, Value::Null)
        );
    }

    #[test]
    fn test_parse_filter_json_values() {
        assert_eq!(
            parse_filter("id=[1,2]").unwrap().value,
            json!([1, 2])
        );
        assert_eq!(parse_filter("active=true").unwrap().value, json!(true));
        assert_eq!(parse_filter("name=\"1\"").unwrap().value, json!("1"));
    }

    #[test]
    fn test_parse_filter_rejects_malformed() {
        assert!(parse_filter("quantity").is_err());
        assert!(parse_filter("=3").is_err());
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!(
            parse_sort("name").unwrap(),
            SortKey {
                field: "name".to_string(),
                direction: SortDirection::Asc
            }
        );
        assert_eq!(parse_sort("quantity:desc").unwrap().direction, SortDirection::Desc);
        assert!(parse_sort("name:sideways").is_err());
        assert!(parse_sort(":desc").is_err());
    }

    #[test]
    fn test_cli_parses_list() {
        let cli = Cli::try_parse_from([
            "toolcheck",
            "list",
            "tool-requests",
            "--page",
            "2",
            "--filter",
            "quantity>=2",
            "--sort",
            "name:desc",
            "--cached",
        ])
        .unwrap();

        match cli.command {
            Command::List {
                entity,
                page,
                limit,
                filters,
                sort,
                cached,
            } => {
                assert_eq!(entity, EntityKind::ToolRequests);
                assert_eq!(page, 2);
                assert_eq!(limit, 10);
                assert_eq!(filters.len(), 1);
                assert_eq!(sort[0].direction, SortDirection::Desc);
                assert!(cached);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "toolcheck",
            "--cache-ttl",
            "5",
            "--refresh-mode",
            "inline",
            "demo",
        ])
        .unwrap();
        let config = cli.apply(Config {
            cache_ttl_seconds: 300,
            cache_max_entries: 10,
            refresh_mode: RefreshMode::Background,
            sqlite_path: String::new(),
        });

        assert_eq!(config.cache_ttl_seconds, 5);
        assert_eq!(config.refresh_mode, RefreshMode::Inline);
    }

    #[cfg(feature = "inmemory")]
    mod commands {
        use super::*;

        async fn repositories() -> Repositories {
            Repositories::in_memory(&Config {
                cache_ttl_seconds: 60,
                cache_max_entries: 100,
                refresh_mode: RefreshMode::Inline,
                sqlite_path: String::new(),
            })
            .await
            .unwrap()
        }

        #[tokio::test]
        async fn test_demo_shows_updated_quantity() {
            let repos = repositories().await;

            let output = run(Command::Demo, &repos).await.unwrap();

            assert!(output.contains("tool 3 quantity = Some(3)"), "{output}");
            assert!(output.contains("page 1 again: tool 3 quantity = Some(2)"), "{output}");
        }

        #[tokio::test]
        async fn test_get_and_update_commands() {
            let repos = repositories().await;

            let updated = run(
                Command::Update {
                    entity: EntityKind::Tools,
                    id: 1,
                    data: r#"{"name": "Claw Hammer"}"#.to_string(),
                },
                &repos,
            )
            .await
            .unwrap();
            assert!(updated.contains("Claw Hammer"));

            let fetched = run(
                Command::Get {
                    entity: EntityKind::Tools,
                    id: 1,
                },
                &repos,
            )
            .await
            .unwrap();
            assert!(fetched.contains("Claw Hammer"));

            let missing = run(
                Command::Get {
                    entity: EntityKind::Checkins,
                    id: 1,
                },
                &repos,
            )
            .await;
            assert_eq!(missing.unwrap_err().to_string(), "Checkin 1 not found");
        }

        #[tokio::test]
        async fn test_list_command_filters() {
            let repos = repositories().await;

            let output = run(
                Command::List {
                    entity: EntityKind::ConditionTypes,
                    page: 1,
                    limit: 10,
                    filters: vec![parse_filter("name=Worn").unwrap()],
                    sort: Vec::new(),
                    cached: true,
                },
                &repos,
            )
            .await
            .unwrap();

            let page: Value = serde_json::from_str(&output).unwrap();
            assert_eq!(page["total_count"], json!(1));
            assert_eq!(page["items"][0]["name"], json!("Worn"));
        }
    }
}
