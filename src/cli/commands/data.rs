use clap::Subcommand;

use crate::cli::utils::{output_success, output_value, parse_pairs, read_body};
use crate::cli::Context;

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "List records of a resource")]
    List {
        #[arg(help = "Resource name (customers, orders, products, ...)")]
        resource: String,
        #[arg(long = "filter", short = 'f', help = "Query filter as key=value (repeatable)")]
        filters: Vec<String>,
        #[arg(long, help = "Maximum number of records")]
        limit: Option<i64>,
        #[arg(long, help = "Number of records to skip")]
        offset: Option<i64>,
        #[arg(long, help = "Include deactivated records")]
        include_inactive: bool,
    },

    #[command(about = "Get one record by id")]
    Get {
        #[arg(help = "Resource name")]
        resource: String,
        #[arg(help = "Record id")]
        id: i64,
    },

    #[command(about = "Create a record from JSON (--data or stdin)")]
    Create {
        #[arg(help = "Resource name")]
        resource: String,
        #[arg(long, short = 'd', help = "JSON body (reads stdin when omitted)")]
        data: Option<String>,
    },

    #[command(about = "Update a record from JSON (--data or stdin)")]
    Update {
        #[arg(help = "Resource name")]
        resource: String,
        #[arg(help = "Record id")]
        id: i64,
        #[arg(long, short = 'd', help = "JSON body (reads stdin when omitted)")]
        data: Option<String>,
    },

    #[command(about = "Delete or deactivate a record")]
    Delete {
        #[arg(help = "Resource name")]
        resource: String,
        #[arg(help = "Record id")]
        id: i64,
    },
}

pub async fn handle(cmd: DataCommands, ctx: &Context) -> anyhow::Result<()> {
    let client = ctx.client()?;

    match cmd {
        DataCommands::List { resource, filters, limit, offset, include_inactive } => {
            let mut query = parse_pairs(&filters)?;
            if let Some(limit) = limit {
                query.push(("limit".to_string(), limit.to_string()));
            }
            if let Some(offset) = offset {
                query.push(("offset".to_string(), offset.to_string()));
            }
            if include_inactive {
                query.push(("include_inactive".to_string(), "true".to_string()));
            }

            let rows = client.list(&resource, &query).await?;
            output_value(&ctx.output, &rows)
        }
        DataCommands::Get { resource, id } => {
            let record = client.get(&resource, id).await?;
            output_value(&ctx.output, &record)
        }
        DataCommands::Create { resource, data } => {
            let body = read_body(data)?;
            let created = client.create(&resource, &body).await?;
            let id = created.get("id").map(|v| v.to_string()).unwrap_or_default();
            output_success(&ctx.output, &format!("Created {} #{}", resource, id), Some(created))
        }
        DataCommands::Update { resource, id, data } => {
            let body = read_body(data)?;
            let updated = client.update(&resource, id, &body).await?;
            output_success(&ctx.output, &format!("Updated {} #{}", resource, id), Some(updated))
        }
        DataCommands::Delete { resource, id } => {
            let result = client.delete(&resource, id).await?;
            output_success(&ctx.output, &format!("Deleted {} #{}", resource, id), Some(result))
        }
    }
}
