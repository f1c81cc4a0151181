//! Operator entry point for the page core.
//!
//! # Responsibility
//! - Verify `folio_core` wiring (config, logging, database) outside tests.
//! - Run one page operation per invocation against the configured database.
//!
//! Usage:
//!   folio_cli ping | version
//!   folio_cli grant   <workspace> <user>
//!   folio_cli create  <workspace> <user> [title] [parent]
//!   folio_cli get     <page> <user>
//!   folio_cli list    <workspace> <user> [parent]
//!   folio_cli archive <page> <user>
//!   folio_cli delete  <page> <user>

use folio_core::{
    CoreConfig, Page, PageService, SqliteMembershipRepository, SqlitePageRepository,
};
use log::error;
use std::process::ExitCode;
use uuid::Uuid;

const USAGE: &str = "usage: folio_cli <ping|version|grant|create|get|list|archive|delete> [args]";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_command module=cli status=error error={message}");
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let command = args.first().map(String::as_str).ok_or(USAGE)?;
    match command {
        "ping" => {
            println!("folio_core ping={}", folio_core::ping());
            return Ok(());
        }
        "version" => {
            println!("folio_core version={}", folio_core::core_version());
            return Ok(());
        }
        _ => {}
    }

    let config = CoreConfig::from_env();
    config.init_logging()?;
    let conn = config.open_db().map_err(|err| err.to_string())?;
    let pages = SqlitePageRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let members = SqliteMembershipRepository::try_new(&conn).map_err(|err| err.to_string())?;

    if command == "grant" {
        let workspace = parse_id(args.get(1), "workspace")?;
        let user = parse_id(args.get(2), "user")?;
        members
            .grant(workspace, user)
            .map_err(|err| err.to_string())?;
        println!("granted user={user} workspace={workspace}");
        return Ok(());
    }

    let service = PageService::new(pages, members);
    let target = parse_id(args.get(1), "target")?;
    let user = parse_id(args.get(2), "user")?;

    match command {
        "create" => {
            let title = args.get(3).cloned().unwrap_or_default();
            let parent = parse_optional_id(args.get(4), "parent")?;
            let page = service
                .create_page(target, user, parent, title)
                .map_err(|err| err.to_string())?;
            print_page(&page);
        }
        "get" => {
            let page = service.get_page(target, user).map_err(|err| err.to_string())?;
            print_page(&page);
        }
        "list" => {
            let parent = parse_optional_id(args.get(3), "parent")?;
            let listed = service
                .list_pages(target, user, parent)
                .map_err(|err| err.to_string())?;
            for page in &listed {
                print_page(page);
            }
        }
        "archive" => {
            service
                .archive_page(target, user)
                .map_err(|err| err.to_string())?;
            println!("archived page={target}");
        }
        "delete" => {
            service
                .delete_page_hard(target, user)
                .map_err(|err| err.to_string())?;
            println!("deleted page={target}");
        }
        other => return Err(format!("unknown command `{other}`\n{USAGE}")),
    }
    Ok(())
}

fn parse_id(value: Option<&String>, name: &str) -> Result<Uuid, String> {
    let value = value.ok_or_else(|| format!("missing <{name}>\n{USAGE}"))?;
    Uuid::parse_str(value).map_err(|err| format!("invalid <{name}> `{value}`: {err}"))
}

fn parse_optional_id(value: Option<&String>, name: &str) -> Result<Option<Uuid>, String> {
    value.map(|_| parse_id(value, name)).transpose()
}

fn print_page(page: &Page) {
    let parent = page
        .parent_page_id
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    println!(
        "{}\tparent={}\tarchived={}\tcreated_at={}\t{}",
        page.id, parent, page.archived, page.created_at, page.title
    );
}
