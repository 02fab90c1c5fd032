// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use runtime::ApiRuntime;
use std::env;
use std::path::PathBuf;
use url::Url;
use vinylog_api::{CatalogClient, Client};
use vinylog_app::{AppState, FilterSet};
use vinylog_tui::LaunchOptions;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `vinylog --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    // --demo serves an in-process mock inventory seeded with fake records;
    // the server lives until the process exits.
    let demo_server = if options.demo {
        Some(
            vinylog_testkit::MockInventoryServer::start(vinylog_testkit::demo_records(120))
                .context("start demo inventory service")?,
        )
    } else {
        None
    };

    let mut client = match &demo_server {
        Some(server) => Client::new(server.base_url(), config.api_timeout()?)?,
        None => Client::new(config.api_base_url(), config.api_timeout()?).with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?,
    };
    if demo_server.is_none()
        && let Some(cookie) = config.session_cookie()
    {
        client.set_session(&cookie);
    }

    let catalog = if config.catalog_enabled() {
        Some(
            CatalogClient::new(
                config.catalog_base_url(),
                config.catalog_token(),
                config.catalog_timeout()?,
            )
            .with_context(|| {
                format!(
                    "invalid [catalog] config in {}; fix base_url/token values",
                    options.config_path.display()
                )
            })?,
        )
    } else {
        None
    };

    if options.check_only {
        client.ping().with_context(|| {
            format!("inventory service at {} is not reachable", client.base_url())
        })?;
        return Ok(());
    }

    let initial_filters = options
        .view_link
        .as_deref()
        .map(parse_view_link)
        .transpose()?;

    let mut state = AppState::default();
    let mut runtime = ApiRuntime::new(client, catalog);
    vinylog_tui::run_app(
        &mut state,
        &mut runtime,
        LaunchOptions {
            initial_filters,
            page_size: Some(config.page_size()),
        },
    )
}

/// A shared/bookmarked link (or a bare query string) reproduces its
/// filtered view on startup.
fn parse_view_link(link: &str) -> Result<FilterSet> {
    if let Ok(url) = Url::parse(link) {
        return Ok(FilterSet::from_query_pairs(url.query_pairs()));
    }
    let query = link.trim_start_matches('?');
    let pairs = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| pair.split_once('='))
        .collect::<Vec<_>>();
    Ok(FilterSet::from_query_pairs(pairs))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    show_help: bool,
    view_link: Option<String>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        demo: false,
        check_only: false,
        show_help: false,
        view_link: None,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--view" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--view requires a link or query string"))?;
                options.view_link = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("vinylog");
    println!("  --config <path>          Use a specific config path");
    println!("  --view <link>            Open with filters from a shared link");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch against an in-process demo inventory");
    println!("  --check                  Validate config and service reachability");
    println!("  --help                   Show this help");
}
