#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use anyhow::{Context, bail};
use clap::Parser;
use config::{AppConfig, CliArgs};
use futures::{StreamExt, TryStreamExt, stream};
use offload::{AsyncClient, Kwargs, WorkerPool};
use offload_paramstore::{ErrorCode, ParamStoreClient, StoreConfig};
use serde_json::{Value, json};
use std::{sync::Arc, time::Instant};
use telemetry::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = AppConfig::try_from(args)?;

    init_logging()?;
    log_startup_info(&config);

    let store = Arc::new(ParamStoreClient::with_config(StoreConfig::new(
        config.max_pool_connections,
        config.latency,
    )));
    let client = match config.pool_size {
        Some(size) => AsyncClient::with_pool(
            Arc::clone(&store),
            WorkerPool::new(size).context("failed to start the worker pool")?,
        ),
        None => AsyncClient::new(Arc::clone(&store)).context("failed to wrap the store")?,
    };

    let started = Instant::now();
    seed(&client, &config).await?;
    tracing::info!(
        "Seeded {} parameters in {:?}",
        config.parameters,
        started.elapsed()
    );

    read_back(&client, &config).await?;
    list(&client, &config).await?;
    missing(&client, &config).await?;

    tracing::info!(
        "Store served {} calls, at most {} at once (pool capacity {})",
        store.calls(),
        store.peak_concurrency(),
        client.pool().capacity()
    );
    Ok(())
}

fn log_startup_info(config: &AppConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting with {} parameters under {}",
            config.parameters,
            config.prefix
        );
    }
}

fn kwargs(value: Value) -> anyhow::Result<Kwargs> {
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("keyword arguments must be a mapping, got {other}"),
    }
}

async fn seed(client: &AsyncClient<ParamStoreClient>, config: &AppConfig) -> anyhow::Result<()> {
    let put = client.operation("put_parameter")?;
    stream::iter(0..config.parameters)
        .map(|n| {
            let args = kwargs(json!({
                "Name": config.parameter_name(n),
                "Value": format!("value-{n}"),
                "Type": "String",
                "Overwrite": true,
            }));
            let put = Arc::clone(&put);
            async move { Ok::<_, anyhow::Error>(put.call(args?).await?) }
        })
        .buffer_unordered(config.concurrency)
        .try_for_each(|_| async { Ok(()) })
        .await
        .context("seeding failed")
}

async fn read_back(client: &AsyncClient<ParamStoreClient>, config: &AppConfig) -> anyhow::Result<()> {
    let name = config.parameter_name(0);
    let reply = client
        .call("get_parameter", kwargs(json!({ "Name": name }))?)
        .await
        .with_context(|| format!("failed to read {name}"))?;
    tracing::info!(
        "Read {} = {} (version {})",
        name,
        reply["Parameter"]["Value"],
        reply["Parameter"]["Version"]
    );
    Ok(())
}

async fn list(client: &AsyncClient<ParamStoreClient>, config: &AppConfig) -> anyhow::Result<()> {
    let filters = json!({
        "ParameterFilters": [{
            "Key": "Name",
            "Option": "BeginsWith",
            "Values": [format!("{}/", config.prefix)],
        }],
        "MaxResults": config.page_size,
    });
    let mut pages = client
        .get_paginator("describe_parameters")?
        .paginate(kwargs(filters)?);

    let mut page_count = 0;
    let mut listed = 0;
    while let Some(page) = pages.try_next().await? {
        page_count += 1;
        listed += page["Parameters"].as_array().map_or(0, Vec::len);
        tracing::debug!("Page {page_count}: {listed} parameters so far");
    }
    tracing::info!("Listed {listed} parameters in {page_count} pages");

    if listed != config.parameters {
        bail!("expected {} parameters, listed {listed}", config.parameters);
    }
    Ok(())
}

async fn missing(client: &AsyncClient<ParamStoreClient>, config: &AppConfig) -> anyhow::Result<()> {
    let name = format!("{}/missing", config.prefix);
    match client
        .call("get_parameter", kwargs(json!({ "Name": name }))?)
        .await
    {
        Err(err) if err.client().is_some_and(|e| ErrorCode::ParameterNotFound.matches(e)) => {
            tracing::info!("Lookup of {name} failed as expected: {err}");
            Ok(())
        }
        Err(err) => Err(err).context("unexpected lookup failure"),
        Ok(_) => bail!("{name} unexpectedly exists"),
    }
}
