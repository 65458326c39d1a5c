use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use subrepro_client::{
    CacheClient, HttpTransport, InProcessTransport, NormalizationPolicy, ReconcilePolicy,
    SubscriptionsApp, Transport, ACCOUNT_SUBSCRIPTIONS,
};
use subrepro_telemetry::LogSink;
use tracing::{info, warn};

use crate::StoreArgs;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Normalization {
    /// `Subscription` is a root typename; all rows share one cache entry.
    Collide,
    /// Rows are keyed by `Subscription:{id}`.
    Keyed,
}

impl Normalization {
    fn policy(self) -> NormalizationPolicy {
        match self {
            Normalization::Collide => NormalizationPolicy::default(),
            Normalization::Keyed => NormalizationPolicy::default().without_subscription_root(),
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct DemoArgs {
    /// Cache normalization of `Subscription` rows.
    #[arg(long, value_enum, default_value = "collide")]
    normalization: Normalization,

    /// How the view catches up after an add (`merge` or `refetch`).
    #[arg(long, default_value_t = ReconcilePolicy::MergeIntoCache)]
    reconcile: ReconcilePolicy,

    /// Row to add through the form, as `name=price`. Repeatable.
    #[arg(long = "add", value_parser = parse_row, default_value = "Eggs=5")]
    adds: Vec<(String, String)>,

    /// GraphQL endpoint of a running server. Uses an in-process store when
    /// omitted.
    #[arg(long)]
    server: Option<String>,

    /// Artificial delay on every in-process request, in milliseconds.
    #[arg(long, default_value = "0")]
    latency_ms: u64,

    #[command(flatten)]
    store: StoreArgs,
}

impl DemoArgs {
    /// Store options configure the in-process store only.
    fn validate(&self) -> Result<()> {
        if self.server.is_some() && self.store.is_set() {
            bail!("--account-scope and --seed only apply without --server");
        }
        Ok(())
    }
}

fn parse_row(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, price)| (name.to_string(), price.to_string()))
        .ok_or_else(|| format!("expected name=price, got {raw:?}"))
}

pub async fn run(args: DemoArgs, warnings: Option<&LogSink>) -> Result<()> {
    args.validate()?;

    let transport: Arc<dyn Transport> = match &args.server {
        Some(url) => Arc::new(HttpTransport::new(url.clone())),
        None => {
            let schema = subrepro_schema::build_schema(args.store.build()?);
            let mut transport = InProcessTransport::new(schema);
            if args.latency_ms > 0 {
                transport = transport.with_latency(Duration::from_millis(args.latency_ms));
            }
            Arc::new(transport)
        }
    };

    info!(
        normalization = ?args.normalization,
        reconcile = %args.reconcile,
        in_process = args.server.is_none(),
        "starting demo"
    );

    let client = Arc::new(CacheClient::new(transport.clone(), args.normalization.policy()));
    let mut app = SubscriptionsApp::new(client.clone(), args.reconcile);

    app.mount();
    print!("{}", app.render());
    app.ready().await.context("account query failed")?;
    println!();
    print!("{}", app.render());

    for (name, price) in &args.adds {
        app.form_mut().set_name(name.clone());
        app.form_mut().set_price(price);
        if !app.form().price_matches_pattern() {
            warn!(price = %price, "price does not match the input pattern");
        }
        app.submit().await??;
        println!();
        print!("{}", app.render());
    }

    // A fresh collision-free client shows what the server actually holds
    let truth = CacheClient::new(transport, Normalization::Keyed.policy())
        .fetch_query(&ACCOUNT_SUBSCRIPTIONS)
        .await?;
    let server_rows: Vec<String> = truth
        .pointer("/account/subscriptions")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("server returned no account subscriptions"))?
        .iter()
        .map(|row| {
            format!(
                "{}: {}",
                row["name"].as_str().unwrap_or_default(),
                row["price"].as_str().unwrap_or_default()
            )
        })
        .collect();

    println!();
    println!("## Server");
    for row in &server_rows {
        println!("- {row}");
    }

    let view_rows: Vec<String> = app.items().into_iter().map(|i| i.text).collect();
    println!();
    if view_rows == server_rows {
        println!("view matches server ({} rows)", view_rows.len());
    } else {
        println!(
            "view differs from server: {} rows shown, {} on server",
            view_rows.len(),
            server_rows.len()
        );
    }
    if let Some(sink) = warnings {
        println!("warnings logged: {}", sink.count());
    }
    info!(cache_entities = ?client.entity_ids(), "demo finished");
    Ok(())
}
