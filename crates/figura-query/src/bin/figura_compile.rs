use std::{env, fs, process};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use figura_query::Registry;

fn usage() -> ! {
    eprintln!("usage: figura_compile <figures.json> <figure> [segment...] [name=value...]");
    process::exit(2);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        usage();
    }
    let file = &args[0];
    let figure = &args[1];

    let mut segments: Vec<&str> = Vec::new();
    let mut arguments = Map::new();
    for arg in &args[2..] {
        match arg.split_once('=') {
            Some((name, raw)) => {
                // values that parse as JSON are taken typed, the rest as text
                let value = serde_json::from_str(raw).unwrap_or(Value::String(raw.to_string()));
                arguments.insert(name.to_string(), value);
            }
            None => segments.push(arg),
        }
    }

    let text = fs::read_to_string(file).with_context(|| format!("failed to read `{file}`"))?;
    let definitions: Value =
        serde_json::from_str(&text).with_context(|| format!("failed to parse `{file}`"))?;
    let definitions = definitions
        .as_object()
        .context("figures file must be an object of id -> definition")?;

    let mut registry = Registry::new();
    for (id, definition) in definitions {
        registry
            .register(id, definition)
            .with_context(|| format!("failed to register figure `{id}`"))?;
    }

    match registry.resolve(figure, &segments, &arguments) {
        Ok(sql) => {
            println!("{sql}");
            Ok(())
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
