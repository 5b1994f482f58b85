//! Subprocess I/O contract.
//!
//! One JSON document in on stdin, read in full before any processing; one
//! JSON document out on stdout at the end of the run. Nothing else may
//! touch stdout; diagnostics go to stderr through `tracing`. Exit code 0
//! covers completed runs even when individual items carry inline errors;
//! any fatal condition (load, parse, serialize) exits 1 with no partial
//! output.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::error::{InferError, Result};

/// Read all of stdin and parse it as one JSON document.
pub async fn read_stdin_json<T: DeserializeOwned>() -> Result<T> {
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;
    parse_json(&input)
}

/// Serialize one JSON document to stdout, newline-terminated.
pub fn write_stdout_json<T: Serialize>(value: &T) -> Result<()> {
    let document = serde_json::to_string(value)?;
    println!("{document}");
    Ok(())
}

fn parse_json<T: DeserializeOwned>(input: &str) -> Result<T> {
    serde_json::from_str(input)
        .map_err(|err| InferError::InvalidInput(format!("failed to parse input JSON: {err}")))
}
