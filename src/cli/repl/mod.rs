//! Repl command - interactive lookups with the metrics endpoint up

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tracing::{error, info};

use super::{init_app, shutdown_signal};
use crate::create_app_state;
use crate::domain::lookup::{parse_key_value, LookupRequest};
use crate::infrastructure::observability::{init_metrics, serve_metrics, shutdown_tracing};
use crate::infrastructure::services::CacheGateway;

/// Run the interactive loop
///
/// The metrics endpoint starts first and keeps serving after the loop ends,
/// until Ctrl+C, so the final counters can still be scraped.
pub async fn run() -> anyhow::Result<()> {
    let config = init_app()?;

    let server = init_metrics(&config.observability.metrics).map(|metrics| {
        let metrics_config = config.observability.metrics.clone();
        tokio::spawn(async move { serve_metrics(metrics, &metrics_config, shutdown_signal()).await })
    });

    let state = create_app_state(&config).await?;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let queries = run_loop(&state.gateway, stdin, &mut stdout).await?;
    info!(queries, "Interactive session finished");

    state.shutdown().await;

    if let Some(server) = server {
        info!("Metrics endpoint still serving, press Ctrl+C to exit");
        if let Err(e) = server.await? {
            error!(error = %e, "Metrics endpoint failed");
        }
    }

    shutdown_tracing();
    Ok(())
}

/// Reads table, column and value until the user declines another query or
/// input ends; returns the number of lookups run
pub async fn run_loop<R, W>(gateway: &CacheGateway, input: R, output: &mut W) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut queries = 0;

    loop {
        let Some(table) = prompt(&mut lines, output, "Enter table name: ").await? else {
            break;
        };
        let Some(column) = prompt(&mut lines, output, "Enter key column name: ").await? else {
            break;
        };
        let Some(value) = prompt(&mut lines, output, "Enter key value: ").await? else {
            break;
        };

        let request = LookupRequest::new(table.trim(), column.trim(), parse_key_value(&value));
        let line = match gateway.lookup(&request).await {
            Ok(result) => format!("Final Data: {}\n", result.to_json()),
            Err(e) => format!("Invalid request: {}\n", e),
        };
        output.write_all(line.as_bytes()).await?;
        queries += 1;

        let answer = prompt(
            &mut lines,
            output,
            "Do you want to execute another query? (yes/no): ",
        )
        .await?;

        if answer.map(|a| a.trim().to_lowercase()).as_deref() != Some("yes") {
            break;
        }
    }

    output.flush().await?;
    Ok(queries)
}

async fn prompt<R, W>(
    lines: &mut Lines<R>,
    output: &mut W,
    text: &str,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(text.as_bytes()).await?;
    output.flush().await?;
    lines.next_line().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::NoopMetrics;
    use crate::infrastructure::cache::InMemoryCache;
    use crate::infrastructure::fallback::StoreFallbackFetcher;
    use crate::infrastructure::store::InMemoryStore;
    use serde_json::json;

    fn gateway() -> CacheGateway {
        let store = InMemoryStore::from_json(&json!({
            "salaries": [{"emp_no": 12345, "salary": 52000}]
        }))
        .unwrap();

        CacheGateway::new(
            Arc::new(InMemoryCache::new()),
            Arc::new(StoreFallbackFetcher::new(Arc::new(store))),
            Arc::new(NoopMetrics),
        )
    }

    async fn session(input: &str) -> (usize, String) {
        let mut output = Vec::new();
        let queries = run_loop(&gateway(), input.as_bytes(), &mut output)
            .await
            .unwrap();
        (queries, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_two_queries_then_stop() {
        let (queries, output) =
            session("salaries\nsalary\n52000\nyes\nsalaries\nsalary\n-1\nno\n").await;

        assert_eq!(queries, 2);
        assert!(output.contains(r#"Final Data: [{"emp_no":12345,"salary":52000}]"#));
        assert!(output.contains("Final Data: []"));
        assert_eq!(
            output
                .matches("Do you want to execute another query? (yes/no): ")
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_answer_is_case_insensitive() {
        let (queries, _) =
            session("salaries\nsalary\n52000\n YES \nsalaries\nsalary\n52000\nnope\n").await;

        assert_eq!(queries, 2);
    }

    #[tokio::test]
    async fn test_invalid_request_is_reported() {
        let (queries, output) = session("\nsalary\n1\nno\n").await;

        assert_eq!(queries, 1);
        assert!(output.contains("Invalid request: Table name not provided"));
    }

    #[tokio::test]
    async fn test_end_of_input_stops() {
        let (queries, output) = session("salaries\nsalary\n").await;

        assert_eq!(queries, 0);
        assert!(output.ends_with("Enter key value: "));
    }
}
