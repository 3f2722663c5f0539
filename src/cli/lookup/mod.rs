//! Lookup command - one cache-aside lookup printed as JSON

use clap::Args;

use super::init_app;
use crate::create_app_state;
use crate::domain::lookup::{parse_key_value, LookupRequest};
use crate::infrastructure::observability::shutdown_tracing;

/// Arguments for the lookup command
#[derive(Args, Clone, Debug)]
pub struct LookupArgs {
    /// Table to read from
    #[arg(long)]
    pub table: String,

    /// Column compared with the key value
    #[arg(long)]
    pub column: String,

    /// Key value; JSON scalars keep their type, anything else is a string
    #[arg(long, allow_hyphen_values = true)]
    pub value: String,
}

impl LookupArgs {
    pub fn to_request(&self) -> LookupRequest {
        LookupRequest::new(
            self.table.trim(),
            self.column.trim(),
            parse_key_value(&self.value),
        )
    }
}

/// Run a single lookup
pub async fn run(args: LookupArgs) -> anyhow::Result<()> {
    let config = init_app()?;
    let state = create_app_state(&config).await?;

    let result = state.gateway.lookup(&args.to_request()).await;
    state.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&result?.to_json())?);

    shutdown_tracing();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_request_parses_value() {
        let args = LookupArgs {
            table: " salaries ".to_string(),
            column: "salary".to_string(),
            value: "-1".to_string(),
        };

        let request = args.to_request();
        assert_eq!(request.table_name, "salaries");
        assert_eq!(request.key_value, json!(-1));
    }

    #[test]
    fn test_to_request_keeps_text() {
        let args = LookupArgs {
            table: "departments".to_string(),
            column: "dept_no".to_string(),
            value: "d005".to_string(),
        };

        assert_eq!(args.to_request().key_value, json!("d005"));
    }
}
