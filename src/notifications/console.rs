//! Dry-run publisher that prints instead of posting

use colored::Colorize;

use super::{CommentResult, Publisher, StatusRequest};
use crate::error::Result;

pub struct ConsolePublisher;

impl Publisher for ConsolePublisher {
    async fn comment(&self, body: &str) -> Result<CommentResult> {
        println!("{}", "━".repeat(50).dimmed());
        println!("{}", body);
        println!("{}", "━".repeat(50).dimmed());
        Ok(CommentResult::from_json(serde_json::Value::Null))
    }

    async fn post_status(&self, status: &StatusRequest) -> Result<()> {
        println!(
            "  {} {} {} ({})",
            "status:".dimmed(),
            status.state.as_str().bold(),
            status.description,
            status.context.dimmed()
        );
        Ok(())
    }
}
